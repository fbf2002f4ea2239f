// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Recurring cleanup of container runtime data.

mod backend;
pub mod schedule;
pub mod script;

pub use backend::{
    render_cron, render_service, render_timer, InstalledSchedule,
    SchedulingBackend,
};

use crate::config::CleanupConfig;
use crate::host::{HostIoError, HostPaths};
use host_exec::BoxedExecutor;
use slog::{info, Logger};

/// What a successful [install_cleanup] set up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CleanupInstall {
    pub backend: SchedulingBackend,
    pub installed: InstalledSchedule,
}

/// Writes the cleanup script and schedules it with whichever mechanism the
/// host supports.
pub async fn install_cleanup(
    log: &Logger,
    executor: &BoxedExecutor,
    host: &HostPaths,
    config: &CleanupConfig,
) -> Result<CleanupInstall, HostIoError> {
    let script = script::render(&config.log_path, config.prune_age_hours);
    host.write(&config.script_path, script).await?;
    host.set_mode(&config.script_path, 0o755).await?;
    info!(
        log, "Wrote cleanup script";
        "path" => %config.script_path,
        "prune_age_hours" => config.prune_age_hours,
    );

    let backend = SchedulingBackend::probe(host, config).await;
    let installed = backend
        .install(log, executor, host, &config.schedule, &config.script_path)
        .await?;
    Ok(CleanupInstall { backend, installed })
}
