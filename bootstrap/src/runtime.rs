// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Configuring, starting, and health-checking the container runtime.

use crate::config::RuntimeConfig;
use crate::host::HostPaths;
use crate::poll::{self, CondCheckError};
use crate::sequence::BootstrapError;
use crate::storage::PreparedDevice;
use host_exec::BoxedExecutor;
use host_utils::docker::{DaemonConfig, Docker, DockerInfo};
use host_utils::systemctl::Systemctl;
use slog::{debug, info, warn, Logger};
use std::convert::Infallible;

/// Points the runtime's data root at the mounted data volume.
pub async fn write_daemon_config(
    log: &Logger,
    host: &HostPaths,
    runtime: &RuntimeConfig,
    device: &PreparedDevice,
) -> Result<DaemonConfig, BootstrapError> {
    let config = DaemonConfig { data_root: device.mount_point.clone() };
    let mut contents = serde_json::to_string_pretty(&config)
        .map_err(BootstrapError::DaemonConfig)?;
    contents.push('\n');
    host.write(&runtime.daemon_config_path, contents).await?;
    info!(
        log, "Wrote runtime daemon configuration";
        "path" => %runtime.daemon_config_path,
        "data_root" => %config.data_root,
    );
    Ok(config)
}

/// Starts the runtime and waits until it answers queries.
///
/// A failure to start the unit is only logged: the health check decides
/// whether the runtime is usable.
pub async fn start_runtime(
    log: &Logger,
    executor: &BoxedExecutor,
    runtime: &RuntimeConfig,
    daemon: &DaemonConfig,
) -> Result<DockerInfo, BootstrapError> {
    info!(log, "Starting container runtime"; "unit" => &runtime.unit);
    if let Err(err) = Systemctl::enable_now(executor, &runtime.unit).await {
        warn!(
            log, "Failed to start container runtime";
            "unit" => &runtime.unit,
            "error" => %err,
        );
    }

    let policy = runtime.health_wait.policy();
    let info = poll::wait_for_condition::<_, Infallible, _, _>(
        || async {
            Docker::info(executor).await.map_err(|err| {
                debug!(log, "Container runtime not ready"; "error" => %err);
                CondCheckError::NotYet
            })
        },
        &policy,
    )
    .await
    .map_err(|err| {
        warn!(log, "Container runtime never became healthy"; "error" => %err);
        BootstrapError::RuntimeUnhealthy { attempts: policy.max_attempts }
    })?;

    info!(
        log, "Container runtime is healthy";
        "root_dir" => %info.root_dir,
        "version" => &info.server_version,
    );
    if info.root_dir != daemon.data_root {
        warn!(
            log, "Container runtime is not using the data volume";
            "root_dir" => %info.root_dir,
            "expected" => %daemon.data_root,
        );
    }
    Ok(info)
}
