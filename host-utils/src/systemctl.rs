// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Utilities for driving systemd units.

use host_exec::{BoxedExecutor, ExecutionError, SYSTEMCTL};
use tokio::process::Command;

#[derive(thiserror::Error, Debug)]
#[error("systemctl {operation} failed: {err}")]
pub struct Error {
    operation: String,
    #[source]
    pub err: ExecutionError,
}

/// Wraps commands for interacting with the service manager.
pub struct Systemctl {}

impl Systemctl {
    /// Stops `unit` and disables it from starting again on its own.
    pub async fn disable_now(
        executor: &BoxedExecutor,
        unit: &str,
    ) -> Result<(), Error> {
        Self::run(executor, &["disable", "--now", unit]).await
    }

    /// Enables `unit` and waits for its start job to complete.
    pub async fn enable_now(
        executor: &BoxedExecutor,
        unit: &str,
    ) -> Result<(), Error> {
        Self::run(executor, &["enable", "--now", unit]).await
    }

    /// Enables `unit` and queues its start job without waiting for it.
    pub async fn enable_now_no_block(
        executor: &BoxedExecutor,
        unit: &str,
    ) -> Result<(), Error> {
        Self::run(executor, &["enable", "--now", "--no-block", unit]).await
    }

    /// Reloads unit files from disk.
    pub async fn daemon_reload(executor: &BoxedExecutor) -> Result<(), Error> {
        Self::run(executor, &["daemon-reload"]).await
    }

    async fn run(executor: &BoxedExecutor, args: &[&str]) -> Result<(), Error> {
        let mut cmd = Command::new(SYSTEMCTL);
        cmd.args(args);
        executor
            .execute_async(&mut cmd)
            .await
            .map_err(|err| Error { operation: args.join(" "), err })?;
        Ok(())
    }
}
