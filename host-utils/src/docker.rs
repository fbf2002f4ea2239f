// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interaction with the container runtime daemon.

use camino::Utf8PathBuf;
use host_exec::{BoxedExecutor, ExecutionError, DOCKER};
use serde::{Deserialize, Serialize};
use tokio::process::Command;

#[derive(thiserror::Error, Debug)]
pub enum InfoError {
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("Failed to parse runtime info: {0}")]
    Parse(#[source] serde_json::Error),
}

/// The subset of `docker info` output we care about.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct DockerInfo {
    #[serde(rename = "DockerRootDir")]
    pub root_dir: Utf8PathBuf,
    #[serde(rename = "ServerVersion")]
    pub server_version: String,
}

/// Contents of the daemon's `daemon.json`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct DaemonConfig {
    #[serde(rename = "data-root")]
    pub data_root: Utf8PathBuf,
}

pub struct Docker {}

impl Docker {
    /// Queries the daemon. Succeeds only once the daemon answers requests.
    pub async fn info(
        executor: &BoxedExecutor,
    ) -> Result<DockerInfo, InfoError> {
        let mut cmd = Command::new(DOCKER);
        cmd.args(["info", "--format", "{{json .}}"]);
        let output = executor.execute_async(&mut cmd).await?;
        serde_json::from_slice(&output.stdout).map_err(InfoError::Parse)
    }
}
