// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The orchestrator agent's cluster-join configuration.

use crate::config::{AgentConfig, ClusterConfig};
use crate::host::{HostIoError, HostPaths};
use slog::{info, Logger};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Contents of the agent's environment file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentConfigFile {
    pub cluster: String,
    pub region: String,
    pub extra: BTreeMap<String, String>,
}

impl AgentConfigFile {
    pub fn new(cluster: &ClusterConfig) -> Self {
        Self {
            cluster: cluster.name.clone(),
            region: cluster.region.clone(),
            extra: cluster.extra.clone(),
        }
    }

    /// Renders one `KEY=VALUE` line per setting. Values are not validated.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "ECS_CLUSTER={}", self.cluster);
        let _ = writeln!(out, "AWS_DEFAULT_REGION={}", self.region);
        for (key, value) in &self.extra {
            let _ = writeln!(out, "{key}={value}");
        }
        out
    }
}

/// Writes the agent configuration, replacing any previous contents.
pub async fn write_agent_config(
    log: &Logger,
    host: &HostPaths,
    agent: &AgentConfig,
    cluster: &ClusterConfig,
) -> Result<(), HostIoError> {
    let file = AgentConfigFile::new(cluster);
    host.write(&agent.config_path, file.render()).await?;
    info!(
        log, "Wrote agent configuration";
        "path" => %agent.config_path,
        "cluster" => &file.cluster,
        "region" => &file.region,
    );
    Ok(())
}
