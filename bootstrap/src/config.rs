// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interfaces for parsing the bootstrap configuration file.

use crate::poll::PollPolicy;
use camino::{Utf8Path, Utf8PathBuf};
use dropshot::{ConfigLogging, ConfigLoggingIfExists, ConfigLoggingLevel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Configuration of the bootstrap sequence.
///
/// Only `[cluster]` is required; every other section falls back to the
/// layout of a stock runner image.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// The cluster this host joins.
    pub cluster: ClusterConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub cleanup: CleanupConfig,
    /// Where the boot log goes, in addition to stderr.
    #[serde(default = "default_log")]
    pub log: ConfigLogging,
}

impl Config {
    /// Load a `Config` from the given TOML file
    pub fn from_file(path: &Utf8Path) -> Result<Config, LoadError> {
        let file_contents = std::fs::read_to_string(path)
            .map_err(|err| LoadError::Io { path: path.into(), err })?;
        let config_parsed: Config = toml::from_str(&file_contents)
            .map_err(|err| LoadError::Parse { path: path.into(), err })?;
        Ok(config_parsed)
    }

    /// Applies boot-time parameters on top of the file contents.
    pub fn apply_overrides(&mut self, overrides: BootOverrides) {
        if let Some(name) = overrides.cluster {
            self.cluster.name = name;
        }
        if let Some(region) = overrides.region {
            self.cluster.region = region;
        }
        if let Some(enabled) = overrides.cleanup_enabled {
            self.cleanup.enabled = enabled;
        }
        if let Some(schedule) = overrides.cleanup_schedule {
            self.cleanup.schedule = schedule;
        }
        if let Some(hours) = overrides.cleanup_prune_age_hours {
            self.cleanup.prune_age_hours = hours;
        }
    }
}

/// Parameters resolved when the host is launched, which take precedence
/// over the config file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BootOverrides {
    pub cluster: Option<String>,
    pub region: Option<String>,
    pub cleanup_enabled: Option<bool>,
    pub cleanup_schedule: Option<String>,
    pub cleanup_prune_age_hours: Option<u32>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("error reading \"{path}\": {err}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("error parsing \"{path}\": {err}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        err: toml::de::Error,
    },
}

fn default_log() -> ConfigLogging {
    ConfigLogging::File {
        level: ConfigLoggingLevel::Info,
        path: "/var/log/runner-host-bootstrap.log".into(),
        if_exists: ConfigLoggingIfExists::Append,
    }
}

/// Boot-time identity of the host within the orchestrator.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterConfig {
    pub name: String,
    pub region: String,
    /// Additional `KEY=VALUE` settings for the agent, written after the
    /// cluster and region.
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    pub config_path: Utf8PathBuf,
    pub unit: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            config_path: "/etc/ecs/ecs.config".into(),
            unit: "ecs.service".to_string(),
        }
    }
}

/// Polling parameters, as written in the config file.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WaitConfig {
    pub interval_secs: u64,
    pub max_attempts: u32,
}

impl WaitConfig {
    pub fn policy(&self) -> PollPolicy {
        let interval = Duration::from_secs(self.interval_secs);
        PollPolicy::new(interval, self.max_attempts)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// The secondary block device holding container data.
    pub device: Utf8PathBuf,
    /// Where the device is mounted; this becomes the runtime's data root.
    pub mount_point: Utf8PathBuf,
    pub fs_type: String,
    pub fstab_path: Utf8PathBuf,
    /// How long to wait for the device to be attached.
    pub device_wait: WaitConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            device: "/dev/xvdb".into(),
            mount_point: "/var/lib/docker".into(),
            fs_type: "ext4".to_string(),
            fstab_path: "/etc/fstab".into(),
            device_wait: WaitConfig { interval_secs: 1, max_attempts: 60 },
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    pub unit: String,
    pub socket_unit: String,
    pub daemon_config_path: Utf8PathBuf,
    /// How long to wait for the runtime to answer `info` after starting it.
    pub health_wait: WaitConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            unit: "docker.service".to_string(),
            socket_unit: "docker.socket".to_string(),
            daemon_config_path: "/etc/docker/daemon.json".into(),
            health_wait: WaitConfig { interval_secs: 1, max_attempts: 30 },
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CleanupConfig {
    pub enabled: bool,
    /// Five-field cron expression.
    pub schedule: String,
    /// Unused images and networks older than this are pruned.
    pub prune_age_hours: u32,
    pub script_path: Utf8PathBuf,
    pub log_path: Utf8PathBuf,
    /// Base name of the timer and service units.
    pub unit_name: String,
    pub unit_dir: Utf8PathBuf,
    pub cron_path: Utf8PathBuf,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            schedule: "0 * * * *".to_string(),
            prune_age_hours: 24,
            script_path: "/usr/local/bin/docker-cleanup.sh".into(),
            log_path: "/var/log/docker-cleanup.log".into(),
            unit_name: "docker-cleanup".to_string(),
            unit_dir: "/etc/systemd/system".into(),
            cron_path: "/etc/cron.d/docker-cleanup".into(),
        }
    }
}
