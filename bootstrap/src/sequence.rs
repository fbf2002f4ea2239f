// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The ordered bootstrap sequence.

use crate::agent;
use crate::cleanup::{self, CleanupInstall};
use crate::config::Config;
use crate::host::{HostIoError, HostPaths};
use crate::runtime;
use crate::storage::{self, PersistedMount, PreparedDevice};
use camino::Utf8PathBuf;
use host_exec::BoxedExecutor;
use host_utils::docker::DockerInfo;
use host_utils::systemctl::Systemctl;
use slog::{error, info, o, warn, Logger};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("data device {device} did not appear after {attempts} attempts")]
    DeviceNotFound { device: Utf8PathBuf, attempts: u32 },

    #[error("{target} is not a mount point after mounting")]
    MountVerification { target: Utf8PathBuf },

    #[error("{target} already holds {found:?}, not the data device {device}")]
    ForeignMount { target: Utf8PathBuf, device: Utf8PathBuf, found: String },

    #[error("container runtime not healthy after {attempts} attempts")]
    RuntimeUnhealthy { attempts: u32 },

    #[error(transparent)]
    Probe(#[from] host_utils::blkid::Error),

    #[error(transparent)]
    Format(#[from] host_utils::mkfs::FormatError),

    #[error(transparent)]
    Mount(#[from] host_utils::mount::Error),

    #[error("failed to serialize runtime daemon configuration: {0}")]
    DaemonConfig(#[source] serde_json::Error),

    #[error(transparent)]
    HostIo(#[from] HostIoError),
}

/// The steps of the sequence, in the order they run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootstrapStep {
    AgentConfig,
    QuiesceServices,
    PrepareDevice,
    PersistMount,
    DaemonConfig,
    StartRuntime,
    StartAgent,
    InstallCleanup,
}

impl fmt::Display for BootstrapStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BootstrapStep::AgentConfig => "agent-config",
            BootstrapStep::QuiesceServices => "quiesce-services",
            BootstrapStep::PrepareDevice => "prepare-device",
            BootstrapStep::PersistMount => "persist-mount",
            BootstrapStep::DaemonConfig => "daemon-config",
            BootstrapStep::StartRuntime => "start-runtime",
            BootstrapStep::StartAgent => "start-agent",
            BootstrapStep::InstallCleanup => "install-cleanup",
        };
        f.write_str(s)
    }
}

/// The outcome of the optional cleanup step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CleanupOutcome {
    Disabled,
    Installed(CleanupInstall),
    /// Installation failed; the sequence succeeded anyway.
    Failed(String),
}

/// Everything a successful run did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootstrapReport {
    pub device: PreparedDevice,
    pub mount: PersistedMount,
    pub runtime: DockerInfo,
    /// Units that could not be stopped during quiesce.
    pub quiesce_failures: Vec<String>,
    /// Whether the agent's start job was queued.
    pub agent_started: bool,
    pub cleanup: CleanupOutcome,
}

/// Prepares a freshly booted runner host.
pub struct Bootstrap {
    log: Logger,
    executor: BoxedExecutor,
    host: HostPaths,
    config: Config,
}

impl Bootstrap {
    pub fn new(
        log: &Logger,
        executor: BoxedExecutor,
        host: HostPaths,
        config: Config,
    ) -> Self {
        let log = log.new(o!(
            "component" => "Bootstrap",
            "cluster" => config.cluster.name.clone(),
        ));
        Self { log, executor, host, config }
    }

    /// Runs every step in order, stopping at the first fatal error.
    ///
    /// Nothing is rolled back on failure; every step is safe to repeat on
    /// the next boot.
    pub async fn run(&self) -> Result<BootstrapReport, BootstrapError> {
        info!(self.log, "Starting host bootstrap"; "root" => %self.host.root());
        let report = self.run_steps().await.map_err(|(step, err)| {
            error!(
                self.log, "Host bootstrap failed";
                "step" => %step,
                "error" => %err,
            );
            err
        })?;
        info!(self.log, "Host bootstrap complete");
        Ok(report)
    }

    async fn run_steps(
        &self,
    ) -> Result<BootstrapReport, (BootstrapStep, BootstrapError)> {
        let log = &self.log;
        let config = &self.config;

        let cluster = &config.cluster;
        agent::write_agent_config(log, &self.host, &config.agent, cluster)
            .await
            .map_err(|err| {
                (BootstrapStep::AgentConfig, BootstrapError::from(err))
            })?;

        let quiesce_failures = self.quiesce_services().await;

        let device = storage::prepare_device(
            log,
            &self.executor,
            &self.host,
            &config.storage,
        )
        .await
        .map_err(|err| (BootstrapStep::PrepareDevice, err))?;

        let mount = storage::persist_mount(
            log,
            &self.executor,
            &self.host,
            &config.storage,
            &device,
        )
        .await
        .map_err(|err| (BootstrapStep::PersistMount, err))?;

        let daemon = runtime::write_daemon_config(
            log,
            &self.host,
            &config.runtime,
            &device,
        )
        .await
        .map_err(|err| (BootstrapStep::DaemonConfig, err))?;

        let runtime = runtime::start_runtime(
            log,
            &self.executor,
            &config.runtime,
            &daemon,
        )
        .await
        .map_err(|err| (BootstrapStep::StartRuntime, err))?;

        let agent_started = self.start_agent().await;
        let cleanup = self.install_cleanup().await;

        Ok(BootstrapReport {
            device,
            mount,
            runtime,
            quiesce_failures,
            agent_started,
            cleanup,
        })
    }

    /// Stops the runtime socket, the runtime, and the agent, so nothing
    /// initializes data on the root disk before the data volume is mounted.
    ///
    /// Failures are expected (units may be absent or already stopped) and
    /// only logged. Returns the units that could not be stopped.
    pub async fn quiesce_services(&self) -> Vec<String> {
        let units = [
            &self.config.runtime.socket_unit,
            &self.config.runtime.unit,
            &self.config.agent.unit,
        ];
        let mut failures = Vec::new();
        for unit in units {
            match Systemctl::disable_now(&self.executor, unit).await {
                Ok(()) => info!(self.log, "Stopped service"; "unit" => unit),
                Err(err) => {
                    warn!(
                        self.log, "Failed to stop service";
                        "unit" => unit,
                        "error" => %err,
                    );
                    failures.push(unit.clone());
                }
            }
        }
        failures
    }

    /// Queues the agent's start job without waiting for it, or for the
    /// agent to register. Returns false if the job could not be queued.
    pub async fn start_agent(&self) -> bool {
        let unit = &self.config.agent.unit;
        match Systemctl::enable_now_no_block(&self.executor, unit).await {
            Ok(()) => {
                info!(self.log, "Queued agent start"; "unit" => unit);
                true
            }
            Err(err) => {
                warn!(
                    self.log, "Failed to start agent";
                    "unit" => unit,
                    "error" => %err,
                );
                false
            }
        }
    }

    async fn install_cleanup(&self) -> CleanupOutcome {
        if !self.config.cleanup.enabled {
            info!(self.log, "Scheduled cleanup disabled");
            return CleanupOutcome::Disabled;
        }
        match cleanup::install_cleanup(
            &self.log,
            &self.executor,
            &self.host,
            &self.config.cleanup,
        )
        .await
        {
            Ok(installed) => CleanupOutcome::Installed(installed),
            Err(err) => {
                warn!(
                    self.log, "Failed to install scheduled cleanup";
                    "error" => %err,
                );
                CleanupOutcome::Failed(err.to_string())
            }
        }
    }
}
