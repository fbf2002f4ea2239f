// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The two ways of scheduling the cleanup job.

use super::schedule::TimerSchedule;
use crate::config::CleanupConfig;
use crate::host::{HostIoError, HostPaths};
use camino::{Utf8Path, Utf8PathBuf};
use host_exec::BoxedExecutor;
use host_utils::systemctl::Systemctl;
use slog::{info, warn, Logger};

/// Present only when systemd is the running service manager.
const SYSTEMD_RUNTIME_DIR: &str = "/run/systemd/system";

/// How the cleanup job gets scheduled on this host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchedulingBackend {
    /// A systemd timer and the oneshot service it triggers.
    PeriodicTrigger { unit_dir: Utf8PathBuf, unit_name: String },
    /// A cron table entry, left to a cron daemon that may not be running.
    LegacyScheduleFile { path: Utf8PathBuf },
}

/// What [SchedulingBackend::install] wrote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InstalledSchedule {
    Timer { timer: Utf8PathBuf, service: Utf8PathBuf, schedule: TimerSchedule },
    CronFile { path: Utf8PathBuf },
}

impl SchedulingBackend {
    /// Picks the backend for this host.
    pub async fn probe(host: &HostPaths, config: &CleanupConfig) -> Self {
        if host.is_dir(Utf8Path::new(SYSTEMD_RUNTIME_DIR)).await {
            Self::PeriodicTrigger {
                unit_dir: config.unit_dir.clone(),
                unit_name: config.unit_name.clone(),
            }
        } else {
            Self::LegacyScheduleFile { path: config.cron_path.clone() }
        }
    }

    /// Arranges for `command` to run on `schedule`, a five-field cron
    /// expression.
    pub async fn install(
        &self,
        log: &Logger,
        executor: &BoxedExecutor,
        host: &HostPaths,
        schedule: &str,
        command: &Utf8Path,
    ) -> Result<InstalledSchedule, HostIoError> {
        match self {
            Self::PeriodicTrigger { unit_dir, unit_name } => {
                let translated = TimerSchedule::from_cron(schedule);
                if translated.is_fallback() {
                    warn!(
                        log,
                        "Unsupported cleanup schedule, falling back to hourly";
                        "schedule" => schedule,
                    );
                }
                let service = unit_dir.join(format!("{unit_name}.service"));
                let timer_unit = format!("{unit_name}.timer");
                let timer = unit_dir.join(&timer_unit);
                host.write(&service, render_service(command)).await?;
                host.write(&timer, render_timer(&translated)).await?;
                info!(
                    log, "Installed cleanup timer";
                    "timer" => %timer,
                    "on_calendar" => %translated,
                );

                if let Err(err) = Systemctl::daemon_reload(executor).await {
                    warn!(log, "Failed to reload units"; "error" => %err);
                }
                if let Err(err) =
                    Systemctl::enable_now(executor, &timer_unit).await
                {
                    warn!(
                        log, "Failed to enable cleanup timer";
                        "unit" => &timer_unit,
                        "error" => %err,
                    );
                }
                Ok(InstalledSchedule::Timer {
                    timer,
                    service,
                    schedule: translated,
                })
            }
            Self::LegacyScheduleFile { path } => {
                host.write(path, render_cron(schedule, command)).await?;
                info!(
                    log, "Installed cleanup cron job";
                    "path" => %path,
                    "schedule" => schedule,
                );
                Ok(InstalledSchedule::CronFile { path: path.clone() })
            }
        }
    }
}

pub fn render_service(command: &Utf8Path) -> String {
    format!(
        "[Unit]\n\
         Description=Prune unused container runtime data\n\
         \n\
         [Service]\n\
         Type=oneshot\n\
         ExecStart={command}\n"
    )
}

pub fn render_timer(schedule: &TimerSchedule) -> String {
    format!(
        "[Unit]\n\
         Description=Periodically prune unused container runtime data\n\
         \n\
         [Timer]\n\
         OnCalendar={schedule}\n\
         Persistent=true\n\
         \n\
         [Install]\n\
         WantedBy=timers.target\n"
    )
}

/// A cron.d entry; the schedule is used verbatim.
pub fn render_cron(schedule: &str, command: &Utf8Path) -> String {
    format!("{} root {command}\n", schedule.trim())
}
