// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CLI to prepare a CI runner host at boot

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{ArgAction, Args, Parser, Subcommand};
use host_exec::HostExecutor;
use runner_host_bootstrap::cleanup::schedule::TimerSchedule;
use runner_host_bootstrap::cmd::{fatal, CmdError};
use runner_host_bootstrap::config::BootOverrides;
use runner_host_bootstrap::logging::boot_logger;
use runner_host_bootstrap::{Bootstrap, Config, HostPaths};
use slog::info;

#[derive(Debug, Parser)]
#[command(name = "runner-host-bootstrap", version)]
struct RunnerHostBootstrap {
    #[command(subcommand)]
    command: BootstrapCommand,
}

#[derive(Debug, Subcommand)]
enum BootstrapCommand {
    /// Runs the full bootstrap sequence
    Run(RunArgs),
    /// Prints the timer schedule a cron expression translates to
    CleanupTimer(CleanupTimerArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    #[arg(name = "CONFIG_FILE_PATH", action)]
    config_file_path: Utf8PathBuf,
    /// directory under which host files are read and written
    #[arg(long, default_value = "/")]
    root: Utf8PathBuf,
    /// cluster to join, overriding the config file
    #[arg(long)]
    cluster: Option<String>,
    /// region of the cluster, overriding the config file
    #[arg(long)]
    region: Option<String>,
    /// whether to install the scheduled cleanup job
    #[arg(long, action = ArgAction::Set)]
    cleanup_enabled: Option<bool>,
    /// five-field cron expression for the cleanup job
    #[arg(long)]
    cleanup_schedule: Option<String>,
    /// prune unused images and networks older than this many hours
    #[arg(long)]
    cleanup_prune_age_hours: Option<u32>,
}

#[derive(Debug, Args)]
struct CleanupTimerArgs {
    /// five-field cron expression
    #[arg(name = "EXPR")]
    expr: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(cmd_error) = do_run().await {
        fatal(cmd_error);
    }
}

async fn do_run() -> Result<(), CmdError> {
    let args = match RunnerHostBootstrap::try_parse() {
        Ok(args) => args,
        // --help and --version
        Err(err) if !err.use_stderr() => err.exit(),
        Err(err) => return Err(CmdError::Usage(err.to_string())),
    };

    match args.command {
        BootstrapCommand::Run(args) => {
            run(args).await.map_err(CmdError::Failure)
        }
        BootstrapCommand::CleanupTimer(args) => {
            let schedule = TimerSchedule::from_cron(&args.expr);
            println!("OnCalendar={schedule}");
            println!("fallback={}", schedule.is_fallback());
            Ok(())
        }
    }
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let mut config = Config::from_file(&args.config_file_path)?;
    config.apply_overrides(BootOverrides {
        cluster: args.cluster,
        region: args.region,
        cleanup_enabled: args.cleanup_enabled,
        cleanup_schedule: args.cleanup_schedule,
        cleanup_prune_age_hours: args.cleanup_prune_age_hours,
    });

    let log = boot_logger(&config.log, "runner-host-bootstrap")
        .context("failed to construct boot logger")?;
    info!(log, "Loaded configuration"; "path" => %args.config_file_path);

    let executor = HostExecutor::new(log.clone()).as_executor();
    let bootstrap =
        Bootstrap::new(&log, executor, HostPaths::new(args.root), config);
    bootstrap.run().await.context("host bootstrap failed")?;
    Ok(())
}
