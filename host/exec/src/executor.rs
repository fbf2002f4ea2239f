// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::{ExecutionError, Input, Output};

use async_trait::async_trait;
use itertools::Itertools;
use slog::{debug, error, info, Logger};
use std::process::Command;
use std::str::from_utf8;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

fn to_space_separated_string<T, I>(iter: T) -> String
where
    T: IntoIterator<Item = I>,
    I: std::fmt::Debug,
{
    Itertools::intersperse(
        iter.into_iter().map(|arg| format!("{arg:?}")),
        " ".into(),
    )
    .collect::<String>()
}

pub fn log_input(log: &Logger, id: u64, command: &Command) {
    info!(
        log,
        "running command via executor";
        "id" => id,
        "command" => %Input::from(command),
    );
    debug!(
        log,
        "running command via executor";
        "id" => id,
        "envs" => %to_space_separated_string(command.get_envs()),
    );
}

pub fn log_output(log: &Logger, id: u64, output: &Output) {
    info!(
        log,
        "finished running command via executor";
        "id" => id,
        "result" => if output.status.success() { "OK" } else { "ERROR" },
        "status" => output
            .status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "none".to_string()),
    );
    if !output.stdout.is_empty() {
        debug!(
            log,
            "finished command stdout";
            "id" => id,
            "stdout" =>
                from_utf8(&output.stdout).unwrap_or("<Not valid UTF-8>"),
        );
    }
    if !output.stderr.is_empty() {
        debug!(
            log,
            "finished command stderr";
            "id" => id,
            "stderr" =>
                from_utf8(&output.stderr).unwrap_or("<Not valid UTF-8>"),
        );
    }
}

/// Describes the commonly-used "safe-to-reference" type describing the
/// Executor as a trait object.
pub type BoxedExecutor = Arc<dyn Executor>;

/// Describes an "executor", which can run [Command]s and return a response.
///
/// - In production, this is usually simply a [HostExecutor].
/// - Under test, this can be customized, and a fake executor may be used.
///
/// A command which runs but exits non-zero is reported as
/// [ExecutionError::CommandFailure].
#[async_trait]
pub trait Executor: Send + Sync {
    /// Executes a task, waiting for it to complete, and returning output.
    async fn execute_async(
        &self,
        command: &mut tokio::process::Command,
    ) -> Result<Output, ExecutionError>;
}

pub struct HostExecutor {
    log: Logger,
    counter: AtomicU64,
}

impl HostExecutor {
    pub fn new(log: Logger) -> Arc<Self> {
        Arc::new(Self { log, counter: AtomicU64::new(0) })
    }

    pub fn as_executor(self: Arc<Self>) -> BoxedExecutor {
        self
    }

    fn prepare(&self, command: &Command) -> u64 {
        let id = self.counter.fetch_add(1, Ordering::SeqCst);
        log_input(&self.log, id, command);
        id
    }

    fn finalize(
        &self,
        command: &Command,
        id: u64,
        output: Output,
    ) -> Result<Output, ExecutionError> {
        log_output(&self.log, id, &output);
        if !output.status.success() {
            return Err(ExecutionError::from_output(command, &output));
        }
        Ok(output)
    }
}

#[async_trait]
impl Executor for HostExecutor {
    async fn execute_async(
        &self,
        command: &mut tokio::process::Command,
    ) -> Result<Output, ExecutionError> {
        let id = self.prepare(command.as_std());
        let output = command.output().await.map_err(|err| {
            error!(
                self.log,
                "Could not start program asynchronously!";
                "id" => id,
            );
            ExecutionError::ExecutionStart {
                command: Input::from(command.as_std()).to_string(),
                err,
            }
        })?;
        self.finalize(command.as_std(), id, output)
    }
}
