// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::Input;
use crate::Output;
use std::process::Command;

#[derive(Debug)]
pub struct CommandFailureInfo {
    pub command: String,
    pub status: std::process::ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl std::fmt::Display for CommandFailureInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "Command [{}] executed and failed with status: {}",
            self.command, self.status
        )?;
        write!(f, "  stdout: {}", self.stdout)?;
        write!(f, "  stderr: {}", self.stderr)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ExecutionError {
    #[error("Failed to start execution of [{command}]: {err}")]
    ExecutionStart { command: String, err: std::io::Error },

    #[error("{0}")]
    CommandFailure(Box<CommandFailureInfo>),
}

impl ExecutionError {
    pub fn from_output(command: &Command, output: &Output) -> Self {
        Self::CommandFailure(Box::new(CommandFailureInfo {
            command: Input::from(command).to_string(),
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }))
    }

    /// Returns the exit code of a command which ran and failed.
    ///
    /// Returns `None` if the command could not be started, or if it was
    /// terminated by a signal.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExecutionError::CommandFailure(info) => info.status.code(),
            _ => None,
        }
    }
}
