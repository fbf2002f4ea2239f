// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Facilities used by the command-line tool

use std::env::current_exe;
use std::process::exit;

/// represents a fatal error in a command-line program
#[derive(Debug)]
pub enum CmdError {
    /// incorrect command-line arguments
    Usage(String),
    /// all other errors
    Failure(anyhow::Error),
}

impl CmdError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CmdError::Usage(_) => 2,
            CmdError::Failure(_) => 1,
        }
    }

    fn message(&self) -> String {
        match self {
            CmdError::Usage(s) => s.clone(),
            CmdError::Failure(e) => format!("{e:#}"),
        }
    }
}

/// Exits the current process on a fatal error.
pub fn fatal(cmd_error: CmdError) -> ! {
    let arg0_passed = current_exe()
        .ok()
        .and_then(|p| p.file_name().map(|f| f.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "command".to_string());
    eprintln!("{}: {}", arg0_passed, cmd_error.message());
    exit(cmd_error.exit_code());
}
