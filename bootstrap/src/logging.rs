// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The boot logger.

use dropshot::ConfigLogging;
use slog::{Drain, Logger};

/// Builds the logger used for a bootstrap run.
///
/// A file destination is duplicated to stderr, so the boot log is both kept
/// on disk and visible on the serial console.
pub fn boot_logger(
    config: &ConfigLogging,
    name: &str,
) -> Result<Logger, std::io::Error> {
    let Some(console) = console_copy(config) else {
        return config.to_logger(name);
    };
    let file_log = config.to_logger(name)?;
    let stderr_log = console.to_logger(name)?;
    let drain = slog::Duplicate::new(file_log, stderr_log).fuse();
    Ok(Logger::root(drain, slog::o!()))
}

/// The stderr destination a file logger is mirrored to, at the same level.
/// Other destinations already reach the console and get no copy.
fn console_copy(config: &ConfigLogging) -> Option<ConfigLogging> {
    match config {
        ConfigLogging::File { level, .. } => {
            Some(ConfigLogging::StderrTerminal { level: level.clone() })
        }
        _ => None,
    }
}
