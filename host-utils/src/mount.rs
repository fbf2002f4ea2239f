// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Utilities for mounting filesystems.

use camino::{Utf8Path, Utf8PathBuf};
use host_exec::{BoxedExecutor, ExecutionError, FINDMNT, MOUNT, MOUNTPOINT};
use tokio::process::Command;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Failed to mount {device} at {target}: {err}")]
    Mount {
        device: Utf8PathBuf,
        target: Utf8PathBuf,
        #[source]
        err: ExecutionError,
    },

    #[error("Failed to check whether {target} is a mount point: {err}")]
    Check {
        target: Utf8PathBuf,
        #[source]
        err: ExecutionError,
    },

    #[error("Failed to find the source mounted at {target}: {err}")]
    Source {
        target: Utf8PathBuf,
        #[source]
        err: ExecutionError,
    },
}

pub struct Mount {}

impl Mount {
    pub async fn mount(
        executor: &BoxedExecutor,
        fs_type: &str,
        device: &Utf8Path,
        target: &Utf8Path,
    ) -> Result<(), Error> {
        let mut cmd = Command::new(MOUNT);
        cmd.args(["-t", fs_type, device.as_str(), target.as_str()]);
        executor.execute_async(&mut cmd).await.map_err(|err| {
            Error::Mount {
                device: device.to_owned(),
                target: target.to_owned(),
                err,
            }
        })?;
        Ok(())
    }

    /// Returns true if a filesystem is mounted at `target`.
    ///
    /// Any non-zero exit from `mountpoint` (including a missing directory)
    /// is treated as "not a mount point".
    pub async fn is_mountpoint(
        executor: &BoxedExecutor,
        target: &Utf8Path,
    ) -> Result<bool, Error> {
        let mut cmd = Command::new(MOUNTPOINT);
        cmd.args(["-q", target.as_str()]);
        match executor.execute_async(&mut cmd).await {
            Ok(_) => Ok(true),
            Err(ExecutionError::CommandFailure(_)) => Ok(false),
            Err(err) => Err(Error::Check { target: target.to_owned(), err }),
        }
    }

    /// Returns the source of the filesystem mounted at `target`, or `None`
    /// if nothing is mounted there.
    pub async fn source(
        executor: &BoxedExecutor,
        target: &Utf8Path,
    ) -> Result<Option<String>, Error> {
        let mut cmd = Command::new(FINDMNT);
        cmd.args(["-n", "-o", "SOURCE", target.as_str()]);
        match executor.execute_async(&mut cmd).await {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                // Bind mounts report the subtree as `/dev/sdb[/dir]`.
                let source = stdout.trim();
                let source = source.split_once('[').map_or(source, |s| s.0);
                Ok(Some(source.to_string()).filter(|s| !s.is_empty()))
            }
            // findmnt exits 1 when no filesystem matches.
            Err(ExecutionError::CommandFailure(info))
                if info.status.code() == Some(1) =>
            {
                Ok(None)
            }
            Err(err) => Err(Error::Source { target: target.to_owned(), err }),
        }
    }
}
