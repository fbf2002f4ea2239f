// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Helper for probing block devices.

use camino::{Utf8Path, Utf8PathBuf};
use host_exec::{BoxedExecutor, ExecutionError, BLKID};
use tokio::process::Command;

// blkid exits with this status when the requested tag is absent, or the
// device could not be identified at all.
const NOT_FOUND: i32 = 2;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Failed to probe {device}: {err}")]
    Execution {
        device: Utf8PathBuf,
        #[source]
        err: ExecutionError,
    },

    #[error("No filesystem UUID found on {device}")]
    MissingUuid { device: Utf8PathBuf },
}

pub struct Blkid {}

impl Blkid {
    /// Returns the type of the filesystem signature on `device`, or `None`
    /// if the device carries no recognizable filesystem.
    pub async fn filesystem_type(
        executor: &BoxedExecutor,
        device: &Utf8Path,
    ) -> Result<Option<String>, Error> {
        Self::lookup(executor, device, "TYPE").await
    }

    /// Returns the filesystem UUID of `device`.
    pub async fn uuid(
        executor: &BoxedExecutor,
        device: &Utf8Path,
    ) -> Result<String, Error> {
        Self::lookup(executor, device, "UUID")
            .await?
            .ok_or_else(|| Error::MissingUuid { device: device.to_owned() })
    }

    async fn lookup(
        executor: &BoxedExecutor,
        device: &Utf8Path,
        tag: &str,
    ) -> Result<Option<String>, Error> {
        let mut cmd = Command::new(BLKID);
        cmd.args(["-o", "value", "-s", tag, device.as_str()]);
        match executor.execute_async(&mut cmd).await {
            Ok(output) => {
                let value = String::from_utf8_lossy(&output.stdout);
                let value = value.trim();
                if value.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(value.to_string()))
                }
            }
            Err(err) if err.exit_code() == Some(NOT_FOUND) => Ok(None),
            Err(err) => {
                Err(Error::Execution { device: device.to_owned(), err })
            }
        }
    }
}
