// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use camino::{Utf8Path, Utf8PathBuf};
use host_exec::{BoxedExecutor, ExecutionError, MKFS};
use tokio::process::Command;

#[derive(thiserror::Error, Debug)]
#[error("Failed to create {fs_type} filesystem on {device}: {err}")]
pub struct FormatError {
    fs_type: String,
    device: Utf8PathBuf,
    #[source]
    err: ExecutionError,
}

pub struct Mkfs {}

impl Mkfs {
    /// Creates a new filesystem on `device`, destroying anything on it.
    pub async fn format(
        executor: &BoxedExecutor,
        fs_type: &str,
        device: &Utf8Path,
    ) -> Result<(), FormatError> {
        let mut cmd = Command::new(MKFS);
        cmd.args(["-t", fs_type, device.as_str()]);
        executor.execute_async(&mut cmd).await.map_err(|err| FormatError {
            fs_type: fs_type.to_string(),
            device: device.to_owned(),
            err,
        })?;
        Ok(())
    }
}
