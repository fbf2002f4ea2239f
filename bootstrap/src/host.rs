// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! File-level access to the host being bootstrapped.

use camino::{Utf8Path, Utf8PathBuf};
use std::io;
use tokio::io::AsyncWriteExt;

/// Resolves host paths under a root directory.
///
/// The root is `/` on a real host, and a temporary directory in tests.
/// Configured paths are always written as the host sees them; only file
/// access and the arguments of host commands go through [Self::resolve].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostPaths {
    root: Utf8PathBuf,
}

impl HostPaths {
    pub fn new<P: Into<Utf8PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Returns where `path` lives under the root.
    pub fn resolve(&self, path: &Utf8Path) -> Utf8PathBuf {
        // `join` replaces the base entirely when given an absolute path, so
        // strip the leading separators first.
        let relative = path.as_str().trim_start_matches('/');
        if relative.is_empty() {
            self.root.clone()
        } else {
            self.root.join(relative)
        }
    }

    /// Writes `contents` to `path`, creating parent directories as needed.
    pub async fn write(
        &self,
        path: &Utf8Path,
        contents: impl AsRef<[u8]>,
    ) -> Result<(), HostIoError> {
        let resolved = self.resolve(path);
        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|err| {
                HostIoError::new("create parent directory of", path, err)
            })?;
        }
        tokio::fs::write(&resolved, contents)
            .await
            .map_err(|err| HostIoError::new("write", path, err))
    }

    /// Reads the raw contents of `path`. A missing file reads as empty.
    pub async fn read_or_empty(
        &self,
        path: &Utf8Path,
    ) -> Result<Vec<u8>, HostIoError> {
        match tokio::fs::read(self.resolve(path)).await {
            Ok(contents) => Ok(contents),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(HostIoError::new("read", path, err)),
        }
    }

    /// Appends `contents` to `path`, creating the file and its parent
    /// directories as needed. Existing contents are never rewritten.
    pub async fn append(
        &self,
        path: &Utf8Path,
        contents: impl AsRef<[u8]>,
    ) -> Result<(), HostIoError> {
        let resolved = self.resolve(path);
        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|err| {
                HostIoError::new("create parent directory of", path, err)
            })?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&resolved)
            .await
            .map_err(|err| HostIoError::new("open", path, err))?;
        file.write_all(contents.as_ref())
            .await
            .map_err(|err| HostIoError::new("append to", path, err))?;
        file.flush().await.map_err(|err| HostIoError::new("flush", path, err))
    }

    pub async fn create_dir_all(
        &self,
        path: &Utf8Path,
    ) -> Result<(), HostIoError> {
        tokio::fs::create_dir_all(self.resolve(path))
            .await
            .map_err(|err| HostIoError::new("create directory", path, err))
    }

    pub async fn set_mode(
        &self,
        path: &Utf8Path,
        mode: u32,
    ) -> Result<(), HostIoError> {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(
            self.resolve(path),
            std::fs::Permissions::from_mode(mode),
        )
        .await
        .map_err(|err| HostIoError::new("set permissions on", path, err))
    }

    pub async fn exists(&self, path: &Utf8Path) -> bool {
        tokio::fs::try_exists(self.resolve(path)).await.unwrap_or(false)
    }

    pub async fn is_dir(&self, path: &Utf8Path) -> bool {
        tokio::fs::metadata(self.resolve(path))
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("failed to {op} {path}: {err}")]
pub struct HostIoError {
    op: &'static str,
    path: Utf8PathBuf,
    #[source]
    err: io::Error,
}

impl HostIoError {
    fn new(op: &'static str, path: &Utf8Path, err: io::Error) -> Self {
        Self { op, path: path.to_owned(), err }
    }
}
