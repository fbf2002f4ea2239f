// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Preparation of the secondary block device that holds container data.

use crate::config::StorageConfig;
use crate::host::HostPaths;
use crate::poll::{self, CondCheckError};
use crate::sequence::BootstrapError;
use camino::{Utf8Path, Utf8PathBuf};
use host_exec::BoxedExecutor;
use host_utils::blkid::Blkid;
use host_utils::fstab::{self, FstabEntry};
use host_utils::mkfs::Mkfs;
use host_utils::mount::Mount;
use slog::{error, info, warn, Logger};
use std::convert::Infallible;
use std::path::PathBuf;

/// A device which is attached, carries a filesystem, and is verified to be
/// mounted at its target.
///
/// Only [prepare_device] produces one, and later steps that must not run
/// before the data volume is in place take it as an argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedDevice {
    pub device: Utf8PathBuf,
    pub mount_point: Utf8PathBuf,
    pub fs_type: String,
    /// A filesystem was created during this run.
    pub formatted: bool,
    /// The device was mounted during this run, rather than found mounted.
    pub newly_mounted: bool,
}

/// The outcome of recording the mount in the filesystem table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistedMount {
    pub uuid: String,
    /// A new line was appended; false if the UUID was already present.
    pub appended: bool,
}

/// Waits for the configured device, formats it if it is blank, and mounts
/// it.
pub async fn prepare_device(
    log: &Logger,
    executor: &BoxedExecutor,
    host: &HostPaths,
    storage: &StorageConfig,
) -> Result<PreparedDevice, BootstrapError> {
    let policy = storage.device_wait.policy();
    info!(
        log, "Waiting for data device";
        "device" => %storage.device,
        "max_attempts" => policy.max_attempts,
    );
    poll::wait_for_condition::<_, Infallible, _, _>(
        || async {
            if host.exists(&storage.device).await {
                Ok(())
            } else {
                Err(CondCheckError::NotYet)
            }
        },
        &policy,
    )
    .await
    .map_err(|err| {
        warn!(log, "Data device never appeared"; "error" => %err);
        BootstrapError::DeviceNotFound {
            device: storage.device.clone(),
            attempts: policy.max_attempts,
        }
    })?;

    let device = host.resolve(&storage.device);
    let target = host.resolve(&storage.mount_point);

    // Never reformat: whatever is on the device is kept.
    let formatted = match Blkid::filesystem_type(executor, &device).await? {
        Some(existing) => {
            if existing != storage.fs_type {
                warn!(
                    log, "Data device has an unexpected filesystem";
                    "device" => %storage.device,
                    "found" => &existing,
                    "expected" => &storage.fs_type,
                );
            } else {
                info!(
                    log, "Data device already formatted";
                    "device" => %storage.device,
                    "fs_type" => &existing,
                );
            }
            false
        }
        None => {
            info!(
                log, "Creating filesystem on blank data device";
                "device" => %storage.device,
                "fs_type" => &storage.fs_type,
            );
            Mkfs::format(executor, &storage.fs_type, &device).await?;
            true
        }
    };

    host.create_dir_all(&storage.mount_point).await?;
    let newly_mounted = if Mount::is_mountpoint(executor, &target).await? {
        let found = Mount::source(executor, &target).await?;
        let found = found.unwrap_or_default();
        if !same_device(&found, &device).await {
            error!(
                log, "Mount target holds another filesystem";
                "mount_point" => %storage.mount_point,
                "device" => %storage.device,
                "found" => &found,
            );
            return Err(BootstrapError::ForeignMount {
                target: storage.mount_point.clone(),
                device: storage.device.clone(),
                found,
            });
        }
        info!(
            log, "Data volume already mounted";
            "mount_point" => %storage.mount_point,
            "source" => &found,
        );
        false
    } else {
        Mount::mount(executor, &storage.fs_type, &device, &target).await?;
        true
    };

    if !Mount::is_mountpoint(executor, &target).await? {
        return Err(BootstrapError::MountVerification {
            target: storage.mount_point.clone(),
        });
    }
    info!(
        log, "Data volume mounted";
        "device" => %storage.device,
        "mount_point" => %storage.mount_point,
        "formatted" => formatted,
    );

    Ok(PreparedDevice {
        device: storage.device.clone(),
        mount_point: storage.mount_point.clone(),
        fs_type: storage.fs_type.clone(),
        formatted,
        newly_mounted,
    })
}

// Device nodes are often reached through aliases (`/dev/xvdb` pointing at
// `/dev/nvme1n1`), so compare where both paths lead.
async fn same_device(found: &str, device: &Utf8Path) -> bool {
    if found.is_empty() {
        return false;
    }
    let found = tokio::fs::canonicalize(found)
        .await
        .unwrap_or_else(|_| PathBuf::from(found));
    let device = tokio::fs::canonicalize(device)
        .await
        .unwrap_or_else(|_| device.as_std_path().to_path_buf());
    found == device
}

/// Records the mount in the filesystem table, keyed by filesystem UUID, so
/// it survives a reboot. Adds nothing if the UUID is already listed.
pub async fn persist_mount(
    log: &Logger,
    executor: &BoxedExecutor,
    host: &HostPaths,
    storage: &StorageConfig,
    device: &PreparedDevice,
) -> Result<PersistedMount, BootstrapError> {
    let uuid = Blkid::uuid(executor, &host.resolve(&device.device)).await?;
    let contents = host.read_or_empty(&storage.fstab_path).await?;

    // The UUID is ASCII, so a lossy decode is enough to find it.
    if fstab::mentions_uuid(&String::from_utf8_lossy(&contents), &uuid) {
        info!(
            log, "Mount already persisted";
            "fstab" => %storage.fstab_path,
            "uuid" => &uuid,
        );
        return Ok(PersistedMount { uuid, appended: false });
    }

    let entry = FstabEntry::data_volume(
        &uuid,
        device.mount_point.as_str(),
        &device.fs_type,
    );
    let mut line = String::new();
    if contents.last().is_some_and(|b| *b != b'\n') {
        line.push('\n');
    }
    line.push_str(&entry.to_fstab());
    line.push('\n');
    host.append(&storage.fstab_path, line).await?;
    info!(
        log, "Persisted mount";
        "fstab" => %storage.fstab_path,
        "entry" => %entry,
    );
    Ok(PersistedMount { uuid, appended: true })
}
