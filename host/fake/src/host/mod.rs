// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A simulated runner host.

mod blkid;
mod docker;
mod mkfs;
mod mount;
mod parse;
mod systemctl;

use host_exec::{Input, Output, OutputExt};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

// Exit statuses used by the real tools we emulate.
const SYSTEMCTL_NO_SUCH_UNIT: i32 = 5;
const BLKID_NOT_FOUND: i32 = 2;
const MOUNT_FAILURE: i32 = 32;
const NOT_A_MOUNTPOINT: i32 = 32;
const FINDMNT_NO_MATCH: i32 = 1;

/// The state of a unit known to the simulated service manager.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ServiceState {
    pub enabled: bool,
    pub active: bool,
}

/// A simulated block device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FakeDevice {
    /// The filesystem signature on the device, if any.
    pub fs_type: Option<String>,
    /// The filesystem UUID; only meaningful once `fs_type` is set.
    pub uuid: Option<String>,
    /// Number of times `mkfs` has run against this device.
    pub format_count: usize,
}

struct Runtime {
    unit: String,
    root_dir: String,
    version: String,
    // `None` means the runtime never becomes healthy.
    ready_after: Option<u32>,
    info_attempts: u32,
}

struct Inner {
    services: BTreeMap<String, ServiceState>,
    failing_units: BTreeSet<String>,
    // Units whose last start was queued with `--no-block`.
    nonblocking_starts: BTreeSet<String>,
    devices: BTreeMap<String, FakeDevice>,
    // Mount target -> device.
    mounts: BTreeMap<String, String>,
    ignore_mounts: bool,
    runtime: Runtime,
    uuid_counter: u64,
    history: Vec<Input>,
}

/// A simulated host, which interprets the commands issued through an
/// executor built by [crate::FakeExecutorBuilder::with_host].
///
/// Clones share the same underlying state, so a test can keep a handle to
/// inspect the host after handing one to the executor.
#[derive(Clone)]
pub struct FakeHost {
    inner: Arc<Mutex<Inner>>,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                services: BTreeMap::new(),
                failing_units: BTreeSet::new(),
                nonblocking_starts: BTreeSet::new(),
                devices: BTreeMap::new(),
                mounts: BTreeMap::new(),
                ignore_mounts: false,
                runtime: Runtime {
                    unit: "docker.service".to_string(),
                    root_dir: "/var/lib/docker".to_string(),
                    version: "27.3.1".to_string(),
                    ready_after: Some(0),
                    info_attempts: 0,
                },
                uuid_counter: 0,
                history: Vec::new(),
            })),
        }
    }

    /// Registers a unit with the service manager, initially enabled and
    /// running, as it would be on a freshly booted image.
    pub fn add_service<S: Into<String>>(&self, unit: S) -> &Self {
        self.inner.lock().unwrap().services.insert(
            unit.into(),
            ServiceState { enabled: true, active: true },
        );
        self
    }

    /// Makes every `systemctl` operation on `unit` fail.
    pub fn fail_unit<S: Into<String>>(&self, unit: S) -> &Self {
        self.inner.lock().unwrap().failing_units.insert(unit.into());
        self
    }

    /// Attaches a blank block device.
    pub fn add_device<S: Into<String>>(&self, path: S) -> &Self {
        self.inner.lock().unwrap().devices.insert(
            path.into(),
            FakeDevice { fs_type: None, uuid: None, format_count: 0 },
        );
        self
    }

    /// Attaches a block device which already carries a filesystem.
    pub fn add_formatted_device<S: Into<String>>(
        &self,
        path: S,
        fs_type: S,
        uuid: S,
    ) -> &Self {
        self.inner.lock().unwrap().devices.insert(
            path.into(),
            FakeDevice {
                fs_type: Some(fs_type.into()),
                uuid: Some(uuid.into()),
                format_count: 0,
            },
        );
        self
    }

    /// Mounts `device` at `target` outside of any command, as if something
    /// else on the host had mounted it first.
    pub fn mount_external<S: Into<String>>(
        &self,
        device: S,
        target: S,
    ) -> &Self {
        let mut inner = self.inner.lock().unwrap();
        inner.mounts.insert(target.into(), device.into());
        self
    }

    /// When set, `mount` reports success without mounting anything.
    pub fn ignore_mounts(&self, ignore: bool) -> &Self {
        self.inner.lock().unwrap().ignore_mounts = ignore;
        self
    }

    /// Sets the unit which runs the container runtime, and the data root it
    /// reports once running.
    pub fn set_runtime<S: Into<String>>(&self, unit: S, root_dir: S) -> &Self {
        let mut inner = self.inner.lock().unwrap();
        inner.runtime.unit = unit.into();
        inner.runtime.root_dir = root_dir.into();
        self
    }

    /// Sets how many failed health queries the runtime answers, once running,
    /// before it reports healthy. `None` means it never does.
    pub fn runtime_ready_after(&self, attempts: Option<u32>) -> &Self {
        self.inner.lock().unwrap().runtime.ready_after = attempts;
        self
    }

    pub fn service(&self, unit: &str) -> Option<ServiceState> {
        self.inner.lock().unwrap().services.get(unit).copied()
    }

    /// Whether the last start of `unit` was queued without waiting for it.
    pub fn started_nonblocking(&self, unit: &str) -> bool {
        self.inner.lock().unwrap().nonblocking_starts.contains(unit)
    }

    pub fn device(&self, path: &str) -> Option<FakeDevice> {
        self.inner.lock().unwrap().devices.get(path).cloned()
    }

    pub fn is_mounted(&self, target: &str) -> bool {
        self.inner.lock().unwrap().mounts.contains_key(target)
    }

    /// Simulates a reboot: mounts are dropped and every service stops, but
    /// services keep their enablement and devices keep their contents.
    pub fn reboot(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.mounts.clear();
        inner.runtime.info_attempts = 0;
        for state in inner.services.values_mut() {
            state.active = state.enabled;
        }
    }

    /// Every command executed so far, in order.
    pub fn history(&self) -> Vec<Input> {
        self.inner.lock().unwrap().history.clone()
    }

    /// Every command executed so far, rendered as shell strings.
    pub fn history_strings(&self) -> Vec<String> {
        self.history().iter().map(|input| input.to_string()).collect()
    }

    /// Counts executed commands whose rendered form starts with `prefix`.
    pub fn count_commands(&self, prefix: &str) -> usize {
        self.history_strings()
            .iter()
            .filter(|cmd| cmd.starts_with(prefix))
            .count()
    }

    pub(crate) fn execute(&self, input: Input) -> Output {
        let mut inner = self.inner.lock().unwrap();
        inner.history.push(input.clone());

        let program = input.program.clone();
        let result = match program.as_str() {
            host_exec::SYSTEMCTL => systemctl::Command::try_from(input)
                .map(|cmd| inner.systemctl(cmd)),
            host_exec::BLKID => {
                blkid::Command::try_from(input).map(|cmd| inner.blkid(cmd))
            }
            host_exec::MKFS => {
                mkfs::Command::try_from(input).map(|cmd| inner.mkfs(cmd))
            }
            host_exec::MOUNT | host_exec::MOUNTPOINT | host_exec::FINDMNT => {
                mount::Command::try_from(input).map(|cmd| inner.mount(cmd))
            }
            host_exec::DOCKER => {
                docker::Command::try_from(input).map(|cmd| inner.docker(cmd))
            }
            program => Err(format!("Unsupported program: {program}")),
        };
        result.unwrap_or_else(|err| Output::failure().set_stderr(err))
    }
}

impl Inner {
    fn systemctl(&mut self, cmd: systemctl::Command) -> Output {
        let unit = match &cmd {
            systemctl::Command::DaemonReload => return Output::success(),
            systemctl::Command::Disable { unit }
            | systemctl::Command::Enable { unit, .. } => unit.clone(),
        };
        if self.failing_units.contains(&unit) {
            return Output::failure()
                .set_stderr(format!("Job for {unit} failed."));
        }
        let Some(state) = self.services.get_mut(&unit) else {
            return Output::exit_code(SYSTEMCTL_NO_SUCH_UNIT)
                .set_stderr(format!("Unit {unit} does not exist."));
        };
        match cmd {
            systemctl::Command::Disable { .. } => {
                *state = ServiceState { enabled: false, active: false };
            }
            systemctl::Command::Enable { no_block, .. } => {
                *state = ServiceState { enabled: true, active: true };
                if no_block {
                    self.nonblocking_starts.insert(unit.clone());
                } else {
                    self.nonblocking_starts.remove(&unit);
                }
            }
            systemctl::Command::DaemonReload => unreachable!(),
        }
        if unit == self.runtime.unit {
            self.runtime.info_attempts = 0;
        }
        Output::success()
    }

    fn blkid(&mut self, cmd: blkid::Command) -> Output {
        let Some(device) = self.devices.get(&cmd.device) else {
            return Output::exit_code(BLKID_NOT_FOUND);
        };
        let value = match cmd.tag {
            blkid::Tag::Type => device.fs_type.as_ref(),
            blkid::Tag::Uuid => device.uuid.as_ref(),
        };
        match value {
            Some(value) => Output::success().set_stdout(format!("{value}\n")),
            None => Output::exit_code(BLKID_NOT_FOUND),
        }
    }

    fn mkfs(&mut self, cmd: mkfs::Command) -> Output {
        if self.mounts.values().any(|device| device == &cmd.device) {
            return Output::failure()
                .set_stderr(format!("{} is mounted", cmd.device));
        }
        self.uuid_counter += 1;
        let uuid = format!("00000000-0000-4000-8000-{:012}", self.uuid_counter);
        let Some(device) = self.devices.get_mut(&cmd.device) else {
            return Output::failure().set_stderr(format!(
                "The file {} does not exist",
                cmd.device
            ));
        };
        device.fs_type = Some(cmd.fs_type);
        device.uuid = Some(uuid);
        device.format_count += 1;
        Output::success()
    }

    fn mount(&mut self, cmd: mount::Command) -> Output {
        match cmd {
            mount::Command::Mount { fs_type, device, target } => {
                let Some(dev) = self.devices.get(&device) else {
                    return Output::exit_code(MOUNT_FAILURE).set_stderr(
                        format!("special device {device} does not exist"),
                    );
                };
                if dev.fs_type.as_deref() != Some(fs_type.as_str()) {
                    return Output::exit_code(MOUNT_FAILURE).set_stderr(
                        format!("wrong fs type on {device}"),
                    );
                }
                if self.mounts.contains_key(&target) {
                    return Output::exit_code(MOUNT_FAILURE).set_stderr(
                        format!("{target} already mounted"),
                    );
                }
                if !self.ignore_mounts {
                    self.mounts.insert(target, device);
                }
                Output::success()
            }
            mount::Command::IsMountpoint { target } => {
                if self.mounts.contains_key(&target) {
                    Output::success()
                } else {
                    Output::exit_code(NOT_A_MOUNTPOINT)
                }
            }
            mount::Command::Source { target } => {
                match self.mounts.get(&target) {
                    Some(device) => {
                        Output::success().set_stdout(format!("{device}\n"))
                    }
                    None => Output::exit_code(FINDMNT_NO_MATCH),
                }
            }
        }
    }

    fn docker(&mut self, cmd: docker::Command) -> Output {
        match cmd {
            docker::Command::Info => {
                let active = self
                    .services
                    .get(&self.runtime.unit)
                    .map(|state| state.active)
                    .unwrap_or(false);
                if !active {
                    return Output::failure().set_stderr(
                        "Cannot connect to the Docker daemon. \
                         Is the docker daemon running?",
                    );
                }
                let attempts = self.runtime.info_attempts;
                self.runtime.info_attempts += 1;
                match self.runtime.ready_after {
                    Some(ready_after) if attempts >= ready_after => {
                        let info = serde_json::json!({
                            "DockerRootDir": self.runtime.root_dir,
                            "ServerVersion": self.runtime.version,
                        });
                        Output::success().set_stdout(format!("{info}\n"))
                    }
                    _ => Output::failure()
                        .set_stderr("daemon is still initializing"),
                }
            }
        }
    }
}
