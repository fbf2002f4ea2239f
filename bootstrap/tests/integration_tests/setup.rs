// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A simulated runner host for exercising the whole sequence.

use camino::{Utf8Path, Utf8PathBuf};
use camino_tempfile::Utf8TempDir;
use host_exec::{BoxedExecutor, Input};
use host_fake::{FakeExecutorBuilder, FakeHost};
use runner_host_bootstrap::{Bootstrap, Config, HostPaths};
use runner_test_utils::dev::{test_setup_log, LogContext};

pub const DEVICE: &str = "/dev/xvdb";
pub const MOUNT_POINT: &str = "/var/lib/docker";

pub struct TestHost {
    pub logctx: LogContext,
    pub host: FakeHost,
    pub paths: HostPaths,
    // Keeps the root alive for the duration of the test.
    _root: Utf8TempDir,
}

impl TestHost {
    /// A freshly booted host, with the runtime and agent running from the
    /// image's defaults and no data device attached yet.
    pub fn new(test_name: &str) -> Self {
        let logctx = test_setup_log(test_name);
        let root = Utf8TempDir::new().unwrap();
        let paths = HostPaths::new(root.path());
        let host = FakeHost::new();
        host.add_service("docker.socket")
            .add_service("docker.service")
            .add_service("ecs.service");
        Self { logctx, host, paths, _root: root }
    }

    pub fn resolve(&self, path: &str) -> Utf8PathBuf {
        self.paths.resolve(Utf8Path::new(path))
    }

    /// Attaches a blank data device.
    pub fn attach_device(&self) {
        let device = self.resolve(DEVICE);
        std::fs::create_dir_all(device.parent().unwrap()).unwrap();
        std::fs::write(&device, "").unwrap();
        self.host.add_device(device.as_str());
    }

    /// Makes systemd look like the running service manager.
    pub fn boot_with_systemd(&self) {
        std::fs::create_dir_all(self.resolve("/run/systemd/system")).unwrap();
    }

    pub fn executor(&self) -> BoxedExecutor {
        FakeExecutorBuilder::new(self.logctx.log.clone())
            .with_host(self.host.clone())
            .build()
            .as_executor()
    }

    pub fn bootstrap(&self, config: Config) -> Bootstrap {
        Bootstrap::new(
            &self.logctx.log,
            self.executor(),
            self.paths.clone(),
            config,
        )
    }

    pub fn read(&self, path: &str) -> String {
        std::fs::read_to_string(self.resolve(path)).unwrap()
    }

    pub fn exists(&self, path: &str) -> bool {
        self.resolve(path).exists()
    }

    /// Indices in the command history of `program` invocations whose
    /// arguments start with `args`.
    pub fn positions(&self, program: &str, args: &[&str]) -> Vec<usize> {
        self.host
            .history()
            .iter()
            .enumerate()
            .filter(|(_, input)| matches(input, program, args))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn count(&self, program: &str, args: &[&str]) -> usize {
        self.positions(program, args).len()
    }

    pub fn cleanup_successful(self) {
        self.logctx.cleanup_successful();
    }
}

fn matches(input: &Input, program: &str, args: &[&str]) -> bool {
    input.program == program
        && input.args.len() >= args.len()
        && input.args.iter().zip(args).all(|(a, b)| a == b)
}

pub fn config() -> Config {
    toml::from_str(
        r#"
        [cluster]
        name = "ci-runners"
        region = "eu-west-1"
        "#,
    )
    .unwrap()
}

pub fn config_with_cleanup(schedule: &str) -> Config {
    let mut config = config();
    config.cleanup.enabled = true;
    config.cleanup.schedule = schedule.to_string();
    config
}
