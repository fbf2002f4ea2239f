// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tests of the full bootstrap sequence against a simulated host.

use super::setup::{config, TestHost, DEVICE, MOUNT_POINT};
use host_exec::{DOCKER, FINDMNT, MKFS, MOUNT, MOUNTPOINT, SYSTEMCTL};
use host_fake::ServiceState;
use pretty_assertions::assert_eq;
use runner_host_bootstrap::{BootstrapError, CleanupOutcome};

const FIRST_UUID: &str = "00000000-0000-4000-8000-000000000001";
const RUNNING: ServiceState = ServiceState { enabled: true, active: true };

#[tokio::test]
async fn test_bootstrap_blank_device() {
    let test = TestHost::new("test_bootstrap_blank_device");
    test.attach_device();

    let report = test.bootstrap(config()).run().await.unwrap();

    assert!(report.device.formatted);
    assert!(report.device.newly_mounted);
    assert_eq!(report.mount.uuid, FIRST_UUID);
    assert!(report.mount.appended);
    assert_eq!(report.runtime.root_dir, MOUNT_POINT);
    assert!(report.quiesce_failures.is_empty());
    assert!(report.agent_started);
    assert_eq!(report.cleanup, CleanupOutcome::Disabled);

    assert_eq!(
        test.read("/etc/ecs/ecs.config"),
        "ECS_CLUSTER=ci-runners\nAWS_DEFAULT_REGION=eu-west-1\n"
    );
    assert_eq!(
        test.read("/etc/fstab"),
        format!("UUID={FIRST_UUID} /var/lib/docker ext4 defaults,nofail 0 2\n")
    );
    assert_eq!(
        test.read("/etc/docker/daemon.json"),
        "{\n  \"data-root\": \"/var/lib/docker\"\n}\n"
    );
    assert!(test.host.is_mounted(test.resolve(MOUNT_POINT).as_str()));
    assert_eq!(test.host.service("docker.service"), Some(RUNNING));
    assert_eq!(test.host.service("ecs.service"), Some(RUNNING));
    let socket = test.host.service("docker.socket");
    assert_eq!(socket.map(|s| s.active), Some(false));

    test.cleanup_successful();
}

#[tokio::test]
async fn test_bootstrap_command_order() {
    let test = TestHost::new("test_bootstrap_command_order");
    test.attach_device();
    test.bootstrap(config()).run().await.unwrap();

    let history = test.host.history();
    let quiesced: Vec<String> = history[..3]
        .iter()
        .map(|input| input.args.iter().cloned().collect::<Vec<_>>().join(" "))
        .collect();
    assert_eq!(
        quiesced,
        [
            "disable --now docker.socket",
            "disable --now docker.service",
            "disable --now ecs.service",
        ]
    );

    // The runtime only starts once the mount has been verified.
    let mkfs = test.positions(MKFS, &[]);
    let mount = test.positions(MOUNT, &[]);
    let verified = *test.positions(MOUNTPOINT, &[]).last().unwrap();
    let runtime_start =
        test.positions(SYSTEMCTL, &["enable", "--now", "docker.service"]);
    assert_eq!(mkfs.len(), 1);
    assert_eq!(mount.len(), 1);
    assert_eq!(runtime_start.len(), 1);
    assert!(mkfs[0] < mount[0]);
    assert!(mount[0] < verified);
    assert!(verified < runtime_start[0]);

    // The agent is queued without blocking, never polled, and is the last
    // thing the sequence does.
    let agent_start = test.positions(
        SYSTEMCTL,
        &["enable", "--now", "--no-block", "ecs.service"],
    );
    assert_eq!(agent_start, [history.len() - 1]);
    assert!(test.host.started_nonblocking("ecs.service"));
    assert!(!test.host.started_nonblocking("docker.service"));
    let info = test.positions(DOCKER, &["info"]);
    assert!(info.iter().all(|i| *i < agent_start[0]));

    test.cleanup_successful();
}

#[tokio::test]
async fn test_bootstrap_is_idempotent_across_reboots() {
    let test = TestHost::new("test_bootstrap_is_idempotent_across_reboots");
    test.attach_device();

    let first = test.bootstrap(config()).run().await.unwrap();
    assert!(first.device.formatted);

    // Data written to the volume before a reboot.
    let marker = test.resolve(MOUNT_POINT).join("marker");
    std::fs::write(&marker, "keep me").unwrap();

    test.host.reboot();
    assert!(!test.host.is_mounted(test.resolve(MOUNT_POINT).as_str()));

    let second = test.bootstrap(config()).run().await.unwrap();
    assert!(!second.device.formatted);
    assert!(second.device.newly_mounted);
    assert_eq!(second.mount.uuid, first.mount.uuid);
    assert!(!second.mount.appended);

    assert_eq!(test.count(MKFS, &[]), 1);
    let device = test.host.device(test.resolve(DEVICE).as_str()).unwrap();
    assert_eq!(device.format_count, 1);
    assert_eq!(std::fs::read_to_string(&marker).unwrap(), "keep me");

    let fstab = test.read("/etc/fstab");
    assert_eq!(fstab.matches(&first.mount.uuid).count(), 1, "{fstab}");

    test.cleanup_successful();
}

#[tokio::test]
async fn test_bootstrap_rerun_while_mounted() {
    let test = TestHost::new("test_bootstrap_rerun_while_mounted");
    test.attach_device();

    test.bootstrap(config()).run().await.unwrap();
    let report = test.bootstrap(config()).run().await.unwrap();

    assert!(!report.device.formatted);
    assert!(!report.device.newly_mounted);
    assert_eq!(test.count(MOUNT, &[]), 1);
    assert_eq!(test.read("/etc/fstab").lines().count(), 1);

    test.cleanup_successful();
}

#[tokio::test]
async fn test_bootstrap_keeps_existing_fstab() {
    let test = TestHost::new("test_bootstrap_keeps_existing_fstab");
    test.attach_device();
    std::fs::create_dir_all(test.resolve("/etc")).unwrap();
    std::fs::write(test.resolve("/etc/fstab"), "LABEL=/ / ext4 defaults 1 1")
        .unwrap();

    test.bootstrap(config()).run().await.unwrap();

    assert_eq!(
        test.read("/etc/fstab"),
        format!(
            "LABEL=/ / ext4 defaults 1 1\n\
             UUID={FIRST_UUID} /var/lib/docker ext4 defaults,nofail 0 2\n"
        )
    );

    test.cleanup_successful();
}

#[tokio::test]
async fn test_bootstrap_appends_to_non_utf8_fstab() {
    let test = TestHost::new("test_bootstrap_appends_to_non_utf8_fstab");
    test.attach_device();
    let original: &[u8] = b"# caf\xe9\nLABEL=/ / ext4 defaults 1 1";
    std::fs::create_dir_all(test.resolve("/etc")).unwrap();
    std::fs::write(test.resolve("/etc/fstab"), original).unwrap();

    let report = test.bootstrap(config()).run().await.unwrap();
    assert!(report.mount.appended);

    let fstab = std::fs::read(test.resolve("/etc/fstab")).unwrap();
    let appended = format!(
        "\nUUID={FIRST_UUID} /var/lib/docker ext4 defaults,nofail 0 2\n"
    );
    assert_eq!(&fstab[..original.len()], original);
    assert_eq!(&fstab[original.len()..], appended.as_bytes());

    test.cleanup_successful();
}

#[tokio::test]
async fn test_bootstrap_preformatted_device() {
    let test = TestHost::new("test_bootstrap_preformatted_device");
    let device = test.resolve(DEVICE);
    std::fs::create_dir_all(device.parent().unwrap()).unwrap();
    std::fs::write(&device, "").unwrap();
    test.host.add_formatted_device(
        device.as_str(),
        "ext4",
        "3e6be9de-8139-11d1-9106-a43f08d823a6",
    );

    let report = test.bootstrap(config()).run().await.unwrap();

    assert!(!report.device.formatted);
    assert_eq!(report.mount.uuid, "3e6be9de-8139-11d1-9106-a43f08d823a6");
    assert_eq!(test.count(MKFS, &[]), 0);

    test.cleanup_successful();
}

#[tokio::test(start_paused = true)]
async fn test_bootstrap_missing_device() {
    let test = TestHost::new("test_bootstrap_missing_device");

    let err = test.bootstrap(config()).run().await.unwrap_err();

    match err {
        BootstrapError::DeviceNotFound { device, attempts } => {
            assert_eq!(device, DEVICE);
            assert_eq!(attempts, 60);
        }
        err => panic!("unexpected error: {err}"),
    }
    // The agent configuration is written before waiting for the device,
    // but nothing after the wait runs.
    assert!(test.exists("/etc/ecs/ecs.config"));
    assert!(!test.exists("/etc/docker/daemon.json"));
    assert!(!test.exists("/etc/fstab"));
    assert_eq!(test.count(MKFS, &[]), 0);
    assert_eq!(test.count(MOUNT, &[]), 0);
    assert_eq!(test.count(SYSTEMCTL, &["enable"]), 0);
    assert_eq!(test.count(DOCKER, &[]), 0);

    test.cleanup_successful();
}

#[tokio::test]
async fn test_bootstrap_mount_verification_failure() {
    let test = TestHost::new("test_bootstrap_mount_verification_failure");
    test.attach_device();
    test.host.ignore_mounts(true);

    let err = test.bootstrap(config()).run().await.unwrap_err();

    assert!(
        matches!(
            err,
            BootstrapError::MountVerification { ref target }
                if target == MOUNT_POINT
        ),
        "{err}"
    );
    assert!(!test.exists("/etc/docker/daemon.json"));
    assert!(!test.exists("/etc/fstab"));
    assert_eq!(test.count(SYSTEMCTL, &["enable"]), 0);
    assert_eq!(test.count(DOCKER, &[]), 0);
    assert_eq!(
        test.host.service("docker.service"),
        Some(ServiceState { enabled: false, active: false })
    );

    test.cleanup_successful();
}

#[tokio::test]
async fn test_bootstrap_refuses_foreign_mount() {
    let test = TestHost::new("test_bootstrap_refuses_foreign_mount");
    test.attach_device();
    let other = test.resolve("/dev/xvdc");
    std::fs::write(&other, "").unwrap();
    test.host.mount_external(
        other.as_str(),
        test.resolve(MOUNT_POINT).as_str(),
    );

    let err = test.bootstrap(config()).run().await.unwrap_err();

    match err {
        BootstrapError::ForeignMount { target, device, found } => {
            assert_eq!(target, MOUNT_POINT);
            assert_eq!(device, DEVICE);
            assert_eq!(found, other.as_str());
        }
        err => panic!("unexpected error: {err}"),
    }
    assert_eq!(test.count(MOUNT, &[]), 0);
    assert!(!test.exists("/etc/docker/daemon.json"));
    assert!(!test.exists("/etc/fstab"));
    assert_eq!(test.count(SYSTEMCTL, &["enable"]), 0);

    test.cleanup_successful();
}

#[tokio::test]
async fn test_bootstrap_accepts_mount_through_device_alias() {
    let test =
        TestHost::new("test_bootstrap_accepts_mount_through_device_alias");
    // `/dev/xvdb` is a link to the device node that the kernel reports.
    let node = test.resolve("/dev/nvme1n1");
    let alias = test.resolve(DEVICE);
    std::fs::create_dir_all(node.parent().unwrap()).unwrap();
    std::fs::write(&node, "").unwrap();
    std::os::unix::fs::symlink(&node, &alias).unwrap();
    test.host.add_formatted_device(alias.as_str(), "ext4", FIRST_UUID);
    test.host.mount_external(
        node.as_str(),
        test.resolve(MOUNT_POINT).as_str(),
    );

    let report = test.bootstrap(config()).run().await.unwrap();

    assert!(!report.device.newly_mounted);
    assert_eq!(test.count(MOUNT, &[]), 0);
    assert_eq!(test.count(FINDMNT, &[]), 1);
    assert!(report.mount.appended);

    test.cleanup_successful();
}

#[tokio::test(start_paused = true)]
async fn test_bootstrap_runtime_never_healthy() {
    let test = TestHost::new("test_bootstrap_runtime_never_healthy");
    test.attach_device();
    test.host.runtime_ready_after(None);

    let mut config = config();
    config.cleanup.enabled = true;
    let err = test.bootstrap(config).run().await.unwrap_err();

    assert!(
        matches!(err, BootstrapError::RuntimeUnhealthy { attempts: 30 }),
        "{err}"
    );
    assert_eq!(test.count(DOCKER, &["info"]), 30);
    assert_eq!(test.count(SYSTEMCTL, &["enable", "--now", "--no-block"]), 0);
    assert!(!test.exists("/usr/local/bin/docker-cleanup.sh"));
    assert_eq!(
        test.host.service("ecs.service"),
        Some(ServiceState { enabled: false, active: false })
    );

    test.cleanup_successful();
}

#[tokio::test(start_paused = true)]
async fn test_bootstrap_runtime_slow_to_start() {
    let test = TestHost::new("test_bootstrap_runtime_slow_to_start");
    test.attach_device();
    test.host.runtime_ready_after(Some(5));

    let report = test.bootstrap(config()).run().await.unwrap();

    assert_eq!(report.runtime.server_version, "27.3.1");
    assert_eq!(test.count(DOCKER, &["info"]), 6);
    assert!(report.agent_started);

    test.cleanup_successful();
}

#[tokio::test]
async fn test_bootstrap_tolerates_agent_failures() {
    let test = TestHost::new("test_bootstrap_tolerates_agent_failures");
    test.attach_device();
    test.host.fail_unit("ecs.service");

    let report = test.bootstrap(config()).run().await.unwrap();

    assert_eq!(report.quiesce_failures, ["ecs.service"]);
    assert!(!report.agent_started);

    test.cleanup_successful();
}

#[tokio::test]
async fn test_bootstrap_tolerates_missing_units() {
    let test = TestHost::new("test_bootstrap_tolerates_missing_units");
    test.attach_device();
    let mut config = config();
    config.runtime.socket_unit = "containerd.socket".to_string();

    let report = test.bootstrap(config).run().await.unwrap();

    assert_eq!(report.quiesce_failures, ["containerd.socket"]);
    assert!(report.agent_started);

    test.cleanup_successful();
}

#[tokio::test]
async fn test_bootstrap_runtime_root_mismatch_is_tolerated() {
    let test =
        TestHost::new("test_bootstrap_runtime_root_mismatch_is_tolerated");
    test.attach_device();
    test.host.set_runtime("docker.service", "/var/lib/docker-root-disk");

    let report = test.bootstrap(config()).run().await.unwrap();

    assert_eq!(report.runtime.root_dir, "/var/lib/docker-root-disk");
    assert!(report.agent_started);

    test.cleanup_successful();
}
