// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tests of scheduled cleanup installation.

use super::setup::{config_with_cleanup, TestHost};
use camino::Utf8PathBuf;
use expectorate::assert_contents;
use host_exec::SYSTEMCTL;
use runner_host_bootstrap::cleanup::schedule::TimerSchedule;
use runner_host_bootstrap::cleanup::{InstalledSchedule, SchedulingBackend};
use runner_host_bootstrap::CleanupOutcome;
use std::os::unix::fs::PermissionsExt;

const SCRIPT: &str = "/usr/local/bin/docker-cleanup.sh";
const SERVICE: &str = "/etc/systemd/system/docker-cleanup.service";
const TIMER: &str = "/etc/systemd/system/docker-cleanup.timer";
const CRON: &str = "/etc/cron.d/docker-cleanup";

#[tokio::test]
async fn test_cleanup_timer() {
    let test = TestHost::new("test_cleanup_timer");
    test.attach_device();
    test.boot_with_systemd();

    let report =
        test.bootstrap(config_with_cleanup("30 14 * * *")).run().await.unwrap();

    let install = match report.cleanup {
        CleanupOutcome::Installed(install) => install,
        other => panic!("cleanup not installed: {other:?}"),
    };
    assert_eq!(
        install.backend,
        SchedulingBackend::PeriodicTrigger {
            unit_dir: "/etc/systemd/system".into(),
            unit_name: "docker-cleanup".to_string(),
        }
    );
    assert_eq!(
        install.installed,
        InstalledSchedule::Timer {
            timer: Utf8PathBuf::from(TIMER),
            service: Utf8PathBuf::from(SERVICE),
            schedule: TimerSchedule::DailyAt { hour: 14, minute: 30 },
        }
    );

    assert_contents("tests/output/docker-cleanup.sh", &test.read(SCRIPT));
    assert_contents("tests/output/docker-cleanup.service", &test.read(SERVICE));
    assert_contents("tests/output/docker-cleanup.timer", &test.read(TIMER));
    let mode = std::fs::metadata(test.resolve(SCRIPT)).unwrap().permissions();
    assert_eq!(mode.mode() & 0o777, 0o755);
    assert!(!test.exists(CRON));

    assert_eq!(test.count(SYSTEMCTL, &["daemon-reload"]), 1);
    assert_eq!(
        test.count(SYSTEMCTL, &["enable", "--now", "docker-cleanup.timer"]),
        1
    );
    // Cleanup is installed after the agent has been handed off.
    let agent = test.positions(SYSTEMCTL, &["enable", "--now", "--no-block"]);
    let reload = test.positions(SYSTEMCTL, &["daemon-reload"]);
    assert!(agent[0] < reload[0]);

    test.cleanup_successful();
}

#[tokio::test]
async fn test_cleanup_timer_fallback() {
    let test = TestHost::new("test_cleanup_timer_fallback");
    test.attach_device();
    test.boot_with_systemd();

    let report =
        test.bootstrap(config_with_cleanup("0 0 1 * *")).run().await.unwrap();

    assert!(matches!(report.cleanup, CleanupOutcome::Installed(_)));
    let timer = test.read(TIMER);
    assert!(timer.contains("\nOnCalendar=hourly\n"), "{timer}");

    test.cleanup_successful();
}

#[tokio::test]
async fn test_cleanup_cron() {
    let test = TestHost::new("test_cleanup_cron");
    test.attach_device();

    let report =
        test.bootstrap(config_with_cleanup("0 0 1 * *")).run().await.unwrap();

    let install = match report.cleanup {
        CleanupOutcome::Installed(install) => install,
        other => panic!("cleanup not installed: {other:?}"),
    };
    assert_eq!(
        install.backend,
        SchedulingBackend::LegacyScheduleFile { path: CRON.into() }
    );
    assert_eq!(
        test.read(CRON),
        "0 0 1 * * root /usr/local/bin/docker-cleanup.sh\n"
    );
    assert_contents("tests/output/docker-cleanup.sh", &test.read(SCRIPT));
    assert!(!test.exists(TIMER));
    assert!(!test.exists(SERVICE));
    assert_eq!(test.count(SYSTEMCTL, &["daemon-reload"]), 0);

    test.cleanup_successful();
}

#[tokio::test]
async fn test_cleanup_failure_is_tolerated() {
    let test = TestHost::new("test_cleanup_failure_is_tolerated");
    test.attach_device();
    // A file where the script's directory should be.
    std::fs::create_dir_all(test.resolve("/usr/local")).unwrap();
    std::fs::write(test.resolve("/usr/local/bin"), "").unwrap();

    let report =
        test.bootstrap(config_with_cleanup("0 * * * *")).run().await.unwrap();

    assert!(
        matches!(report.cleanup, CleanupOutcome::Failed(_)),
        "{:?}",
        report.cleanup
    );
    assert!(report.agent_started);

    test.cleanup_successful();
}
