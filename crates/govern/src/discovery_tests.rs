// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use recode_core::clock::FakeClock;
use tempfile::TempDir;

fn fake_proc(entries: &[(u32, &str)]) -> TempDir {
    let root = TempDir::new().unwrap();
    for (pid, comm) in entries {
        let dir = root.path().join(pid.to_string());
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("comm"), format!("{comm}\n")).unwrap();
    }
    root
}

fn daemon_for(proc_root: &TempDir, cgroup_root: &TempDir, targets: &[&str]) -> DiscoveryDaemon<FakeClock> {
    let config = DiscoveryConfig {
        targets: targets.iter().map(|s| s.to_string()).collect(),
        limits: LimitSet::default(),
        scan_interval: std::time::Duration::from_secs(10),
        proc_root: proc_root.path().to_path_buf(),
        cgroup_root: cgroup_root.path().to_path_buf(),
        retry: recode_core::retry::RetryPolicy { max_retries: 3, ..Default::default() },
    };
    DiscoveryDaemon::new(config, FakeClock::new(), CancellationToken::new())
}

#[tokio::test]
async fn discovers_and_governs_matching_processes_once() {
    // Our own live pid, advertised as a target command.
    let own = std::process::id();
    let proc_root = fake_proc(&[(own, "ffmpeg")]);
    let cgroup_root = TempDir::new().unwrap();
    let mut daemon = daemon_for(&proc_root, &cgroup_root, &["ffmpeg"]);

    daemon.tick().await;
    assert!(daemon.governed().contains(&own));
    assert_eq!(daemon.pending_count(), 0);

    // A second pass must not re-attach.
    daemon.tick().await;
    assert_eq!(daemon.governed().len(), 1);
}

#[tokio::test]
async fn ignores_non_target_processes() {
    let own = std::process::id();
    let proc_root = fake_proc(&[(own, "sshd")]);
    let cgroup_root = TempDir::new().unwrap();
    let mut daemon = daemon_for(&proc_root, &cgroup_root, &["ffmpeg"]);

    daemon.tick().await;
    assert!(daemon.governed().is_empty());
    assert_eq!(daemon.pending_count(), 0);
}

#[tokio::test]
async fn failed_attach_lands_in_the_retry_queue() {
    // A pid from a reaped child: listed in the fake proc table but dead on
    // the real system, so attach fails.
    let mut child = std::process::Command::new("true").spawn().unwrap();
    let dead = child.id();
    child.wait().unwrap();

    let proc_root = fake_proc(&[(dead, "ffmpeg")]);
    let cgroup_root = TempDir::new().unwrap();
    let mut daemon = daemon_for(&proc_root, &cgroup_root, &["ffmpeg"]);

    daemon.tick().await;
    assert!(daemon.governed().is_empty());
    // One failed attempt, queued with backoff...
    assert_eq!(daemon.pending_count(), 1);

    // ...and dropped entirely once the process is confirmed gone.
    daemon.tick().await;
    assert_eq!(daemon.pending_count(), 0);
}
