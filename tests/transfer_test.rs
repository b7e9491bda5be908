mod common;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use common::{host_ref, FakeHost, RecordingLogger};
use fleetrun::error::FleetError;
use fleetrun::{Fleet, HostHelpers, Protocol, TransferOptions};
use tempfile::TempDir;

fn fleet_with(hosts: &[Arc<FakeHost>]) -> (Fleet, Arc<RecordingLogger>) {
    let logger = Arc::new(RecordingLogger::default());
    let fleet = Fleet::with_logger(hosts.iter().map(host_ref).collect(), logger.clone());
    (fleet, logger)
}

#[test]
fn test_missing_local_file_fails_before_any_host_call() {
    let host = FakeHost::new("master").into_ref();
    let (fleet, logger) = fleet_with(&[host.clone()]);

    let err = fleet
        .copy_to(
            host_ref(&host),
            Path::new("/definitely/not/here.txt"),
            "/tmp/here.txt",
            &TransferOptions::default(),
        )
        .unwrap_err();

    match err {
        FleetError::LocalFileNotFound(path) => {
            assert_eq!(path, Path::new("/definitely/not/here.txt"))
        }
        other => panic!("expected LocalFileNotFound, got {:?}", other),
    }
    assert!(host.uploads().is_empty());
    assert!(logger.records().is_empty());
}

#[test]
fn test_missing_remote_directory_is_a_command_failure() {
    let dir = TempDir::new().unwrap();
    let local = dir.path().join("payload.txt");
    fs::write(&local, "payload").unwrap();

    let host = FakeHost::new("master").into_ref();
    let (fleet, logger) = fleet_with(&[host.clone()]);

    let err = fleet
        .copy_to(
            host_ref(&host),
            &local,
            "/nonexistent/payload.txt",
            &TransferOptions::default(),
        )
        .unwrap_err();

    match err {
        FleetError::CommandFailed { result, .. } => {
            assert_eq!(result.exit_code, 1);
            assert!(result.stderr.contains("No such file or directory"));
        }
        other => panic!("expected CommandFailed, got {:?}", other),
    }
    assert_eq!(logger.records().len(), 1);
}

#[test]
fn test_copy_to_logs_every_host() {
    let dir = TempDir::new().unwrap();
    let local = dir.path().join("payload.txt");
    fs::write(&local, "payload").unwrap();

    let a = FakeHost::new("agent1").with_roles(&["agent"]).into_ref();
    let b = FakeHost::new("agent2").with_roles(&["agent"]).into_ref();
    let (fleet, logger) = fleet_with(&[a.clone(), b.clone()]);

    let opts = TransferOptions {
        parallel: true,
        ..TransferOptions::default()
    };
    let results = fleet
        .copy_to("agent", &local, "/tmp/payload.txt", &opts)
        .unwrap();

    let hosts: Vec<_> = results.iter().map(|r| r.host.clone()).collect();
    assert_eq!(hosts, vec!["agent1", "agent2"]);
    let mut logged = logger.hosts();
    logged.sort();
    assert_eq!(logged, vec!["agent1", "agent2"]);
    assert_eq!(a.uploads().len(), 1);
    assert_eq!(b.uploads()[0].remote_path, "/tmp/payload.txt");
}

#[test]
fn test_scp_and_rsync_helpers_pick_protocol() {
    let dir = TempDir::new().unwrap();
    let local = dir.path().join("payload.txt");
    fs::write(&local, "payload").unwrap();

    let host = FakeHost::new("master").into_ref();
    let (fleet, _) = fleet_with(&[host.clone()]);
    let rsync = TransferOptions::with_protocol(Protocol::Rsync);

    fleet
        .scp_to(host_ref(&host), &local, "/tmp/a.txt", &rsync)
        .unwrap();
    fleet
        .rsync_to(host_ref(&host), &local, "/tmp/b.txt", &TransferOptions::default())
        .unwrap();

    let protocols: Vec<_> = host.uploads().iter().map(|u| u.protocol).collect();
    assert_eq!(protocols, vec![Protocol::Scp, Protocol::Rsync]);
}

#[test]
fn test_create_remote_file_uses_scp_by_default() {
    let host = FakeHost::new("master").into_ref();
    let (fleet, _) = fleet_with(&[host.clone()]);

    fleet
        .create_remote_file(
            host_ref(&host),
            "/tmp/motd",
            "hello fleet\n",
            &TransferOptions::default(),
        )
        .unwrap();

    let uploads = host.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].protocol, Protocol::Scp);
    assert_eq!(uploads[0].remote_path, "/tmp/motd");
    assert_eq!(uploads[0].contents.as_deref(), Some("hello fleet\n"));
    // The staging file is gone once the call returns
    assert!(!uploads[0].local_path.exists());
}

#[test]
fn test_create_remote_file_with_rsync() {
    let a = FakeHost::new("agent1").with_roles(&["agent"]).into_ref();
    let b = FakeHost::new("agent2").with_roles(&["agent"]).into_ref();
    let (fleet, _) = fleet_with(&[a.clone(), b.clone()]);

    let results = fleet
        .create_remote_file(
            "agent",
            "/tmp/config.yml",
            "key: value\n",
            &TransferOptions::with_protocol(Protocol::Rsync),
        )
        .unwrap();

    assert_eq!(results.len(), 2);
    for host in [&a, &b] {
        let uploads = host.uploads();
        assert_eq!(uploads[0].protocol, Protocol::Rsync);
        assert_eq!(uploads[0].contents.as_deref(), Some("key: value\n"));
    }
}

#[test]
fn test_copy_from_visits_hosts_in_order() {
    let dir = TempDir::new().unwrap();
    let a = FakeHost::new("agent1").with_roles(&["agent"]).into_ref();
    let b = FakeHost::new("agent2").with_roles(&["agent"]).into_ref();
    let (fleet, logger) = fleet_with(&[a.clone(), b.clone()]);

    let opts = TransferOptions {
        parallel: true,
        ..TransferOptions::default()
    };
    fleet
        .copy_from("agent", "/var/log/syslog", dir.path(), &opts)
        .unwrap();

    assert_eq!(a.downloads()[0].0, "/var/log/syslog");
    assert_eq!(b.downloads()[0].1, dir.path());
    assert_eq!(logger.hosts(), vec!["agent1", "agent2"]);
}
