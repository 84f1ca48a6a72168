use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn prints_version() {
    Command::cargo_bin("cnc-catalog")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")))
        .stdout(predicate::str::contains("cnc-catalog"));
}

#[test]
fn prints_help() {
    Command::cargo_bin("cnc-catalog")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--data"))
        .stdout(predicate::str::contains("--version"));
}

#[test]
fn missing_dataset_exits_with_error() {
    let dir = tempfile::tempdir().unwrap();
    let log_file = dir.path().join("logs").join("cnc-catalog.log");
    Command::cargo_bin("cnc-catalog")
        .unwrap()
        .env("HOME", dir.path())
        .env("XDG_CONFIG_HOME", dir.path().join("config"))
        .env("XDG_CACHE_HOME", dir.path().join("cache"))
        .arg("--data")
        .arg(dir.path().join("db.js"))
        .arg("--log-file")
        .arg(&log_file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("load catalog"));

    let log = std::fs::read_to_string(&log_file).unwrap();
    assert!(log.contains("catalog dataset not found"), "log was: {log}");
}
