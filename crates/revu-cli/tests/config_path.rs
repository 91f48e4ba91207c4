use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn test_config_path_respects_revu_home() {
    let home = tempdir().unwrap();

    cargo_bin_cmd!("revu")
        .env("REVU_HOME", home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(home.path().to_str().unwrap()))
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_init_creates_file_once() {
    let home = tempdir().unwrap();

    cargo_bin_cmd!("revu")
        .env("REVU_HOME", home.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));

    assert!(home.path().join("config.toml").exists());

    // No silent overwrite.
    cargo_bin_cmd!("revu")
        .env("REVU_HOME", home.path())
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}
