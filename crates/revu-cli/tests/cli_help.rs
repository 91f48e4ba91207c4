use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_shows_all_commands() {
    cargo_bin_cmd!("revu")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("post"))
        .stdout(predicate::str::contains("wall"))
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("logout"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_post_help_shows_captcha_token() {
    cargo_bin_cmd!("revu")
        .args(["post", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("captcha-token"))
        .stdout(predicate::str::contains("--text"));
}

#[test]
fn test_config_help_shows_subcommands() {
    cargo_bin_cmd!("revu")
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("path"))
        .stdout(predicate::str::contains("init"));
}

#[test]
fn test_login_help_shows_paste() {
    cargo_bin_cmd!("revu")
        .args(["login", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("paste"));
}

#[test]
fn test_version_flag() {
    cargo_bin_cmd!("revu")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1"));
}
