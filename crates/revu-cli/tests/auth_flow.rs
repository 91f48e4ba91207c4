//! Sign-out and deferred sign-in surfaces.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn test_logout_without_session_succeeds() {
    let home = tempdir().unwrap();

    cargo_bin_cmd!("revu")
        .env("REVU_HOME", home.path())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Signed out."));
}

/// A pasted callback with no pending redirect flow is a normal no-op.
#[test]
fn test_login_paste_without_pending_is_noop() {
    let home = tempdir().unwrap();

    cargo_bin_cmd!("revu")
        .env("REVU_HOME", home.path())
        .args([
            "login",
            "--paste",
            "http://localhost:50000/callback?code=abc&state=xyz",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("No redirect sign-in was pending."));
}
