use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn shows_version() {
    let mut cmd = Command::cargo_bin("bag2dataset").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
