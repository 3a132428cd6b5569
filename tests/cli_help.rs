use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn shows_help() {
    let mut cmd = Command::cargo_bin("bag2dataset").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("inspect"))
        .stdout(predicate::str::contains("convert"));
}

#[test]
fn convert_help_offers_no_progress() {
    let mut cmd = Command::cargo_bin("bag2dataset").unwrap();
    cmd.args(["convert", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--no-progress"))
        .stdout(predicate::str::contains("--verify-images"));
}
