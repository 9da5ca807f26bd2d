#![allow(deprecated)]

mod common;

use assert_cmd::Command;
use common::TestProject;
use predicates::prelude::*;
use serde_json::json;

const PEERING: &str = "opentelekomcloud_vpc_peering_connection_v2";

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("stratus").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("delete"))
        .stdout(predicate::str::contains("lookup"))
        .stdout(predicate::str::contains("state"));
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("stratus").unwrap();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("stratus"));
}

#[test]
fn test_invalid_command() {
    let mut cmd = Command::cargo_bin("stratus").unwrap();
    cmd.arg("invalid-command").assert().failure();
}

#[test]
fn test_schema_lists_every_type() {
    let project = TestProject::new();
    project
        .command()
        .arg("schema")
        .assert()
        .success()
        .stdout(predicate::str::contains(PEERING))
        .stdout(predicate::str::contains("opentelekomcloud_vbs_backup_policy_v2"))
        .stdout(predicate::str::contains("opentelekomcloud_cts_tracker_v1"))
        .stdout(predicate::str::contains("opentelekomcloud_blockstorage_volume_v1"))
        .stdout(predicate::str::contains("opentelekomcloud_vbs_backup_v2"));
}

#[test]
fn test_schema_of_one_type() {
    let project = TestProject::new();
    project
        .command()
        .args(["schema", PEERING])
        .assert()
        .success()
        .stdout(predicate::str::contains("peer_vpc_id"))
        .stdout(predicate::str::contains("force-new"));

    project
        .command()
        .args(["schema", "opentelekomcloud_nothing_v1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown type"));
}

#[test]
fn test_validate_without_credentials() {
    let project = TestProject::new();
    let good = project.write_json(
        "good.json",
        &json!({"name": "peer", "vpc_id": "v1", "peer_vpc_id": "v2"}),
    );
    let bad = project.write_json(
        "bad.json",
        &json!({"name": "bad name!", "vpc_id": "v1"}),
    );

    project
        .command()
        .args(["validate", PEERING, "--file"])
        .arg(&good)
        .assert()
        .success()
        .stdout(predicate::str::contains("valid"));

    project
        .command()
        .args(["validate", PEERING, "--file"])
        .arg(&bad)
        .assert()
        .failure()
        .stderr(predicate::str::contains("name"))
        .stderr(predicate::str::contains("peer_vpc_id"));
}

#[test]
fn test_state_list_empty_project() {
    let project = TestProject::new();
    project
        .command()
        .args(["state", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No tracked resources"));
}

#[test]
fn test_create_requires_credentials() {
    let project = TestProject::new();
    let file = project.write_json(
        "peer.json",
        &json!({"name": "peer", "vpc_id": "v1", "peer_vpc_id": "v2"}),
    );

    project
        .command()
        .args(["create", PEERING, "peer", "--file"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("region"));
}

#[test]
fn test_read_untracked_resource_fails() {
    let project = TestProject::new();
    project.write_config("region: eu-de\nproject_id: proj\nauth_token: token\n");

    project
        .command()
        .args(["read", PEERING, "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not tracked"));
}
