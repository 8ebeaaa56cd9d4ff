use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::tempdir;

use packmind::core::{ChangeProposal, ChangeProposalId, ProposalChange, ScalarUpdate, SpaceId, UserId};
use packmind::test_utils::factories;
use packmind::test_utils::fixtures::PackmindFixture;

fn packmind(fixture: &PackmindFixture) -> Command {
    let mut cmd = Command::cargo_bin("packmind").unwrap();
    cmd.env("PACKMIND_ROOT", &fixture.root)
        .env("PACKMIND_CONFIG", fixture.root.join("config.toml"))
        .env_remove("RUST_LOG");
    cmd
}

fn robot_json(cmd: &mut Command, args: &[&str]) -> Value {
    let output = cmd.arg("--robot").args(args).output().unwrap();
    assert!(
        output.status.success(),
        "command {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

fn create_package(fixture: &PackmindFixture) -> String {
    let json = robot_json(
        &mut packmind(fixture),
        &[
            "package", "create", "--space", "space-1", "--name", "Backend", "--recipe", "recipe-1",
            "--standard", "standard-1",
        ],
    );
    json["data"]["id"].as_str().unwrap().to_string()
}

fn command_rename(id: &str, version: u32, old: &str) -> ChangeProposal {
    let mut proposal = ChangeProposal::pending(
        "recipe-1",
        version,
        SpaceId::from(factories::SPACE),
        UserId::from(factories::USER),
        ProposalChange::UpdateCommandName(ScalarUpdate {
            old_value: old.to_string(),
            new_value: format!("Renamed by {id}"),
        }),
    );
    proposal.id = ChangeProposalId::from(id);
    proposal
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("packmind").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"));
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("packmind").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_init_creates_root() {
    let dir = tempdir().unwrap();
    let root = dir.path().join(".packmind");
    let mut cmd = Command::cargo_bin("packmind").unwrap();
    let json = robot_json(&mut cmd, &["init", "--path", root.to_str().unwrap()]);

    assert_eq!(json["status"], "ok");
    assert_eq!(json["data"]["config_written"], true);
    assert!(root.join("config.toml").exists());
    assert!(root.join("catalog.json").exists());
    assert!(root.join("packmind.db").exists());
}

#[test]
fn test_config_show_reflects_project_config() {
    let fixture = PackmindFixture::new();
    let json = robot_json(&mut packmind(&fixture), &["config", "show"]);
    assert_eq!(json["data"]["config"]["workspace"]["organization_id"], "org-1");
    assert_eq!(json["data"]["exists"], true);
}

#[test]
fn test_create_and_publish_package() {
    let fixture = PackmindFixture::new();
    let package_id = create_package(&fixture);

    let json = robot_json(
        &mut packmind(&fixture),
        &["publish", "--package", &package_id, "--target", "t-root"],
    );
    assert_eq!(json["status"], "ok");
    assert_eq!(json["data"][0]["status"], "success");
    assert!(fixture.repo_file(".packmind/recipes/my-command.md").is_some());

    let json = robot_json(&mut packmind(&fixture), &["deployments", "list"]);
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    packmind(&fixture)
        .args(["publish", "--package", &package_id, "--target", "t-root"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no_changes"));
}

#[test]
fn test_robot_errors_carry_stable_codes() {
    let fixture = PackmindFixture::new();
    let output = packmind(&fixture)
        .args(["--robot", "publish", "--package", "missing", "--target", "t-root"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let json: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["status"]["error"]["code"], "not_found");

    packmind(&fixture)
        .args(["publish", "--package", "missing", "--target", "t-root"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Package with id missing not found"));
}

#[test]
fn test_artefact_delete_cleans_packages() {
    let fixture = PackmindFixture::new();
    create_package(&fixture);

    robot_json(
        &mut packmind(&fixture),
        &["artefact", "delete", "--kind", "command", "--id", "recipe-1"],
    );

    let json = robot_json(&mut packmind(&fixture), &["package", "list", "--space", "space-1"]);
    let package = &json["data"][0];
    assert_eq!(package["recipes"].as_array().unwrap().len(), 0);
    assert_eq!(package["standards"].as_array().unwrap().len(), 1);

    let catalog = std::fs::read_to_string(fixture.catalog_path()).unwrap();
    assert!(!catalog.contains("\"recipe-1\""));
}

#[test]
fn test_outdated_and_review() {
    let fixture = PackmindFixture::new();
    let proposals = fixture.write_proposals(
        "proposals.json",
        &[
            command_rename("p1", 1, "My Command"),
            command_rename("p2", 1, "Old name"),
            command_rename("p3", 2, "Old name"),
        ],
    );
    let proposals = proposals.to_str().unwrap();

    let json = robot_json(
        &mut packmind(&fixture),
        &["outdated", "--kind", "command", "--artefact", "recipe-1", "--proposals", proposals],
    );
    assert_eq!(json["data"]["checked"], 3);
    assert_eq!(json["data"]["outdated"], serde_json::json!(["p2"]));

    let json = robot_json(&mut packmind(&fixture), &["conflicts", "--proposals", proposals]);
    assert_eq!(json["data"]["p1"].as_array().unwrap().len(), 2);

    let out = fixture.temp_dir.path().join("decisions.json");
    packmind(&fixture)
        .args([
            "review",
            "--proposals",
            proposals,
            "--accept",
            "p1",
            "--reject",
            "p2",
            "--out",
            out.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("p3 conflicts with an accepted proposal"));
    let decisions: Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(decisions["accepted"], serde_json::json!(["p1"]));
    assert_eq!(decisions["rejected"], serde_json::json!(["p2"]));

    packmind(&fixture)
        .args(["review", "--proposals", proposals, "--accept", "nope"])
        .assert()
        .failure();
}

#[test]
fn test_outdated_skill_requires_current_files() {
    let fixture = PackmindFixture::new();
    let proposals = fixture.write_proposals("proposals.json", &[]);
    let output = packmind(&fixture)
        .args([
            "--robot",
            "outdated",
            "--kind",
            "skill",
            "--artefact",
            "skill-1",
            "--proposals",
            proposals.to_str().unwrap(),
        ])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let json: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["status"]["error"]["code"], "validation");

    let items = fixture.temp_dir.path().join("files.json");
    std::fs::write(&items, "[]").unwrap();
    let json = robot_json(
        &mut packmind(&fixture),
        &[
            "outdated",
            "--kind",
            "skill",
            "--artefact",
            "skill-1",
            "--proposals",
            proposals.to_str().unwrap(),
            "--items",
            items.to_str().unwrap(),
        ],
    );
    assert_eq!(json["data"]["checked"], 0);
}

#[test]
fn test_install_and_uninstall_manifest() {
    let fixture = PackmindFixture::new();
    create_package(&fixture);
    let consumer = fixture.temp_dir.path().join("consumer");
    let consumer_arg = consumer.to_str().unwrap();

    packmind(&fixture)
        .args(["package", "install", "backend", "--dir", consumer_arg, "--space", "space-1"])
        .assert()
        .success();
    let manifest = read_manifest(&consumer);
    assert_eq!(manifest["packages"]["backend"], "*");

    packmind(&fixture)
        .args(["package", "install", "ghost", "--dir", consumer_arg, "--space", "space-1"])
        .assert()
        .failure();

    packmind(&fixture)
        .args(["package", "uninstall", "backend", "--dir", consumer_arg])
        .assert()
        .success();
    let manifest = read_manifest(&consumer);
    assert!(manifest["packages"].as_object().unwrap().is_empty());
}

fn read_manifest(dir: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(dir.join("packmind.json")).unwrap()).unwrap()
}
