//! CLI Integration Tests
//!
//! Tests the command-line interface end-to-end.

use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;

/// Get the binary to test.
fn cacao_caldera() -> Command {
    let mut cmd = Command::cargo_bin("cacao-caldera").unwrap();
    // Keep the user's config out of the way.
    cmd.env("XDG_CONFIG_HOME", std::env::temp_dir().join("cacao-caldera-cli-tests"));
    cmd
}

const SIMPLE: &str = r#"{
    "id": "playbook--simple",
    "name": "Simple",
    "workflow_start": "s",
    "workflow": {
        "s": { "type": "start", "on_completion": "a" },
        "a": {
            "type": "single",
            "name": "Echo",
            "commands": [ { "type": "bash", "command": "echo hi" } ],
            "on_completion": "e"
        },
        "e": { "type": "end" }
    }
}"#;

const BRANCHING: &str = r#"{
    "id": "playbook--branching",
    "name": "Branching",
    "workflow_start": "s",
    "workflow": {
        "s": { "type": "start", "on_completion": "if" },
        "if": {
            "type": "if-condition",
            "condition": "x",
            "on_true": ["t"],
            "on_false": ["f"],
            "on_completion": "e"
        },
        "t": { "type": "single", "name": "True", "commands": [ { "type": "bash", "command": "true" } ] },
        "f": { "type": "single", "name": "False", "commands": [ { "type": "bash", "command": "false" } ] },
        "e": { "type": "end" }
    }
}"#;

const EMBEDDING: &str = r#"{
    "id": "playbook--embedding",
    "name": "Embedding",
    "workflow_start": "s",
    "workflow": {
        "s": { "type": "start", "on_completion": "p" },
        "p": { "type": "playbook", "playbook_id": "not-there", "on_completion": "e" },
        "e": { "type": "end" }
    }
}"#;

// ============================================================================
// Help & Version Tests
// ============================================================================

#[test]
fn test_help_flag() {
    cacao_caldera()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Caldera"));
}

#[test]
fn test_version_flag() {
    cacao_caldera()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_no_subcommand_fails() {
    cacao_caldera().assert().failure();
}

// ============================================================================
// Convert Command Tests
// ============================================================================

#[test]
fn test_convert_help() {
    cacao_caldera()
        .args(["convert", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn test_convert_writes_artifacts() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("simple.json").write_str(SIMPLE).unwrap();
    let out = temp.child("out");

    cacao_caldera()
        .current_dir(temp.path())
        .args(["convert", "simple.json", "--output-dir"])
        .arg(out.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("simple.json"))
        .stdout(predicate::str::contains("3 abilities"));

    out.child("data/abilities/Start").assert(predicate::path::is_dir());
    out.child("data/abilities/End").assert(predicate::path::is_dir());
    out.child("data/abilities/Miscellaneous").assert(predicate::path::is_dir());
    out.child("data/adversaries").assert(predicate::path::is_dir());
    out.child("data/sources").assert(predicate::path::is_dir());
    out.child("playbooks/playbook--simple.json")
        .assert(predicate::str::contains("\"workflow_start\": \"s\""));
}

#[test]
fn test_convert_directory() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("in/simple.json").write_str(SIMPLE).unwrap();
    temp.child("in/branching.json").write_str(BRANCHING).unwrap();
    temp.child("in/notes.txt").write_str("not a playbook").unwrap();

    cacao_caldera()
        .current_dir(temp.path())
        .args(["convert", "in", "--output-dir", "out", "--jobs", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("simple.json"))
        .stdout(predicate::str::contains("branching.json"))
        .stdout(predicate::str::contains("notes.txt").not());

    temp.child("out/playbooks/playbook--simple.json").assert(predicate::path::exists());
    temp.child("out/playbooks/playbook--branching.json").assert(predicate::path::exists());
}

#[test]
fn test_convert_dry_run_writes_nothing() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("simple.json").write_str(SIMPLE).unwrap();

    cacao_caldera()
        .current_dir(temp.path())
        .args(["convert", "simple.json", "--output-dir", "out", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("DRY RUN"));

    temp.child("out").assert(predicate::path::missing());
}

#[test]
fn test_convert_no_manifest() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("simple.json").write_str(SIMPLE).unwrap();

    cacao_caldera()
        .current_dir(temp.path())
        .args(["convert", "simple.json", "--output-dir", "out", "--no-manifest"])
        .assert()
        .success();

    temp.child("out/data/adversaries").assert(predicate::path::is_dir());
    temp.child("out/playbooks").assert(predicate::path::missing());
}

#[test]
fn test_convert_failure_does_not_stop_batch() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("in/simple.json").write_str(SIMPLE).unwrap();
    temp.child("in/embedding.json").write_str(EMBEDDING).unwrap();

    cacao_caldera()
        .current_dir(temp.path())
        .args(["convert", "in", "--output-dir", "out"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not-there"))
        .stderr(predicate::str::contains("1 of 2 playbooks failed"))
        .stderr(predicate::function(|err: &str| err.matches("embedding.json").count() == 1));

    temp.child("out/playbooks/playbook--simple.json").assert(predicate::path::exists());
}

#[test]
fn test_convert_resolves_sub_playbooks() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("in/embedding.json").write_str(EMBEDDING).unwrap();
    temp.child("library/not-there.json").write_str(SIMPLE).unwrap();

    cacao_caldera()
        .current_dir(temp.path())
        .args(["convert", "in", "--output-dir", "out", "--playbooks-dir", "library"])
        .assert()
        .success()
        .stdout(predicate::str::contains("5 abilities"));

    temp.child("out/playbooks/playbook--simple.json").assert(predicate::path::exists());
}

#[test]
fn test_convert_no_playbooks_found() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("empty").create_dir_all().unwrap();

    cacao_caldera()
        .current_dir(temp.path())
        .args(["convert", "empty"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No playbooks found"));
}

// ============================================================================
// Inspect Command Tests
// ============================================================================

#[test]
fn test_inspect_shows_dispatch_order() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("branching.json").write_str(BRANCHING).unwrap();

    cacao_caldera()
        .current_dir(temp.path())
        .args(["inspect", "branching.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Playbook: Branching (playbook--branching)"))
        .stdout(predicate::str::is_match(r"(?s)1\. s .*2\. if .*3\. t .*4\. f .*5\. e ").unwrap())
        .stdout(predicate::str::contains("[if-condition]"))
        .stdout(predicate::str::contains("Abilities: 4"));

    temp.child("data").assert(predicate::path::missing());
}

#[test]
fn test_inspect_missing_file() {
    cacao_caldera()
        .args(["inspect", "/nonexistent/playbook.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

// ============================================================================
// Config Command Tests
// ============================================================================

#[test]
fn test_config_shows_defaults() {
    let temp = assert_fs::TempDir::new().unwrap();

    cacao_caldera()
        .current_dir(temp.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("[caldera]"))
        .stdout(predicate::str::contains("default_timeout = 60"));
}

#[test]
fn test_config_reads_local_file() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child(".cacao-caldera.toml").write_str("[caldera]\ndefault_timeout = 15\n").unwrap();

    cacao_caldera()
        .current_dir(temp.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("default_timeout = 15"));
}

#[test]
fn test_config_flag_overrides_lookup() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("custom.toml").write_str("[playbooks]\ndir = \"library\"\n").unwrap();

    cacao_caldera()
        .current_dir(temp.path())
        .args(["--config", "custom.toml", "config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dir = \"library\""));
}

#[test]
fn test_config_path() {
    cacao_caldera()
        .args(["config", "--path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cacao-caldera"));
}

// ============================================================================
// Completions Tests
// ============================================================================

#[test]
fn test_completions_bash() {
    cacao_caldera()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cacao-caldera"));
}
