//! Smoke tests to verify command wiring

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn recruitctl() -> Command {
    let mut cmd = Command::cargo_bin("recruitctl").unwrap();
    // Keep the developer's environment out of the tests
    cmd.env_remove("DATABASE_URL")
        .env_remove("DISCORD_BOT_TOKEN")
        .env_remove("RECRUITCTL_CONFIG");
    cmd
}

// === Help Tests ===

#[test]
fn test_serve_help() {
    recruitctl()
        .arg("serve")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Address to bind to"));
}

#[test]
fn test_worker_help() {
    recruitctl()
        .arg("worker")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Process pending jobs, then exit"));
}

#[test]
fn test_bot_help() {
    recruitctl()
        .arg("bot")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Guild to watch"));
}

#[test]
fn test_completions_bash() {
    recruitctl()
        .arg("completions")
        .arg("bash")
        .assert()
        .success()
        .stdout(predicate::str::contains("recruitctl"));
}

// === Import Command Tests ===

#[test]
fn test_import_coaches_summary() {
    let dir = TempDir::new().unwrap();
    let sheet = dir.path().join("coaches.csv");
    fs::write(
        &sheet,
        "Name,Email,Title,School\n\
         Jordan Lee,JLee@State.edu,Head Coach - Sprints,State University\n\
         ,nobody@state.edu,Volunteer,State University\n",
    )
    .unwrap();

    recruitctl()
        .arg("import")
        .arg("coaches")
        .arg(&sheet)
        .arg("--summary")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"totalRows\": 2"))
        .stdout(predicate::str::contains("\"validRows\": 1"))
        .stdout(predicate::str::contains("\"row\": 2"));
}

#[test]
fn test_import_fail_on_errors() {
    let dir = TempDir::new().unwrap();
    let sheet = dir.path().join("coaches.csv");
    fs::write(&sheet, "Name,Email\n,nobody@state.edu\n").unwrap();

    recruitctl()
        .args(["import", "coaches"])
        .arg(&sheet)
        .arg("--fail-on-errors")
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 row(s) rejected"));
}

#[test]
fn test_import_athletes_full_report() {
    let dir = TempDir::new().unwrap();
    let sheet = dir.path().join("athletes.csv");
    fs::write(
        &sheet,
        "Name,Email,Grad Year\nMaya Fields,maya@example.com,2026\n",
    )
    .unwrap();

    recruitctl()
        .args(["import", "athletes"])
        .arg(&sheet)
        .assert()
        .success()
        .stdout(predicate::str::contains("Maya Fields"))
        .stdout(predicate::str::contains("\"graduation_year\": 2026"));
}

#[test]
fn test_import_missing_name_column() {
    let dir = TempDir::new().unwrap();
    let sheet = dir.path().join("bad.csv");
    fs::write(&sheet, "Email,Phone\na@b.com,555\n").unwrap();

    recruitctl()
        .args(["import", "coaches"])
        .arg(&sheet)
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing required column 'name'"));
}

#[test]
fn test_import_missing_file() {
    recruitctl()
        .args(["import", "athletes", "/nonexistent/athletes.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open"));
}

// === Config Command Tests ===

#[test]
fn test_config_init_and_show() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");

    recruitctl()
        .arg("--config")
        .arg(&path)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config"));
    assert!(path.exists());

    // A second init refuses to overwrite
    recruitctl()
        .arg("--config")
        .arg(&path)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    recruitctl()
        .arg("--config")
        .arg(&path)
        .args(["config", "show"])
        .env("DISCORD_BOT_TOKEN", "super-secret")
        .assert()
        .success()
        .stdout(predicate::str::contains("127.0.0.1:3030"))
        .stdout(predicate::str::contains("super-secret").not());
}

#[test]
fn test_config_path_override() {
    recruitctl()
        .args(["config", "path", "--config", "/tmp/custom-recruitctl.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/tmp/custom-recruitctl.toml"));
}

#[test]
fn test_serve_without_database_url() {
    let dir = TempDir::new().unwrap();
    recruitctl()
        .arg("--config")
        .arg(dir.path().join("missing.toml"))
        .current_dir(dir.path())
        .arg("serve")
        .assert()
        .failure()
        .stderr(predicate::str::contains("DATABASE_URL not set"));
}
