// ABOUTME: Integration tests for the dropship CLI commands.
// ABOUTME: Validates help output, init, push validation, and one-shot deployment commands.

mod support;

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

fn dropship_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("dropship"));
    cmd.env_remove("RUST_LOG");
    cmd
}

fn write_config(dir: &Path) {
    fs::write(
        dir.join("dropship.yml"),
        format!(
            "integrity_key: k\nbase_update_path: {}\npush:\n  address: 127.0.0.1\n  port: 1\n",
            dir.display()
        ),
    )
    .unwrap();
}

#[test]
fn help_shows_commands() {
    dropship_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("push"))
        .stdout(predicate::str::contains("fullupdate"))
        .stdout(predicate::str::contains("migrate"))
        .stdout(predicate::str::contains("update-folder"));
}

#[test]
fn init_creates_config_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("dropship.yml");

    dropship_cmd()
        .current_dir(temp_dir.path())
        .args(["init", "--base-update-path", "/srv/shop"])
        .assert()
        .success();

    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("base_update_path: /srv/shop"));
    assert!(content.contains("integrity_key:"));
}

#[test]
fn init_refuses_to_overwrite_existing_config() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("dropship.yml");
    fs::write(&config_path, "existing: config").unwrap();

    dropship_cmd()
        .current_dir(temp_dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    assert_eq!(fs::read_to_string(&config_path).unwrap(), "existing: config");
}

#[test]
fn push_rejects_files_that_are_not_zips() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_config(temp_dir.path());
    fs::write(temp_dir.path().join("release.tar"), b"data").unwrap();

    dropship_cmd()
        .current_dir(temp_dir.path())
        .args(["push", "release.tar"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("only .zip packages"));
}

#[test]
fn push_without_config_fails() {
    let temp_dir = tempfile::tempdir().unwrap();

    dropship_cmd()
        .current_dir(temp_dir.path())
        .args(["push", "release.zip"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration file not found"));
}

#[test]
fn migrate_without_connection_string_reports_json_failure() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(temp_dir.path().join("Database")).unwrap();

    dropship_cmd()
        .current_dir(temp_dir.path())
        .args(["--json", "migrate", "--connection-string", ""])
        .assert()
        .failure()
        .stderr(predicate::str::contains(r#""event":"failure""#))
        .stderr(predicate::str::contains("Database connection string missing."));
}

#[test]
fn migrate_creates_and_updates_a_sqlite_database() {
    let temp_dir = tempfile::tempdir().unwrap();
    let scripts = temp_dir.path().join("sql");
    fs::create_dir_all(&scripts).unwrap();
    fs::write(scripts.join("databasebaseline.sql"), "CREATE TABLE t (id INTEGER);").unwrap();
    fs::write(scripts.join("databasedefaults.sql"), "INSERT INTO t VALUES (1);").unwrap();
    fs::write(scripts.join("1-more.sql"), "ALTER TABLE t ADD COLUMN name TEXT;").unwrap();
    let conn = format!("sqlite://{}?mode=rwc", temp_dir.path().join("app.db").display());

    dropship_cmd()
        .current_dir(temp_dir.path())
        .args(["migrate", "--scripts-dir", "sql", "--connection-string", &conn])
        .assert()
        .success()
        .stdout(predicate::str::contains("Database updated to version 1."));

    dropship_cmd()
        .current_dir(temp_dir.path())
        .args(["--quiet", "migrate", "--scripts-dir", "sql", "--connection-string", &conn])
        .assert()
        .success()
        .stdout(predicate::str::contains("Database is current at version 1."));
}

#[test]
fn fullupdate_outside_a_release_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_config(temp_dir.path());

    dropship_cmd()
        .current_dir(temp_dir.path())
        .arg("fullupdate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("AppInfo.json"));
}

#[test]
fn update_folder_rejects_unknown_folders() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_config(temp_dir.path());
    let release = temp_dir.path().join("Shop_2.0");
    support::write_release(
        &release,
        &support::manifest_json("2.0", "update.sh", &[support::RESOURCE_FOLDER]),
        &["Reports"],
    );

    dropship_cmd()
        .current_dir(&release)
        .args(["update-folder", "Nope", "--connection-string", "Server=db"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("The release has no folder named Nope."));

    assert!(!temp_dir.path().join(".dropship.lock").exists());
}
