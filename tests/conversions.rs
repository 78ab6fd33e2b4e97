// ABOUTME: Integration tests for command conversions declared in configuration.
// ABOUTME: Runs real scripts around a migration and checks the environment they receive.

#![cfg(unix)]

mod support;

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;

use dropship::config::Config;
use dropship::migrate::{MigrateError, SchemaMigrator, ScriptRegistry};
use support::MemoryDatabase;
use tempfile::TempDir;

fn create_script(dir: &TempDir, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();

    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

fn config_with(program: &Path, phase: &str) -> Config {
    Config::from_yaml(&format!(
        r#"
integrity_key: k
base_update_path: /srv
migrations:
  conversions:
    - name: record-env
      version: 2
      phase: {phase}
      program: {}
"#,
        program.display()
    ))
    .unwrap()
}

fn migrator(config: &Config, db: &MemoryDatabase) -> SchemaMigrator {
    let scripts = ScriptRegistry::from_embedded(&[
        ("1-a.sql", "SELECT 1;"),
        ("2-b.sql", "SELECT 2;"),
    ])
    .unwrap();
    SchemaMigrator::new(
        Arc::new(scripts),
        Arc::new(config.conversions()),
        Arc::new(db.clone()),
    )
}

#[tokio::test]
async fn conversion_receives_script_details_in_its_environment() {
    support::init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("env.txt");
    let script = create_script(
        &dir,
        "record.sh",
        &format!(
            "echo \"$DROPSHIP_SCRIPT|$DROPSHIP_SCRIPT_VERSION|$DROPSHIP_PHASE|$DROPSHIP_CONNECTION_STRING\" > {}",
            out.display()
        ),
    );
    let db = MemoryDatabase::at_version(1.0);

    let outcome = migrator(&config_with(&script, "after"), &db)
        .run("Server=db")
        .await
        .unwrap();

    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(
        fs::read_to_string(&out).unwrap().trim(),
        "2-b.sql|2|after|Server=db"
    );
}

#[tokio::test]
async fn failing_before_conversion_keeps_the_script_from_running() {
    let dir = tempfile::tempdir().unwrap();
    let script = create_script(&dir, "fail.sh", "echo 'cannot convert' >&2\nexit 4");
    let db = MemoryDatabase::at_version(1.0);

    let err = migrator(&config_with(&script, "before"), &db)
        .run("Server=db")
        .await
        .unwrap_err();

    let MigrateError::Hook(hook) = err else {
        panic!("expected a hook error");
    };
    let message = hook.to_string();
    assert!(message.contains("record-env"), "{message}");
    assert!(message.contains("cannot convert"), "{message}");
    assert!(db.batches().is_empty());
}
