use assert_cmd::Command;
use predicates::prelude::*;
use settingskit::config::StoreConfig;
use std::path::Path;
use tempfile::tempdir;

fn settingskit(config_dir: &Path, store: &str) -> Command {
    let mut cmd = Command::cargo_bin("settingskit").unwrap();
    cmd.arg("--config").arg(config_dir).arg("--store").arg(store);
    cmd
}

#[test]
fn test_set_get_and_list_file_store() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("settings.json");
    let store = store.to_str().unwrap();

    settingskit(dir.path(), store)
        .args(["set", "View.IndentSize", "4", "--type", "int"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Set"));
    settingskit(dir.path(), store)
        .args(["set", "Culture", "en-US"])
        .assert()
        .success();

    settingskit(dir.path(), store)
        .args(["get", "View.IndentSize"])
        .assert()
        .success()
        .stdout(predicate::str::contains("4").and(predicate::str::contains("int")));
    settingskit(dir.path(), store)
        .arg("keys")
        .assert()
        .success()
        .stdout(predicate::str::contains("Culture").and(predicate::str::contains("View.IndentSize")));
}

#[test]
fn test_missing_key_fails() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("settings.json");

    settingskit(dir.path(), store.to_str().unwrap())
        .args(["get", "Nope"])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("Error:"));
}

#[test]
fn test_rename_and_remove_matching() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("settings.json");
    let store = store.to_str().unwrap();

    settingskit(dir.path(), store)
        .args(["set", "Plugins.A.Files", "a.txt,b.txt", "-t", "string-array"])
        .assert()
        .success();
    settingskit(dir.path(), store)
        .args(["rename", "Plugins.A.Files", "Plugins.B.Files"])
        .assert()
        .success();
    settingskit(dir.path(), store)
        .args(["get", "Plugins.B.Files"])
        .assert()
        .success()
        .stdout(predicate::str::contains("a.txt,b.txt"));

    settingskit(dir.path(), store)
        .args(["remove-matching", r"^Plugins\."])
        .assert()
        .success();
    settingskit(dir.path(), store)
        .arg("keys")
        .assert()
        .success()
        .stdout(predicate::str::contains("No settings."));
}

#[test]
fn test_read_only_rejects_set() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("settings.json");

    settingskit(dir.path(), store.to_str().unwrap())
        .args(["--read-only", "set", "A", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("read-only"));
}

#[test]
fn test_registry_store_from_config() {
    let dir = tempdir().unwrap();
    let config = StoreConfig {
        registry_root: Some(dir.path().join("registry")),
        default_location: Some(r"HKCU\Software\Demo".to_string()),
        ..StoreConfig::default()
    };
    config.save(dir.path()).unwrap();

    let mut cmd = Command::cargo_bin("settingskit").unwrap();
    cmd.arg("--config")
        .arg(dir.path())
        .args(["set", "IsSoundEnabled", "false", "--type", "bool"])
        .assert()
        .success();

    let mut cmd = Command::cargo_bin("settingskit").unwrap();
    cmd.arg("--config")
        .arg(dir.path())
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains(r"HKEY_CURRENT_USER\Software\Demo"));

    let mut cmd = Command::cargo_bin("settingskit").unwrap();
    cmd.arg("--config")
        .arg(dir.path())
        .args(["get", "IsSoundEnabled"])
        .assert()
        .success()
        // booleans come back from a registry hive as DWord integers
        .stdout(predicate::str::contains("(int)"));
}

#[test]
fn test_no_location_fails() {
    let dir = tempdir().unwrap();

    let mut cmd = Command::cargo_bin("settingskit").unwrap();
    cmd.arg("--config")
        .arg(dir.path())
        .arg("keys")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--store"));
}
