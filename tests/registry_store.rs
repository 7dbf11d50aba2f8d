mod common;

use common::*;
use settingskit::store::hive::{Hive, RegistryValue};
use settingskit::{
    bind, Registry, RegistryStore, RegistryStoreOptions, SettingsError, SettingsStore,
    SettingsStoreExt,
};
use std::sync::Arc;
use tempfile::tempdir;

const BASE: &str = r"Software\Vendor\Demo";

fn open(registry: &Registry) -> Arc<dyn SettingsStore> {
    Arc::new(RegistryStore::open(registry, false, BASE, RegistryStoreOptions::default()).unwrap())
}

fn fresh() -> Arc<dyn SettingsStore> {
    open(&Registry::in_memory())
}

#[test]
fn test_empty_store_falls_back() {
    empty_store_falls_back(&fresh());
}

#[test]
fn test_set_and_get_every_type() {
    set_and_get_every_type(&fresh());
}

#[test]
fn test_nan_survives() {
    nan_survives(&fresh());
}

#[test]
fn test_mismatched_type_falls_back() {
    mismatched_type_falls_back(&fresh());
}

#[test]
fn test_set_none_removes() {
    set_none_removes(&fresh());
}

#[test]
fn test_rename_moves_value() {
    rename_moves_value(&fresh());
}

#[test]
fn test_rename_changing_only_case() {
    rename_changing_only_case(&fresh());
}

#[test]
fn test_rename_into_and_out_of_own_path() {
    rename_into_and_out_of_own_path(&fresh());
}

#[test]
fn test_collections_keep_unreadable_values() {
    collections_keep_unreadable_values(&fresh());
}

#[test]
fn test_notifies_on_change() {
    notifies_on_change(&fresh());
}

#[test]
fn test_remove_pattern() {
    remove_pattern(&fresh());
}

#[test]
fn test_disposed_store_fails() {
    disposed_store_fails(&fresh());
}

#[test]
fn test_adapter_defaults() {
    adapter_defaults(&fresh());
}

#[test]
fn test_adapter_writes_through() {
    adapter_writes_through(&fresh());
}

#[test]
fn test_adapter_notifies_relative_keys() {
    adapter_notifies_relative_keys(&fresh());
}

#[test]
fn test_adapter_collections() {
    adapter_collections(&fresh());
}

#[test]
fn test_adapter_with_prefix() {
    adapter_with_prefix(&fresh());
}

#[test]
fn test_adapter_ignores_wrong_types() {
    adapter_ignores_wrong_types(&fresh());
}

#[test]
fn test_nested_keys_map_to_subkeys() {
    let registry = Registry::in_memory();
    let store = open(&registry);
    let settings: AppSettings = bind(store.clone(), "").unwrap();
    settings.view().main_window_state().set_left(12).unwrap();

    let hive = registry.hive(false);
    let path = format!(r"{}\View\MainWindowState", BASE);
    assert_eq!(
        hive.get_value(&path, "Left").unwrap(),
        Some(RegistryValue::QWord(12))
    );

    store.remove("View.MainWindowState.Left").unwrap();
    assert!(!hive.key_exists(&path).unwrap());
    assert!(!hive.key_exists(&format!(r"{}\View", BASE)).unwrap());
    assert!(hive.key_exists(BASE).unwrap());
}

#[test]
fn test_values_persist_in_directory_hives() {
    let dir = tempdir().unwrap();
    {
        let store = open(&Registry::at_directory(dir.path()).unwrap());
        let settings: AppSettings = bind(store.clone(), "").unwrap();
        settings.set_is_sound_enabled(false).unwrap();
        settings.test_map().insert("a", "1".to_string()).unwrap();
        store.dispose().unwrap();
    }

    let store = open(&Registry::at_directory(dir.path()).unwrap());
    let settings: AppSettings = bind(store.clone(), "").unwrap();
    assert!(!settings.is_sound_enabled());
    assert_eq!(settings.test_map().get("a").unwrap(), Some("1".to_string()));
    assert_eq!(
        store.keys().unwrap(),
        vec!["IsSoundEnabled".to_string(), "TestMap".to_string()]
    );
}

#[test]
fn test_global_scope_uses_machine_hive() {
    let registry = Registry::in_memory();
    let machine =
        RegistryStore::open(&registry, true, BASE, RegistryStoreOptions::default()).unwrap();
    machine.put("Shared", 1).unwrap();

    let user = open(&registry);
    assert!(!user.contains("Shared").unwrap());
    assert!(registry.hive(true).key_exists(BASE).unwrap());
}

#[test]
fn test_read_only_store_rejects_writes() {
    let registry = Registry::in_memory();
    open(&registry).put("A", 1).unwrap();

    let store = RegistryStore::open(&registry, false, BASE, RegistryStoreOptions { read_only: true })
        .unwrap();
    assert_eq!(store.get_int("A").unwrap(), 1);
    assert!(matches!(store.put("A", 2), Err(SettingsError::ReadOnly)));
    assert!(store.location().ends_with("[RO]"));
}
