//! # Registry Settings Store
//!
//! Maps dotted setting keys onto a [`Hive`] below a base key: `View.Colors.Background` becomes
//! the value `Background` in `<base>\View\Colors`. Every operation goes straight to the hive;
//! there is no cache and nothing to flush.
//!
//! The hive only knows a few native kinds, so values are mapped on the way in:
//!
//! | Setting | Hive value |
//! |---------|-----------|
//! | string | `String` |
//! | string array, map (flattened) | `MultiString` |
//! | integer, duration (ticks) | `QWord` |
//! | bool | `DWord` 0 / 1 |
//! | anything else | `String` in codec text |
//!
//! Reads hand back the native shape (`DWord`/`QWord` as `Int`, `MultiString` as `StringArray`)
//! and leave the rest to the typed getters.

use super::hive::{Hive, Registry, RegistryValue};
use super::{
    display_location, ensure_supported, ChangeListener, ChangeNotifier, SettingsStore,
    SubscriptionId,
};
use crate::codec::{duration_to_ticks, encode_flat_map, format_value};
use crate::error::{Result, SettingsError};
use crate::keypath::{
    check_registry_key, dotted_key, parent_registry_key, registry_location, sort_keys,
    REGISTRY_SEPARATOR,
};
use crate::value::Value;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct RegistryStoreOptions {
    pub read_only: bool,
}

struct RegistryState {
    disposed: bool,
}

pub struct RegistryStore {
    hive: Arc<dyn Hive>,
    is_global: bool,
    base_key: String,
    read_only: bool,
    state: Mutex<RegistryState>,
    notifier: ChangeNotifier,
}

fn encode(value: &Value) -> Result<RegistryValue> {
    ensure_supported(value)?;
    Ok(match value {
        Value::String(s) => RegistryValue::String(s.clone()),
        Value::StringArray(items) => RegistryValue::MultiString(items.clone()),
        Value::Int(i) => RegistryValue::QWord(*i as u64),
        Value::Bool(b) => RegistryValue::DWord(u32::from(*b)),
        Value::Duration(d) => RegistryValue::QWord(duration_to_ticks(*d) as u64),
        Value::Map(map) => RegistryValue::MultiString(encode_flat_map(map)),
        other => RegistryValue::String(format_value(other)),
    })
}

fn decode(value: RegistryValue) -> Value {
    match value {
        RegistryValue::String(s) => Value::String(s),
        RegistryValue::MultiString(items) => Value::StringArray(items),
        // a DWord written by another program is a signed 32-bit integer
        RegistryValue::DWord(d) => Value::Int(i64::from(d as i32)),
        RegistryValue::QWord(q) => Value::Int(q as i64),
        RegistryValue::Binary(bytes) => Value::Bytes(bytes),
    }
}

fn child_path(path: &str, child: &str) -> String {
    if path.is_empty() {
        child.to_string()
    } else {
        format!("{}{}{}", path, REGISTRY_SEPARATOR, child)
    }
}

impl RegistryStore {
    /// Opens the settings below `base_key` in the machine-wide hive when `is_global`, the
    /// per-user hive otherwise.
    pub fn open(
        registry: &Registry,
        is_global: bool,
        base_key: &str,
        options: RegistryStoreOptions,
    ) -> Result<Self> {
        let base_key = base_key.trim_matches(REGISTRY_SEPARATOR).to_string();
        if base_key.is_empty() {
            return Err(SettingsError::InvalidLocation(
                "registry base key must not be empty".to_string(),
            ));
        }
        let hive = registry.hive(is_global);
        info!(hive = hive.name(), base_key = %base_key, read_only = options.read_only, "Opened registry settings store");
        Ok(Self {
            hive,
            is_global,
            base_key,
            read_only: options.read_only,
            state: Mutex::new(RegistryState { disposed: false }),
            notifier: ChangeNotifier::new(),
        })
    }

    pub fn is_global(&self) -> bool {
        self.is_global
    }

    pub fn base_key(&self) -> &str {
        &self.base_key
    }

    fn lock_readable(&self) -> Result<MutexGuard<'_, RegistryState>> {
        let state = self.state.lock();
        if state.disposed {
            return Err(SettingsError::Disposed);
        }
        Ok(state)
    }

    fn lock_writable(&self) -> Result<MutexGuard<'_, RegistryState>> {
        let state = self.lock_readable()?;
        if self.read_only {
            return Err(SettingsError::ReadOnly);
        }
        Ok(state)
    }

    /// Deletes the value, then every key on the way up that is left empty. The base key and
    /// top-level keys are never deleted.
    fn remove_locked(&self, key: &str) -> Result<bool> {
        let (mut path, name) = registry_location(&self.base_key, key);
        if !self.hive.delete_value(&path, &name)? {
            return Ok(false);
        }

        loop {
            if !self.hive.value_names(&path)?.is_empty()
                || !self.hive.subkey_names(&path)?.is_empty()
            {
                break;
            }
            if path.eq_ignore_ascii_case(&self.base_key) {
                break;
            }
            let Some((parent, _)) = parent_registry_key(&path) else {
                break;
            };
            let parent = parent.to_string();
            self.hive.delete_key(&path)?;
            debug!(hive = self.hive.name(), key = %path, "Deleted empty registry key");
            path = parent;
        }
        Ok(true)
    }

    fn collect_keys(&self, path: &str, keys: &mut Vec<String>) -> Result<()> {
        for name in self.hive.value_names(path)? {
            if let Some(key) = dotted_key(&self.base_key, path, &name) {
                keys.push(key);
            }
        }
        for sub in self.hive.subkey_names(path)? {
            self.collect_keys(&child_path(path, &sub), keys)?;
        }
        Ok(())
    }
}

impl SettingsStore for RegistryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let _state = self.lock_readable()?;
        let (path, name) = registry_location(&self.base_key, key);
        Ok(self.hive.get_value(&path, &name)?.map(decode))
    }

    fn set(&self, key: &str, value: Option<Value>) -> Result<()> {
        let Some(value) = value else {
            self.remove(key)?;
            return Ok(());
        };
        {
            let _state = self.lock_writable()?;
            check_registry_key(key)?;
            let encoded = encode(&value)?;
            let (path, name) = registry_location(&self.base_key, key);
            self.hive.set_value(&path, &name, encoded)?;
            debug!(hive = self.hive.name(), key, "Wrote registry setting");
        }
        self.notifier.notify(key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let removed = {
            let _state = self.lock_writable()?;
            self.remove_locked(key)?
        };
        if removed {
            self.notifier.notify(key);
        }
        Ok(removed)
    }

    /// Copies the raw hive value, so the stored kind is kept exactly.
    ///
    /// Hive names are case-insensitive: a rename that only changes the case of the value name
    /// rewrites the value under the new name. Key path segments keep their stored case.
    fn rename(&self, old_key: &str, new_key: &str) -> Result<bool> {
        {
            let _state = self.lock_writable()?;
            let (old_path, old_name) = registry_location(&self.base_key, old_key);
            let Some(raw) = self.hive.get_value(&old_path, &old_name)? else {
                return Ok(false);
            };
            if old_key == new_key {
                return Ok(true);
            }
            check_registry_key(new_key)?;
            let (new_path, new_name) = registry_location(&self.base_key, new_key);
            if old_path.eq_ignore_ascii_case(&new_path) && old_name.eq_ignore_ascii_case(&new_name)
            {
                self.hive.delete_value(&old_path, &old_name)?;
                self.hive.set_value(&new_path, &new_name, raw)?;
            } else {
                self.hive.set_value(&new_path, &new_name, raw)?;
                self.remove_locked(old_key)?;
            }
        }
        self.notifier.notify_all([old_key, new_key]);
        Ok(true)
    }

    fn keys(&self) -> Result<Vec<String>> {
        let _state = self.lock_readable()?;
        let mut keys = Vec::new();
        if self.hive.key_exists(&self.base_key)? {
            self.collect_keys(&self.base_key, &mut keys)?;
        }
        sort_keys(&mut keys);
        Ok(keys)
    }

    fn subscribe(&self, listener: ChangeListener) -> SubscriptionId {
        self.notifier.subscribe(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    fn dispose(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            if state.disposed {
                return Ok(());
            }
            state.disposed = true;
        }
        self.notifier.clear();
        info!(hive = self.hive.name(), base_key = %self.base_key, "Disposed registry settings store");
        Ok(())
    }

    fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn location(&self) -> String {
        display_location(
            &child_path(self.hive.name(), &self.base_key),
            self.read_only,
            false,
        )
    }
}
