//! # Settings Stores
//!
//! [`SettingsStore`] is the backend-agnostic contract: untyped [`Value`]s addressed by dotted
//! keys, plus a change stream. Two backends implement it:
//!
//! - [`file::FileStore`]: a JSON document kept in memory and written back by a background
//!   flusher after a quiet period.
//! - [`registry::RegistryStore`]: a registry-style [`hive::Hive`], written through immediately.
//!
//! Typed access lives in [`SettingsStoreExt`], which every store (including `dyn SettingsStore`)
//! gets for free. Its getters never fail because a value is missing or malformed; they fall back
//! and log a warning. They do fail once the store is disposed.

pub mod file;
pub mod hive;
pub mod notify;
pub mod registry;

use crate::codec::SettingValue;
use crate::error::{Result, SettingsError};
use crate::value::{SettingsMap, Value};
use chrono::{DateTime, TimeDelta, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use tracing::{debug, warn};

pub use notify::{ChangeListener, ChangeNotifier, SubscriptionId};

pub trait SettingsStore: Send + Sync {
    /// The raw value under `key`, `None` when unset.
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Writes `value` under `key`. `None` removes the key.
    fn set(&self, key: &str, value: Option<Value>) -> Result<()>;

    /// Removes `key`. Returns whether it was set.
    fn remove(&self, key: &str) -> Result<bool>;

    /// Moves the value of `old_key` to `new_key`. Returns `false` if `old_key` was unset.
    fn rename(&self, old_key: &str, new_key: &str) -> Result<bool>;

    /// Every set key, sorted with [`crate::keypath::compare_keys`].
    fn keys(&self) -> Result<Vec<String>>;

    fn subscribe(&self, listener: ChangeListener) -> SubscriptionId;

    fn unsubscribe(&self, id: SubscriptionId) -> bool;

    /// Releases the store. Pending writes are persisted first. Calling it again does nothing.
    fn dispose(&self) -> Result<()>;

    fn is_disposed(&self) -> bool;

    fn is_read_only(&self) -> bool;

    /// Human readable location, flagged with `[RO]` and `[ENC]` where applicable.
    fn location(&self) -> String;

    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// Rejects values no store can persist.
pub(crate) fn ensure_supported(value: &Value) -> Result<()> {
    if value.kind().is_supported() {
        Ok(())
    } else {
        Err(SettingsError::UnsupportedType(value.kind()))
    }
}

pub(crate) fn display_location(name: &str, read_only: bool, encrypted: bool) -> String {
    let mut display = name.to_string();
    if read_only {
        display.push_str(" [RO]");
    }
    if encrypted {
        display.push_str(" [ENC]");
    }
    display
}

pub trait SettingsStoreExt: SettingsStore {
    /// Reads `key` as `T`, returning `fallback` when it is unset or cannot be read as `T`.
    fn get_or<T: SettingValue>(&self, key: &str, fallback: T) -> Result<T> {
        let value = match self.get(key) {
            Ok(Some(value)) => value,
            Ok(None) => return Ok(fallback),
            Err(SettingsError::Disposed) => return Err(SettingsError::Disposed),
            Err(err) => {
                warn!(key, error = %err, "Failed to read setting, using fallback");
                return Ok(fallback);
            }
        };
        match T::from_value(&value) {
            Some(typed) => Ok(typed),
            None => {
                warn!(
                    key,
                    stored = %value.kind(),
                    expected = %T::KIND,
                    "Stored value cannot be read as the requested type, using fallback"
                );
                Ok(fallback)
            }
        }
    }

    fn get_typed<T: SettingValue>(&self, key: &str) -> Result<T> {
        self.get_or(key, T::type_default())
    }

    fn put<T: SettingValue>(&self, key: &str, value: T) -> Result<()> {
        self.set(key, Some(value.to_value()))
    }

    fn get_bool(&self, key: &str) -> Result<bool> {
        self.get_typed(key)
    }

    fn get_bool_or(&self, key: &str, fallback: bool) -> Result<bool> {
        self.get_or(key, fallback)
    }

    fn get_int(&self, key: &str) -> Result<i32> {
        self.get_typed(key)
    }

    fn get_int_or(&self, key: &str, fallback: i32) -> Result<i32> {
        self.get_or(key, fallback)
    }

    fn get_long(&self, key: &str) -> Result<i64> {
        self.get_typed(key)
    }

    fn get_long_or(&self, key: &str, fallback: i64) -> Result<i64> {
        self.get_or(key, fallback)
    }

    fn get_double(&self, key: &str) -> Result<f64> {
        self.get_typed(key)
    }

    fn get_double_or(&self, key: &str, fallback: f64) -> Result<f64> {
        self.get_or(key, fallback)
    }

    fn get_decimal(&self, key: &str) -> Result<Decimal> {
        self.get_typed(key)
    }

    fn get_decimal_or(&self, key: &str, fallback: Decimal) -> Result<Decimal> {
        self.get_or(key, fallback)
    }

    fn get_string(&self, key: &str) -> Result<String> {
        self.get_typed(key)
    }

    fn get_string_or(&self, key: &str, fallback: &str) -> Result<String> {
        self.get_or(key, fallback.to_string())
    }

    fn get_datetime(&self, key: &str) -> Result<DateTime<Utc>> {
        self.get_typed(key)
    }

    fn get_datetime_or(&self, key: &str, fallback: DateTime<Utc>) -> Result<DateTime<Utc>> {
        self.get_or(key, fallback)
    }

    fn get_duration(&self, key: &str) -> Result<TimeDelta> {
        self.get_typed(key)
    }

    fn get_duration_or(&self, key: &str, fallback: TimeDelta) -> Result<TimeDelta> {
        self.get_or(key, fallback)
    }

    fn get_map(&self, key: &str) -> Result<SettingsMap> {
        self.get_typed(key)
    }

    fn get_map_or(&self, key: &str, fallback: SettingsMap) -> Result<SettingsMap> {
        self.get_or(key, fallback)
    }

    fn get_string_array(&self, key: &str) -> Result<Vec<String>> {
        self.get_typed(key)
    }

    fn get_int_array(&self, key: &str) -> Result<Vec<i32>> {
        self.get_typed(key)
    }

    fn get_long_array(&self, key: &str) -> Result<Vec<i64>> {
        self.get_typed(key)
    }

    fn get_double_array(&self, key: &str) -> Result<Vec<f64>> {
        self.get_typed(key)
    }

    fn get_decimal_array(&self, key: &str) -> Result<Vec<Decimal>> {
        self.get_typed(key)
    }

    fn get_bool_array(&self, key: &str) -> Result<Vec<bool>> {
        self.get_typed(key)
    }

    fn get_datetime_array(&self, key: &str) -> Result<Vec<DateTime<Utc>>> {
        self.get_typed(key)
    }

    fn get_duration_array(&self, key: &str) -> Result<Vec<TimeDelta>> {
        self.get_typed(key)
    }

    /// Removes every key matching the regular expression `pattern` (unanchored).
    /// Returns whether anything was removed.
    fn remove_matching(&self, pattern: &str) -> Result<bool> {
        let regex = Regex::new(pattern)?;
        let mut removed = false;
        for key in self.keys()? {
            if regex.is_match(&key) && self.remove(&key)? {
                debug!(key = %key, pattern, "Removed matching setting");
                removed = true;
            }
        }
        Ok(removed)
    }
}

impl<S: SettingsStore + ?Sized> SettingsStoreExt for S {}
