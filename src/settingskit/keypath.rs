//! Dotted setting keys and their registry locations.
//!
//! A key like `"View.Colors.Background"` addresses the value `Background` under the registry key
//! `<base>\View\Colors`. File stores use the dotted key as-is.

use crate::error::{Result, SettingsError};
use std::cmp::Ordering;

pub const KEY_SEPARATOR: char = '.';
pub const REGISTRY_SEPARATOR: char = '\\';

/// Splits `"A.B.C"` into `("A.B", "C")`. A key without a dot has an empty parent.
pub fn split_key(key: &str) -> (&str, &str) {
    key.rsplit_once(KEY_SEPARATOR).unwrap_or(("", key))
}

/// `prefix.name`, or just `name` when the prefix is empty.
pub fn join_key(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}{}{}", prefix, KEY_SEPARATOR, name)
    }
}

/// The part of `key` below `prefix`, if `key` lies strictly inside it.
pub fn relative_key<'a>(prefix: &str, key: &'a str) -> Option<&'a str> {
    if prefix.is_empty() {
        return Some(key);
    }
    key.strip_prefix(prefix)?.strip_prefix(KEY_SEPARATOR)
}

/// Maps a dotted key to `(registry key path, value name)` below `base`.
pub fn registry_location(base: &str, key: &str) -> (String, String) {
    let (parent, value_name) = split_key(key);

    let mut path = base.trim_end_matches(REGISTRY_SEPARATOR).to_string();
    if !parent.is_empty() {
        for segment in parent.split(KEY_SEPARATOR) {
            if !path.is_empty() {
                path.push(REGISTRY_SEPARATOR);
            }
            path.push_str(segment);
        }
    }
    (path, value_name.to_string())
}

/// Checks that `key` maps to a registry location [`dotted_key`] can turn back into `key`:
/// no empty segments and no backslashes.
pub fn check_registry_key(key: &str) -> Result<()> {
    let reason = if key.contains(REGISTRY_SEPARATOR) {
        "registry keys cannot contain a backslash"
    } else if key.split(KEY_SEPARATOR).any(str::is_empty) {
        "empty key segment"
    } else {
        return Ok(());
    };
    Err(SettingsError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    })
}

/// Splits `A\B\C` into `("A\B", "C")`. A top-level path has no parent.
pub fn parent_registry_key(path: &str) -> Option<(&str, &str)> {
    path.rsplit_once(REGISTRY_SEPARATOR)
}

/// Rebuilds the dotted key for `value_name` found under the registry key `path`.
///
/// Returns `None` when `path` is not `base` or below it. Comparison is ASCII case-insensitive,
/// as registry key names are.
pub fn dotted_key(base: &str, path: &str, value_name: &str) -> Option<String> {
    let base = base.trim_end_matches(REGISTRY_SEPARATOR);
    let head = path.get(..base.len())?;
    if !head.eq_ignore_ascii_case(base) {
        return None;
    }
    let rest = &path[base.len()..];
    let rest = if base.is_empty() || rest.is_empty() {
        rest
    } else {
        rest.strip_prefix(REGISTRY_SEPARATOR)?
    };

    let mut key = rest.replace(REGISTRY_SEPARATOR, &KEY_SEPARATOR.to_string());
    if !key.is_empty() {
        key.push(KEY_SEPARATOR);
    }
    key.push_str(value_name);
    Some(key)
}

/// Orders keys case-insensitively, with an ordinal tiebreak so the order is total.
pub fn compare_keys(a: &str, b: &str) -> Ordering {
    a.to_ascii_lowercase()
        .cmp(&b.to_ascii_lowercase())
        .then_with(|| a.cmp(b))
}

pub fn sort_keys(keys: &mut [String]) {
    keys.sort_by(|a, b| compare_keys(a, b));
}
