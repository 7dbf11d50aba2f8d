//! Store location strings.
//!
//! | Form | Store |
//! |------|-------|
//! | `file:<path>` or a bare path | [`FileStore`] at that path |
//! | `registry:<hive>\<base key>` | [`RegistryStore`] below the base key |
//! | `HKEY_CURRENT_USER\<base key>` (also `HKCU`) | per-user registry store |
//! | `HKEY_LOCAL_MACHINE\<base key>` (also `HKLM`) | machine-wide registry store |
//!
//! Registry stores are backed by [`Registry::at_directory`] below the configured registry root.

use crate::config::StoreConfig;
use crate::error::{Result, SettingsError};
use crate::keypath::REGISTRY_SEPARATOR;
use crate::paths::default_registry_root;
use crate::store::file::FileStore;
use crate::store::hive::{Registry, CURRENT_USER, LOCAL_MACHINE};
use crate::store::registry::{RegistryStore, RegistryStoreOptions};
use crate::store::SettingsStore;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

const FILE_SCHEME: &str = "file:";
const REGISTRY_SCHEME: &str = "registry:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    File(PathBuf),
    Registry { is_global: bool, base_key: String },
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &text[prefix.len()..])
}

fn hive_scope(name: &str) -> Option<bool> {
    if name.eq_ignore_ascii_case(CURRENT_USER) || name.eq_ignore_ascii_case("HKCU") {
        Some(false)
    } else if name.eq_ignore_ascii_case(LOCAL_MACHINE) || name.eq_ignore_ascii_case("HKLM") {
        Some(true)
    } else {
        None
    }
}

fn parse_registry(text: &str) -> Result<StoreLocation> {
    let (hive, base_key) = text.split_once(REGISTRY_SEPARATOR).unwrap_or((text, ""));
    let is_global = hive_scope(hive).ok_or_else(|| {
        SettingsError::InvalidLocation(format!("unknown registry hive '{}'", hive))
    })?;
    let base_key = base_key.trim_matches(REGISTRY_SEPARATOR);
    if base_key.is_empty() {
        return Err(SettingsError::InvalidLocation(format!(
            "missing base key in '{}'",
            text
        )));
    }
    Ok(StoreLocation::Registry {
        is_global,
        base_key: base_key.to_string(),
    })
}

impl StoreLocation {
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SettingsError::InvalidLocation(
                "empty store location".to_string(),
            ));
        }

        if let Some(path) = strip_prefix_ignore_case(text, FILE_SCHEME) {
            if path.is_empty() {
                return Err(SettingsError::InvalidLocation(
                    "missing file path".to_string(),
                ));
            }
            return Ok(StoreLocation::File(PathBuf::from(path)));
        }
        if let Some(rest) = strip_prefix_ignore_case(text, REGISTRY_SCHEME) {
            return parse_registry(rest);
        }

        let first = text.split(REGISTRY_SEPARATOR).next().unwrap_or_default();
        if hive_scope(first).is_some() {
            return parse_registry(text);
        }
        Ok(StoreLocation::File(PathBuf::from(text)))
    }
}

impl fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreLocation::File(path) => write!(f, "{}{}", FILE_SCHEME, path.display()),
            StoreLocation::Registry {
                is_global,
                base_key,
            } => {
                let hive = if *is_global { LOCAL_MACHINE } else { CURRENT_USER };
                write!(f, "{}{}{}", hive, REGISTRY_SEPARATOR, base_key)
            }
        }
    }
}

/// Opens the store a location names.
pub fn open_store(
    location: &StoreLocation,
    config: &StoreConfig,
    read_only: bool,
) -> Result<Arc<dyn SettingsStore>> {
    match location {
        StoreLocation::File(path) => Ok(Arc::new(FileStore::open(
            path.clone(),
            config.file_options(read_only),
        )?)),
        StoreLocation::Registry {
            is_global,
            base_key,
        } => {
            let root = match &config.registry_root {
                Some(root) => root.clone(),
                None => default_registry_root()?,
            };
            let registry = Registry::at_directory(&root)?;
            Ok(Arc::new(RegistryStore::open(
                &registry,
                *is_global,
                base_key,
                RegistryStoreOptions { read_only },
            )?))
        }
    }
}
