use crate::error::Result;
use crate::store::file::FileStoreOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILENAME: &str = "config.json";
const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Configuration for opening stores, stored in `<config dir>/config.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    /// Quiet period before a file store writes pending changes
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Keep the previous settings file as `<name>.bak` on every write
    #[serde(default)]
    pub backup: bool,

    /// Flag file stores as encrypted (display only)
    #[serde(default)]
    pub encrypted: bool,

    /// Directory holding the registry hives; the per-user data directory when unset
    #[serde(default)]
    pub registry_root: Option<PathBuf>,

    /// Location used when no `--store` is given
    #[serde(default)]
    pub default_location: Option<String>,
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            backup: false,
            encrypted: false,
            registry_root: None,
            default_location: None,
        }
    }
}

impl StoreConfig {
    /// Reads `config.json` from `config_dir`. A missing file means all defaults.
    pub fn load(config_dir: impl AsRef<Path>) -> Result<Self> {
        let path = config_dir.as_ref().join(CONFIG_FILENAME);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    /// Writes `config.json` into `config_dir`, creating the directory when needed.
    pub fn save(&self, config_dir: impl AsRef<Path>) -> Result<()> {
        let config_dir = config_dir.as_ref();
        fs::create_dir_all(config_dir)?;
        fs::write(
            config_dir.join(CONFIG_FILENAME),
            serde_json::to_string_pretty(self)?,
        )?;
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn file_options(&self, read_only: bool) -> FileStoreOptions {
        FileStoreOptions {
            read_only,
            encrypted: self.encrypted,
            backup: self.backup,
            debounce: self.debounce(),
        }
    }
}
