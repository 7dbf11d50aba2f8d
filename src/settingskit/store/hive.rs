//! # Registry Hives
//!
//! A hive is a tree of keys addressed by backslash paths (`Software\Vendor\App`), each key
//! holding named values of a few native kinds. Key and value names compare ASCII
//! case-insensitively but keep the case they were created with.
//!
//! Two implementations:
//!
//! - [`MemoryHive`]: an in-process tree, used by tests and throwaway stores.
//! - [`DirectoryHive`]: one directory per key below a root directory. Each directory holds a
//!   `values.json` with the key's original name and its values. Directory names are the
//!   lowercased key names, so lookups stay case-insensitive on any file system. Writes go through
//!   a temporary file and a rename.
//!
//! [`Registry`] pairs a per-user hive with a machine-wide hive, mirroring the two scopes a
//! [`super::registry::RegistryStore`] can be opened in.

use crate::error::{Result, SettingsError};
use crate::keypath::REGISTRY_SEPARATOR;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

pub const CURRENT_USER: &str = "HKEY_CURRENT_USER";
pub const LOCAL_MACHINE: &str = "HKEY_LOCAL_MACHINE";

const VALUES_FILE: &str = "values.json";

/// A value as a registry hive stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum RegistryValue {
    String(String),
    MultiString(Vec<String>),
    DWord(u32),
    QWord(u64),
    Binary(Vec<u8>),
}

/// Storage for a tree of registry keys.
///
/// Paths are relative to the hive root; the empty path is the root itself. Reading a value or
/// listing names under a missing key yields nothing rather than an error.
pub trait Hive: Send + Sync {
    fn name(&self) -> &str;

    fn key_exists(&self, path: &str) -> Result<bool>;

    /// Creates the key and any missing ancestors.
    fn create_key(&self, path: &str) -> Result<()>;

    /// Deletes the key and everything below it. Returns whether it existed.
    fn delete_key(&self, path: &str) -> Result<bool>;

    fn get_value(&self, path: &str, name: &str) -> Result<Option<RegistryValue>>;

    /// Writes a value, creating the key if needed.
    fn set_value(&self, path: &str, name: &str, value: RegistryValue) -> Result<()>;

    fn delete_value(&self, path: &str, name: &str) -> Result<bool>;

    fn value_names(&self, path: &str) -> Result<Vec<String>>;

    fn subkey_names(&self, path: &str) -> Result<Vec<String>>;
}

fn segments(path: &str) -> Vec<&str> {
    path.split(REGISTRY_SEPARATOR)
        .filter(|s| !s.is_empty())
        .collect()
}

fn fold(name: &str) -> String {
    name.to_ascii_lowercase()
}

fn root_not_deletable() -> SettingsError {
    SettingsError::Store("the hive root cannot be deleted".to_string())
}

// --- In-memory hive ---

#[derive(Debug, Default)]
struct Node {
    name: String,
    values: BTreeMap<String, (String, RegistryValue)>,
    subkeys: BTreeMap<String, Node>,
}

impl Node {
    fn find(&self, path: &[&str]) -> Option<&Node> {
        match path.split_first() {
            None => Some(self),
            Some((head, rest)) => self.subkeys.get(&fold(head))?.find(rest),
        }
    }

    fn find_or_create(&mut self, path: &[&str]) -> &mut Node {
        match path.split_first() {
            None => self,
            Some((head, rest)) => self
                .subkeys
                .entry(fold(head))
                .or_insert_with(|| Node {
                    name: head.to_string(),
                    ..Node::default()
                })
                .find_or_create(rest),
        }
    }

    fn find_mut(&mut self, path: &[&str]) -> Option<&mut Node> {
        match path.split_first() {
            None => Some(self),
            Some((head, rest)) => self.subkeys.get_mut(&fold(head))?.find_mut(rest),
        }
    }
}

/// A hive kept entirely in memory.
pub struct MemoryHive {
    name: String,
    root: Mutex<Node>,
}

impl MemoryHive {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            root: Mutex::new(Node::default()),
        }
    }
}

impl Hive for MemoryHive {
    fn name(&self) -> &str {
        &self.name
    }

    fn key_exists(&self, path: &str) -> Result<bool> {
        Ok(self.root.lock().find(&segments(path)).is_some())
    }

    fn create_key(&self, path: &str) -> Result<()> {
        self.root.lock().find_or_create(&segments(path));
        Ok(())
    }

    fn delete_key(&self, path: &str) -> Result<bool> {
        let segs = segments(path);
        let Some((last, parent)) = segs.split_last() else {
            return Err(root_not_deletable());
        };
        let mut root = self.root.lock();
        Ok(root
            .find_mut(parent)
            .and_then(|node| node.subkeys.remove(&fold(last)))
            .is_some())
    }

    fn get_value(&self, path: &str, name: &str) -> Result<Option<RegistryValue>> {
        let root = self.root.lock();
        Ok(root
            .find(&segments(path))
            .and_then(|node| node.values.get(&fold(name)))
            .map(|(_, value)| value.clone()))
    }

    fn set_value(&self, path: &str, name: &str, value: RegistryValue) -> Result<()> {
        let mut root = self.root.lock();
        let node = root.find_or_create(&segments(path));
        match node.values.get_mut(&fold(name)) {
            Some((_, existing)) => *existing = value,
            None => {
                node.values.insert(fold(name), (name.to_string(), value));
            }
        }
        Ok(())
    }

    fn delete_value(&self, path: &str, name: &str) -> Result<bool> {
        let mut root = self.root.lock();
        Ok(root
            .find_mut(&segments(path))
            .and_then(|node| node.values.remove(&fold(name)))
            .is_some())
    }

    fn value_names(&self, path: &str) -> Result<Vec<String>> {
        let root = self.root.lock();
        Ok(root
            .find(&segments(path))
            .map(|node| node.values.values().map(|(n, _)| n.clone()).collect())
            .unwrap_or_default())
    }

    fn subkey_names(&self, path: &str) -> Result<Vec<String>> {
        let root = self.root.lock();
        Ok(root
            .find(&segments(path))
            .map(|node| node.subkeys.values().map(|n| n.name.clone()).collect())
            .unwrap_or_default())
    }
}

// --- Directory hive ---

#[derive(Debug, Default, Serialize, Deserialize)]
struct KeyFile {
    name: String,
    #[serde(default)]
    values: Vec<NamedValue>,
}

#[derive(Debug, Serialize, Deserialize)]
struct NamedValue {
    name: String,
    value: RegistryValue,
}

/// A hive persisted as a directory tree.
pub struct DirectoryHive {
    name: String,
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl DirectoryHive {
    pub fn open(name: impl Into<String>, root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            name: name.into(),
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_dir(&self, path: &str) -> Result<PathBuf> {
        let mut dir = self.root.clone();
        for segment in segments(path) {
            dir = self.key_dir_child(&dir, segment)?;
        }
        Ok(dir)
    }

    fn load_key(&self, dir: &Path) -> Result<Option<KeyFile>> {
        if !dir.is_dir() {
            return Ok(None);
        }
        let file = dir.join(VALUES_FILE);
        if !file.exists() {
            let name = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            return Ok(Some(KeyFile {
                name,
                values: Vec::new(),
            }));
        }
        let content = fs::read_to_string(file)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn save_key(&self, dir: &Path, key: &KeyFile) -> Result<()> {
        let content = serde_json::to_string_pretty(key)?;
        let tmp = dir.join(format!(".values-{}.tmp", Uuid::new_v4()));
        fs::write(&tmp, content)?;
        fs::rename(&tmp, dir.join(VALUES_FILE))?;
        debug!(hive = %self.name, key = %key.name, "Wrote registry key");
        Ok(())
    }

    /// Creates every missing directory along `path`, recording each key's original name.
    fn ensure_key(&self, path: &str) -> Result<PathBuf> {
        let mut dir = self.root.clone();
        for segment in segments(path) {
            dir = self.key_dir_child(&dir, segment)?;
            if !dir.is_dir() {
                fs::create_dir_all(&dir)?;
                self.save_key(
                    &dir,
                    &KeyFile {
                        name: segment.to_string(),
                        values: Vec::new(),
                    },
                )?;
            }
        }
        Ok(dir)
    }

    fn key_dir_child(&self, parent: &Path, segment: &str) -> Result<PathBuf> {
        if segment == "." || segment == ".." || segment.contains('/') {
            return Err(SettingsError::Store(format!(
                "invalid registry key name '{}'",
                segment
            )));
        }
        Ok(parent.join(fold(segment)))
    }
}

impl Hive for DirectoryHive {
    fn name(&self) -> &str {
        &self.name
    }

    fn key_exists(&self, path: &str) -> Result<bool> {
        Ok(self.key_dir(path)?.is_dir())
    }

    fn create_key(&self, path: &str) -> Result<()> {
        let _guard = self.write_lock.lock();
        self.ensure_key(path)?;
        Ok(())
    }

    fn delete_key(&self, path: &str) -> Result<bool> {
        if segments(path).is_empty() {
            return Err(root_not_deletable());
        }
        let _guard = self.write_lock.lock();
        let dir = self.key_dir(path)?;
        if !dir.is_dir() {
            return Ok(false);
        }
        fs::remove_dir_all(&dir)?;
        Ok(true)
    }

    fn get_value(&self, path: &str, name: &str) -> Result<Option<RegistryValue>> {
        let Some(key) = self.load_key(&self.key_dir(path)?)? else {
            return Ok(None);
        };
        Ok(key
            .values
            .into_iter()
            .find(|v| v.name.eq_ignore_ascii_case(name))
            .map(|v| v.value))
    }

    fn set_value(&self, path: &str, name: &str, value: RegistryValue) -> Result<()> {
        let _guard = self.write_lock.lock();
        let dir = self.ensure_key(path)?;
        let mut key = self.load_key(&dir)?.unwrap_or_default();
        match key
            .values
            .iter_mut()
            .find(|v| v.name.eq_ignore_ascii_case(name))
        {
            Some(existing) => existing.value = value,
            None => key.values.push(NamedValue {
                name: name.to_string(),
                value,
            }),
        }
        self.save_key(&dir, &key)
    }

    fn delete_value(&self, path: &str, name: &str) -> Result<bool> {
        let _guard = self.write_lock.lock();
        let dir = self.key_dir(path)?;
        let Some(mut key) = self.load_key(&dir)? else {
            return Ok(false);
        };
        let before = key.values.len();
        key.values.retain(|v| !v.name.eq_ignore_ascii_case(name));
        if key.values.len() == before {
            return Ok(false);
        }
        self.save_key(&dir, &key)?;
        Ok(true)
    }

    fn value_names(&self, path: &str) -> Result<Vec<String>> {
        Ok(self
            .load_key(&self.key_dir(path)?)?
            .map(|key| key.values.into_iter().map(|v| v.name).collect())
            .unwrap_or_default())
    }

    fn subkey_names(&self, path: &str) -> Result<Vec<String>> {
        let dir = self.key_dir(path)?;
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(key) = self.load_key(&entry.path())? {
                names.push(key.name);
            }
        }
        names.sort_by_key(|n| fold(n));
        Ok(names)
    }
}

// --- Hive pair ---

/// The per-user and machine-wide hives a registry store chooses between.
#[derive(Clone)]
pub struct Registry {
    current_user: Arc<dyn Hive>,
    local_machine: Arc<dyn Hive>,
}

impl Registry {
    pub fn new(current_user: Arc<dyn Hive>, local_machine: Arc<dyn Hive>) -> Self {
        Self {
            current_user,
            local_machine,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryHive::new(CURRENT_USER)),
            Arc::new(MemoryHive::new(LOCAL_MACHINE)),
        )
    }

    /// Both hives as directory trees below `root`.
    pub fn at_directory(root: &Path) -> Result<Self> {
        Ok(Self::new(
            Arc::new(DirectoryHive::open(CURRENT_USER, root.join(CURRENT_USER))?),
            Arc::new(DirectoryHive::open(LOCAL_MACHINE, root.join(LOCAL_MACHINE))?),
        ))
    }

    /// The machine-wide hive when `is_global`, the per-user hive otherwise.
    pub fn hive(&self, is_global: bool) -> Arc<dyn Hive> {
        if is_global {
            self.local_machine.clone()
        } else {
            self.current_user.clone()
        }
    }
}
