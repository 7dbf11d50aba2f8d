//! # File Settings Store
//!
//! All values live in an in-memory snapshot. Mutations update the snapshot, mark it dirty and
//! poke a background flusher thread. The flusher waits until no further mutation has arrived for
//! the configured debounce interval, then writes the whole snapshot in one go, so a burst of
//! changes costs a single write.
//!
//! On disk the store is a JSON document:
//!
//! ```json
//! {
//!   "format": 1,
//!   "values": {
//!     "Culture": { "type": "string", "value": "de-DE" },
//!     "View.Zoom": { "type": "double", "value": "1.25" }
//!   }
//! }
//! ```
//!
//! Doubles, decimals and timestamps are kept as their codec text so that NaN, infinities and
//! exact decimals survive a round trip. Writes go to a temporary file in the same directory that
//! is then renamed over the target; with `backup` enabled the previous file is copied to
//! `<name>.bak` first.
//!
//! `dispose` stops the flusher and writes any pending changes synchronously. Dropping the store
//! disposes it.

use super::{
    display_location, ensure_supported, ChangeListener, ChangeNotifier, SettingsStore,
    SubscriptionId,
};
use crate::codec::{
    duration_from_ticks, duration_to_ticks, format_datetime, format_double, parse_datetime,
    parse_decimal, parse_double,
};
use crate::error::{Result, SettingsError};
use crate::keypath::sort_keys;
use crate::value::{SettingsMap, Value};
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const FORMAT_VERSION: u32 = 1;
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct FileStoreOptions {
    pub read_only: bool,
    /// Only surfaced in the location display; the document itself is plain JSON.
    pub encrypted: bool,
    pub backup: bool,
    pub debounce: Duration,
}

impl Default for FileStoreOptions {
    fn default() -> Self {
        Self {
            read_only: false,
            encrypted: false,
            backup: false,
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Document {
    format: u32,
    #[serde(default)]
    values: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
enum StoredEntry {
    String(String),
    StringArray(Vec<String>),
    Int(i64),
    IntArray(Vec<i64>),
    Double(String),
    DoubleArray(Vec<String>),
    Decimal(String),
    DecimalArray(Vec<String>),
    Bool(bool),
    BoolArray(Vec<bool>),
    #[serde(rename = "datetime")]
    DateTime(String),
    #[serde(rename = "datetime-array")]
    DateTimeArray(Vec<String>),
    Duration(i64),
    DurationArray(Vec<i64>),
    Map(Vec<(String, String)>),
}

impl StoredEntry {
    fn encode(value: &Value) -> Result<Self> {
        Ok(match value {
            Value::String(s) => StoredEntry::String(s.clone()),
            Value::StringArray(v) => StoredEntry::StringArray(v.clone()),
            Value::Int(i) => StoredEntry::Int(*i),
            Value::IntArray(v) => StoredEntry::IntArray(v.clone()),
            Value::Double(d) => StoredEntry::Double(format_double(*d)),
            Value::DoubleArray(v) => {
                StoredEntry::DoubleArray(v.iter().map(|d| format_double(*d)).collect())
            }
            Value::Decimal(d) => StoredEntry::Decimal(d.to_string()),
            Value::DecimalArray(v) => {
                StoredEntry::DecimalArray(v.iter().map(|d| d.to_string()).collect())
            }
            Value::Bool(b) => StoredEntry::Bool(*b),
            Value::BoolArray(v) => StoredEntry::BoolArray(v.clone()),
            Value::DateTime(t) => StoredEntry::DateTime(format_datetime(t)),
            Value::DateTimeArray(v) => {
                StoredEntry::DateTimeArray(v.iter().map(format_datetime).collect())
            }
            Value::Duration(d) => StoredEntry::Duration(duration_to_ticks(*d)),
            Value::DurationArray(v) => {
                StoredEntry::DurationArray(v.iter().map(|d| duration_to_ticks(*d)).collect())
            }
            Value::Map(map) => StoredEntry::Map(
                map.iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            Value::Bytes(_) => return Err(SettingsError::UnsupportedType(value.kind())),
        })
    }

    /// `None` when a textual element does not parse.
    fn decode(self) -> Option<Value> {
        Some(match self {
            StoredEntry::String(s) => Value::String(s),
            StoredEntry::StringArray(v) => Value::StringArray(v),
            StoredEntry::Int(i) => Value::Int(i),
            StoredEntry::IntArray(v) => Value::IntArray(v),
            StoredEntry::Double(s) => Value::Double(parse_double(&s)?),
            StoredEntry::DoubleArray(v) => Value::DoubleArray(
                v.iter().map(|s| parse_double(s)).collect::<Option<_>>()?,
            ),
            StoredEntry::Decimal(s) => Value::Decimal(parse_decimal(&s)?),
            StoredEntry::DecimalArray(v) => Value::DecimalArray(
                v.iter().map(|s| parse_decimal(s)).collect::<Option<_>>()?,
            ),
            StoredEntry::Bool(b) => Value::Bool(b),
            StoredEntry::BoolArray(v) => Value::BoolArray(v),
            StoredEntry::DateTime(s) => Value::DateTime(parse_datetime(&s)?),
            StoredEntry::DateTimeArray(v) => Value::DateTimeArray(
                v.iter().map(|s| parse_datetime(s)).collect::<Option<_>>()?,
            ),
            StoredEntry::Duration(t) => Value::Duration(duration_from_ticks(t)),
            StoredEntry::DurationArray(v) => {
                Value::DurationArray(v.into_iter().map(duration_from_ticks).collect())
            }
            StoredEntry::Map(pairs) => Value::Map(pairs.into_iter().collect::<SettingsMap>()),
        })
    }
}

struct FileState {
    values: BTreeMap<String, Value>,
    dirty: bool,
    disposed: bool,
}

/// The part of the store shared with the flusher thread.
struct Shared {
    path: PathBuf,
    options: FileStoreOptions,
    state: Mutex<FileState>,
    /// Serializes writers so an older snapshot never lands after a newer one.
    write_lock: Mutex<()>,
    notifier: ChangeNotifier,
}

impl Shared {
    fn flush(&self) -> Result<()> {
        let _write = self.write_lock.lock();
        let document = {
            let mut state = self.state.lock();
            if !state.dirty {
                return Ok(());
            }
            state.dirty = false;
            build_document(&state.values)?
        };

        if let Err(err) = self.write_document(&document) {
            self.state.lock().dirty = true;
            return Err(err);
        }
        debug!(path = %self.path.display(), entries = document.values.len(), "Flushed settings file");
        Ok(())
    }

    fn write_document(&self, document: &Document) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "settings".to_string());

        let content = serde_json::to_string_pretty(document)?;
        let tmp = dir.join(format!(".{}-{}.tmp", file_name, Uuid::new_v4()));
        fs::write(&tmp, content)?;

        if self.options.backup && self.path.exists() {
            if let Err(err) = fs::copy(&self.path, backup_path(&self.path)) {
                let _ = fs::remove_file(&tmp);
                return Err(err.into());
            }
        }

        if let Err(err) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(err.into());
        }
        Ok(())
    }
}

fn build_document(values: &BTreeMap<String, Value>) -> Result<Document> {
    let mut encoded = BTreeMap::new();
    for (key, value) in values {
        encoded.insert(key.clone(), serde_json::to_value(StoredEntry::encode(value)?)?);
    }
    Ok(Document {
        format: FORMAT_VERSION,
        values: encoded,
    })
}

/// `settings.json` is backed up to `settings.json.bak`.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".bak");
    PathBuf::from(name)
}

fn load_values(path: &Path) -> Result<BTreeMap<String, Value>> {
    let mut values = BTreeMap::new();
    if !path.exists() {
        return Ok(values);
    }
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(values);
    }

    let document: Document = serde_json::from_str(&content)?;
    if document.format != FORMAT_VERSION {
        return Err(SettingsError::Store(format!(
            "unsupported settings file format {} in {}",
            document.format,
            path.display()
        )));
    }

    for (key, raw) in document.values {
        match serde_json::from_value::<StoredEntry>(raw) {
            Ok(entry) => match entry.decode() {
                Some(value) => {
                    values.insert(key, value);
                }
                None => warn!(key = %key, "Skipping stored setting with unreadable text"),
            },
            Err(err) => warn!(key = %key, error = %err, "Skipping malformed stored setting"),
        }
    }
    Ok(values)
}

struct Flusher {
    tx: Sender<()>,
    handle: JoinHandle<()>,
}

fn spawn_flusher(shared: Arc<Shared>) -> Result<Flusher> {
    let (tx, rx) = crossbeam_channel::unbounded::<()>();
    let debounce = shared.options.debounce;
    let handle = thread::Builder::new()
        .name("settings-flush".to_string())
        .spawn(move || {
            while rx.recv().is_ok() {
                // wait for a quiet period; a disconnect ends the wait early
                while rx.recv_timeout(debounce).is_ok() {}
                if let Err(err) = shared.flush() {
                    warn!(path = %shared.path.display(), error = %err, "Background settings flush failed");
                }
            }
        })?;
    Ok(Flusher { tx, handle })
}

/// A settings store persisted as one JSON document.
pub struct FileStore {
    shared: Arc<Shared>,
    flusher: Mutex<Option<Flusher>>,
}

impl FileStore {
    /// Opens the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>, options: FileStoreOptions) -> Result<Self> {
        let path = path.into();
        let values = load_values(&path)?;
        info!(
            path = %path.display(),
            entries = values.len(),
            read_only = options.read_only,
            "Opened file settings store"
        );

        let read_only = options.read_only;
        let shared = Arc::new(Shared {
            path,
            options,
            state: Mutex::new(FileState {
                values,
                dirty: false,
                disposed: false,
            }),
            write_lock: Mutex::new(()),
            notifier: ChangeNotifier::new(),
        });

        let flusher = if read_only {
            None
        } else {
            Some(spawn_flusher(shared.clone())?)
        };

        Ok(Self {
            shared,
            flusher: Mutex::new(flusher),
        })
    }

    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    pub fn is_encrypted(&self) -> bool {
        self.shared.options.encrypted
    }

    /// Writes pending changes now instead of waiting for the flusher.
    pub fn flush(&self) -> Result<()> {
        if self.shared.options.read_only {
            return Ok(());
        }
        self.shared.flush()
    }

    fn schedule_flush(&self) {
        if let Some(flusher) = self.flusher.lock().as_ref() {
            // only fails once the flusher is gone, and dispose flushes anyway
            let _ = flusher.tx.send(());
        }
    }

    /// Runs `f` against the snapshot and notifies the keys it reports as changed.
    fn mutate<R>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, Value>) -> Result<(R, Vec<String>)>,
    ) -> Result<R> {
        let (result, changed) = {
            let mut state = self.shared.state.lock();
            if state.disposed {
                return Err(SettingsError::Disposed);
            }
            if self.shared.options.read_only {
                return Err(SettingsError::ReadOnly);
            }
            let (result, changed) = f(&mut state.values)?;
            if !changed.is_empty() {
                state.dirty = true;
            }
            (result, changed)
        };

        if !changed.is_empty() {
            self.schedule_flush();
            self.shared
                .notifier
                .notify_all(changed.iter().map(String::as_str));
        }
        Ok(result)
    }
}

impl SettingsStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let state = self.shared.state.lock();
        if state.disposed {
            return Err(SettingsError::Disposed);
        }
        Ok(state.values.get(key).cloned())
    }

    fn set(&self, key: &str, value: Option<Value>) -> Result<()> {
        let Some(value) = value else {
            self.remove(key)?;
            return Ok(());
        };
        self.mutate(|values| {
            ensure_supported(&value)?;
            values.insert(key.to_string(), value);
            Ok(((), vec![key.to_string()]))
        })
    }

    fn remove(&self, key: &str) -> Result<bool> {
        self.mutate(|values| {
            Ok(match values.remove(key) {
                Some(_) => (true, vec![key.to_string()]),
                None => (false, Vec::new()),
            })
        })
    }

    fn rename(&self, old_key: &str, new_key: &str) -> Result<bool> {
        self.mutate(|values| {
            if old_key == new_key {
                return Ok((values.contains_key(old_key), Vec::new()));
            }
            Ok(match values.remove(old_key) {
                Some(value) => {
                    values.insert(new_key.to_string(), value);
                    (true, vec![old_key.to_string(), new_key.to_string()])
                }
                None => (false, Vec::new()),
            })
        })
    }

    fn keys(&self) -> Result<Vec<String>> {
        let state = self.shared.state.lock();
        if state.disposed {
            return Err(SettingsError::Disposed);
        }
        let mut keys: Vec<String> = state.values.keys().cloned().collect();
        sort_keys(&mut keys);
        Ok(keys)
    }

    fn subscribe(&self, listener: ChangeListener) -> SubscriptionId {
        self.shared.notifier.subscribe(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.notifier.unsubscribe(id)
    }

    fn dispose(&self) -> Result<()> {
        {
            let mut state = self.shared.state.lock();
            if state.disposed {
                return Ok(());
            }
            state.disposed = true;
        }

        if let Some(flusher) = self.flusher.lock().take() {
            drop(flusher.tx);
            if flusher.handle.join().is_err() {
                warn!(path = %self.shared.path.display(), "Settings flusher thread panicked");
            }
        }

        let result = self.flush();
        self.shared.notifier.clear();
        info!(path = %self.shared.path.display(), "Disposed file settings store");
        result
    }

    fn is_disposed(&self) -> bool {
        self.shared.state.lock().disposed
    }

    fn is_read_only(&self) -> bool {
        self.shared.options.read_only
    }

    fn location(&self) -> String {
        display_location(
            &self.shared.path.display().to_string(),
            self.shared.options.read_only,
            self.shared.options.encrypted,
        )
    }
}

impl Drop for FileStore {
    fn drop(&mut self) {
        if let Err(err) = self.dispose() {
            warn!(path = %self.shared.path.display(), error = %err, "Failed to write settings on drop");
        }
    }
}
