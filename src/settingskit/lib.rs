//! # Settingskit Architecture
//!
//! Settingskit lets an application declare its configuration as **typed schemas** and keeps the
//! values in one of several **interchangeable stores**. Application code reads and writes plain
//! Rust values; it never learns whether they end up in a JSON file or a registry hive.
//!
//! ## The Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Schema Layer (schema.rs, adapter.rs, window.rs)            │
//! │  - settings_schema! declares typed settings types           │
//! │  - bind() validates a schema and attaches it to a store     │
//! │  - Defaults, nested groups, relative change notifications   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Store Contract (store/mod.rs, collections.rs)              │
//! │  - SettingsStore: untyped values under dotted keys          │
//! │  - SettingsStoreExt: typed getters with fallbacks           │
//! │  - BoundList / BoundMap: live views of one key              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Backends (store/file.rs, store/registry.rs, store/hive.rs) │
//! │  - FileStore: JSON document, debounced background writes    │
//! │  - RegistryStore: hierarchical hive, immediate writes       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Marshalling (value.rs, codec.rs, keypath.rs)               │
//! │  - Value: the closed set of storable shapes                 │
//! │  - Locale-independent text forms for every scalar           │
//! │  - Dotted keys ⇄ registry key paths                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Keys
//!
//! A setting is addressed by a dotted key such as `View.MainWindowState.Left`. Each segment is a
//! schema field key; groups add a segment. A file store uses the dotted key as is, a registry
//! store maps every segment but the last to a registry key.
//!
//! ## Reading Never Fails on Bad Data
//!
//! Absent, malformed or mistyped values read as the declared default (schema leaves) or the
//! caller's fallback (typed store getters), with a `warn!` event for anything malformed. Reading
//! only fails once a store has been disposed.
//!
//! ## Writes and Notifications
//!
//! Every successful set, remove or rename notifies the store's subscribers with the affected
//! key. Listeners run after the store has released its lock, so they may read the store. Schema
//! bindings re-emit those keys relative to the node a listener subscribed on, and skip writes
//! that would not change the value.
//!
//! ## Module Overview
//! - [`value`]: `Value`, `ValueKind`, `SettingsMap`
//! - [`codec`]: typed conversions (`SettingValue`, `SettingScalar`) and text forms
//! - [`keypath`]: dotted key and registry path helpers
//! - [`store`]: the store contract and both backends
//! - [`collections`]: bound list and map views
//! - [`schema`]: schema descriptors and validation
//! - [`adapter`]: binding schemas to stores, `settings_schema!`
//! - [`window`]: reusable window-state group
//! - [`location`]: store location strings
//! - [`config`], [`paths`], [`logging`]: ambient setup for applications and the CLI
//! - [`multimap`]: key to value-list map used for subscriptions
//! - [`error`]: error types

pub mod adapter;
pub mod codec;
pub mod collections;
pub mod config;
pub mod error;
pub mod keypath;
pub mod location;
pub mod logging;
pub mod multimap;
pub mod paths;
pub mod schema;
pub mod store;
pub mod value;
pub mod window;

pub use adapter::{bind, Settings, SettingsNode};
pub use collections::{BoundList, BoundMap, StoreViews};
pub use error::{Result, SettingsError};
pub use store::file::{FileStore, FileStoreOptions};
pub use store::hive::Registry;
pub use store::registry::{RegistryStore, RegistryStoreOptions};
pub use store::{ChangeListener, SettingsStore, SettingsStoreExt, SubscriptionId};
pub use value::{SettingsMap, Value, ValueKind};

#[doc(hidden)]
pub mod __private {
    pub use once_cell::sync::Lazy;
}
