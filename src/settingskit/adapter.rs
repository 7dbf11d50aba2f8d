//! # Schema Adapter
//!
//! Binds a settings type declared with [`crate::settings_schema!`] to a store.
//!
//! ```text
//! bind::<AppSettings>(store, "")
//!   └─ SettingsNode (prefix "")            AppSettings
//!        ├─ get/set  "Culture"
//!        ├─ group    "View" ──► SettingsNode (prefix "View")   ViewSettings
//!        ├─ list     "RecentlyLoadedFiles"
//!        └─ map      "TestMap"
//! ```
//!
//! Every generated settings type is a thin handle around an `Arc<SettingsNode>`. Nodes of one
//! binding share a single [`ChangeHub`], which subscribes to the store once and fans changes out
//! to node subscribers with the key rewritten relative to that node. Group nodes are created on
//! first access and cached, so repeated accessor calls return handles to the same node.
//!
//! Leaf reads never fail: an absent, malformed or unreadable value yields the declared default
//! (or the type default). Leaf writes that would not change the current value are skipped, so
//! they cause no store write and no notification.

use crate::codec::{SettingScalar, SettingValue};
use crate::collections::{BoundList, BoundMap};
use crate::error::Result;
use crate::keypath::{join_key, relative_key};
use crate::multimap::MultiMap;
use crate::schema::{validate, SchemaDescriptor};
use crate::store::{ChangeListener, SettingsStore, SubscriptionId};
use crate::value::Value;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::warn;

/// A settings type bound to a store.
///
/// Implemented by [`crate::settings_schema!`]; there is rarely a reason to implement it by hand.
pub trait Settings: Sized + Send + Sync + 'static {
    fn schema() -> &'static SchemaDescriptor;

    fn from_node(node: Arc<SettingsNode>) -> Self;

    fn node(&self) -> &Arc<SettingsNode>;

    /// Subscribes to changes below this node. The listener receives keys relative to it.
    fn subscribe(&self, listener: ChangeListener) -> SubscriptionId {
        self.node().subscribe(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.node().unsubscribe(id)
    }

    /// The store this binding reads and writes, e.g. to dispose it.
    fn settings_store(&self) -> &Arc<dyn SettingsStore> {
        self.node().store()
    }
}

/// Binds `S` to `store`, with every key below `prefix` (empty for the store root).
pub fn bind<S: Settings>(store: Arc<dyn SettingsStore>, prefix: &str) -> Result<S> {
    let schema = S::schema();
    validate(schema)?;
    let hub = ChangeHub::new(store.clone());
    let node = SettingsNode::new(store, prefix.to_string(), schema, hub);
    Ok(S::from_node(Arc::new(node)))
}

/// Fans store changes out to node subscribers.
pub struct ChangeHub {
    store: Arc<dyn SettingsStore>,
    subscribers: Mutex<MultiMap<String, (SubscriptionId, ChangeListener)>>,
    store_subscription: SubscriptionId,
}

impl ChangeHub {
    fn new(store: Arc<dyn SettingsStore>) -> Arc<Self> {
        Arc::new_cyclic(|hub: &Weak<ChangeHub>| {
            let weak = hub.clone();
            let store_subscription = store.subscribe(Arc::new(move |key: &str| {
                if let Some(hub) = weak.upgrade() {
                    hub.dispatch(key);
                }
            }));
            ChangeHub {
                store,
                subscribers: Mutex::new(MultiMap::new()),
                store_subscription,
            }
        })
    }

    fn add(&self, prefix: &str, listener: ChangeListener) -> SubscriptionId {
        let id = SubscriptionId::next();
        self.subscribers
            .lock()
            .add(prefix.to_string(), (id, listener));
        id
    }

    fn remove(&self, prefix: &str, id: SubscriptionId) -> bool {
        self.subscribers
            .lock()
            .remove_where(&prefix.to_string(), |(existing, _)| *existing == id)
            > 0
    }

    fn dispatch(&self, key: &str) {
        let targets: Vec<(ChangeListener, String)> = self
            .subscribers
            .lock()
            .iter()
            .filter_map(|(prefix, (_, listener))| {
                relative_key(prefix, key).map(|rel| (listener.clone(), rel.to_string()))
            })
            .collect();
        for (listener, relative) in targets {
            listener(&relative);
        }
    }
}

impl Drop for ChangeHub {
    fn drop(&mut self) {
        self.store.unsubscribe(self.store_subscription);
    }
}

fn same_double(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

/// Equality where NaN equals NaN, so rewriting a NaN double is not a change.
fn same_value(current: &Value, next: &Value) -> bool {
    match (current, next) {
        (Value::Double(a), Value::Double(b)) => same_double(*a, *b),
        (Value::DoubleArray(a), Value::DoubleArray(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| same_double(*x, *y))
        }
        _ => current == next,
    }
}

/// One level of a bound settings tree.
pub struct SettingsNode {
    store: Arc<dyn SettingsStore>,
    prefix: String,
    schema: &'static SchemaDescriptor,
    hub: Arc<ChangeHub>,
    children: Mutex<HashMap<&'static str, Arc<SettingsNode>>>,
}

impl SettingsNode {
    fn new(
        store: Arc<dyn SettingsStore>,
        prefix: String,
        schema: &'static SchemaDescriptor,
        hub: Arc<ChangeHub>,
    ) -> Self {
        Self {
            store,
            prefix,
            schema,
            hub,
            children: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn SettingsStore> {
        &self.store
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn schema(&self) -> &'static SchemaDescriptor {
        self.schema
    }

    /// The full store key of a field of this node.
    pub fn key_of(&self, field: &str) -> String {
        join_key(&self.prefix, field)
    }

    fn default_of<T: SettingValue>(&self, field: &str) -> T {
        self.schema
            .field(field)
            .and_then(|f| f.default_value())
            .and_then(T::from_value)
            .unwrap_or_else(T::type_default)
    }

    pub fn get<T: SettingValue>(&self, field: &str) -> T {
        let key = self.key_of(field);
        match self.store.get(&key) {
            Ok(Some(value)) => T::from_value(&value).unwrap_or_else(|| {
                warn!(key = %key, stored = %value.kind(), expected = %T::KIND, "Stored setting has the wrong type, using default");
                self.default_of(field)
            }),
            Ok(None) => self.default_of(field),
            Err(err) => {
                warn!(key = %key, error = %err, "Failed to read setting, using default");
                self.default_of(field)
            }
        }
    }

    /// Writes `value` unless it equals what [`SettingsNode::get`] currently returns.
    pub fn set<T: SettingValue>(&self, field: &str, value: T) -> Result<()> {
        let next = value.to_value();
        if same_value(&self.get::<T>(field).to_value(), &next) {
            return Ok(());
        }
        self.store.set(&self.key_of(field), Some(next))
    }

    pub fn group<S: Settings>(&self, field: &'static str) -> S {
        let node = self
            .children
            .lock()
            .entry(field)
            .or_insert_with(|| {
                Arc::new(SettingsNode::new(
                    self.store.clone(),
                    self.key_of(field),
                    S::schema(),
                    self.hub.clone(),
                ))
            })
            .clone();
        S::from_node(node)
    }

    pub fn list<T: SettingScalar>(&self, field: &str) -> BoundList<T> {
        BoundList::new(self.store.clone(), self.key_of(field))
    }

    pub fn map<V: SettingScalar>(&self, field: &str) -> BoundMap<V> {
        BoundMap::new(self.store.clone(), self.key_of(field))
    }

    pub fn subscribe(&self, listener: ChangeListener) -> SubscriptionId {
        self.hub.add(&self.prefix, listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.hub.remove(&self.prefix, id)
    }
}

/// Declares a settings type and its schema.
///
/// ```
/// use settingskit::settings_schema;
///
/// settings_schema! {
///     /// Per-view options.
///     pub struct ViewSettings {
///         fields {
///             zoom / set_zoom: f64 = "Zoom", default 1.0;
///         }
///     }
/// }
///
/// settings_schema! {
///     pub struct AppSettings {
///         fields {
///             /// UI culture name.
///             culture / set_culture: String = "Culture", default "de-DE";
///             indent_size / set_indent_size: i32 = "IndentSize", default 15;
///         }
///         groups {
///             view: ViewSettings = "View";
///         }
///         lists {
///             recent_files: String = "RecentlyLoadedFiles";
///         }
///         maps {
///             extra: String = "Extra";
///         }
///     }
/// }
/// ```
///
/// Each field gets a getter returning the value (or its default) and a setter taking anything
/// that converts into the field type. Groups, lists and maps get a getter only. Sections are
/// optional but must appear in the order shown. Defaults are converted with `Into`.
#[macro_export]
macro_rules! settings_schema {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(fields {
                $(
                    $(#[$field_meta:meta])*
                    $getter:ident / $setter:ident : $field_ty:ty = $field_key:literal
                    $(, default $default:expr)? ;
                )*
            })?
            $(groups {
                $(
                    $(#[$group_meta:meta])*
                    $group:ident : $group_ty:ty = $group_key:literal ;
                )*
            })?
            $(lists {
                $(
                    $(#[$list_meta:meta])*
                    $list:ident : $list_ty:ty = $list_key:literal ;
                )*
            })?
            $(maps {
                $(
                    $(#[$map_meta:meta])*
                    $map:ident : $map_ty:ty = $map_key:literal ;
                )*
            })?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone)]
        $vis struct $name {
            node: ::std::sync::Arc<$crate::adapter::SettingsNode>,
        }

        impl $name {
            $($(
                $(#[$field_meta])*
                pub fn $getter(&self) -> $field_ty {
                    self.node.get::<$field_ty>($field_key)
                }

                pub fn $setter(&self, value: impl ::std::convert::Into<$field_ty>) -> $crate::error::Result<()> {
                    self.node.set::<$field_ty>($field_key, value.into())
                }
            )*)?

            $($(
                $(#[$group_meta])*
                pub fn $group(&self) -> $group_ty {
                    self.node.group::<$group_ty>($group_key)
                }
            )*)?

            $($(
                $(#[$list_meta])*
                pub fn $list(&self) -> $crate::collections::BoundList<$list_ty> {
                    self.node.list::<$list_ty>($list_key)
                }
            )*)?

            $($(
                $(#[$map_meta])*
                pub fn $map(&self) -> $crate::collections::BoundMap<$map_ty> {
                    self.node.map::<$map_ty>($map_key)
                }
            )*)?
        }

        impl $crate::adapter::Settings for $name {
            fn schema() -> &'static $crate::schema::SchemaDescriptor {
                static SCHEMA: $crate::__private::Lazy<$crate::schema::SchemaDescriptor> =
                    $crate::__private::Lazy::new(|| {
                        $crate::schema::SchemaDescriptor::new(
                            stringify!($name),
                            vec![
                                $($(
                                    $crate::schema::FieldDescriptor::leaf(
                                        $field_key,
                                        <$field_ty as $crate::codec::SettingValue>::KIND,
                                    )
                                    $(.with_default($crate::codec::SettingValue::to_value(
                                        &::std::convert::Into::<$field_ty>::into($default),
                                    )))?,
                                )*)?
                                $($(
                                    $crate::schema::FieldDescriptor::group(
                                        $group_key,
                                        <$group_ty as $crate::adapter::Settings>::schema,
                                    ),
                                )*)?
                                $($(
                                    $crate::schema::FieldDescriptor::list(
                                        $list_key,
                                        <::std::vec::Vec<$list_ty> as $crate::codec::SettingValue>::KIND,
                                    ),
                                )*)?
                                $($(
                                    $crate::schema::FieldDescriptor::map($map_key),
                                )*)?
                            ],
                        )
                    });
                &SCHEMA
            }

            fn from_node(node: ::std::sync::Arc<$crate::adapter::SettingsNode>) -> Self {
                Self { node }
            }

            fn node(&self) -> &::std::sync::Arc<$crate::adapter::SettingsNode> {
                &self.node
            }
        }
    };
}
