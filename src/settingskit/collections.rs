//! # Bound Collection Views
//!
//! [`BoundList`] and [`BoundMap`] are live views of a single array or map setting. They hold no
//! copy of the data: every call reads the key from the store, and every mutation writes the whole
//! collection back. Two views of the same key, or a view and direct store access, therefore
//! always agree.
//!
//! Since each mutation is a read-modify-write of the whole key, concurrent mutations through
//! different views can overwrite each other.
//!
//! Reads are lenient: a stored value of the wrong shape reads as an empty collection. Mutations
//! are strict and fail with [`SettingsError::MalformedStoredValue`] instead of writing over a
//! value they could not decode.

use crate::codec::{decode_flat_map, SettingScalar};
use crate::error::{Result, SettingsError};
use crate::store::{SettingsStore, SettingsStoreExt};
use crate::value::{SettingsMap, Value};
use std::marker::PhantomData;
use std::sync::Arc;

/// A list view over an array setting.
pub struct BoundList<T> {
    store: Arc<dyn SettingsStore>,
    key: String,
    _items: PhantomData<fn() -> T>,
}

impl<T> Clone for BoundList<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            key: self.key.clone(),
            _items: PhantomData,
        }
    }
}

impl<T: SettingScalar> BoundList<T> {
    pub fn new(store: Arc<dyn SettingsStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            _items: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn load(&self) -> Result<Vec<T>> {
        self.store.get_typed::<Vec<T>>(&self.key)
    }

    /// The stored items for a mutation. Unset is empty; anything undecodable is an error.
    fn load_for_update(&self) -> Result<Vec<T>> {
        match self.store.get(&self.key)? {
            None => Ok(Vec::new()),
            Some(value) => T::array_from_value(&value)
                .ok_or_else(|| malformed(&self.key, &value, T::ARRAY_KIND.name())),
        }
    }

    fn save(&self, items: Vec<T>) -> Result<()> {
        self.store.put(&self.key, items)
    }

    fn out_of_range(&self, index: usize, len: usize) -> SettingsError {
        SettingsError::Store(format!(
            "index {} is out of range for '{}' with {} items",
            index, self.key, len
        ))
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.load()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.load()?.is_empty())
    }

    pub fn get(&self, index: usize) -> Result<Option<T>> {
        Ok(self.load()?.into_iter().nth(index))
    }

    pub fn to_vec(&self) -> Result<Vec<T>> {
        self.load()
    }

    pub fn contains(&self, item: &T) -> Result<bool> {
        Ok(self.load()?.contains(item))
    }

    pub fn index_of(&self, item: &T) -> Result<Option<usize>> {
        Ok(self.load()?.iter().position(|x| x == item))
    }

    pub fn push(&self, item: T) -> Result<()> {
        let mut items = self.load_for_update()?;
        items.push(item);
        self.save(items)
    }

    pub fn insert(&self, index: usize, item: T) -> Result<()> {
        let mut items = self.load_for_update()?;
        if index > items.len() {
            return Err(self.out_of_range(index, items.len()));
        }
        items.insert(index, item);
        self.save(items)
    }

    pub fn set(&self, index: usize, item: T) -> Result<()> {
        let mut items = self.load_for_update()?;
        match items.get_mut(index) {
            Some(slot) => *slot = item,
            None => return Err(self.out_of_range(index, items.len())),
        }
        self.save(items)
    }

    pub fn remove_at(&self, index: usize) -> Result<T> {
        let mut items = self.load_for_update()?;
        if index >= items.len() {
            return Err(self.out_of_range(index, items.len()));
        }
        let removed = items.remove(index);
        self.save(items)?;
        Ok(removed)
    }

    /// Removes the first occurrence of `item`.
    pub fn remove(&self, item: &T) -> Result<bool> {
        let mut items = self.load_for_update()?;
        let Some(pos) = items.iter().position(|x| x == item) else {
            return Ok(false);
        };
        items.remove(pos);
        self.save(items)?;
        Ok(true)
    }

    pub fn clear(&self) -> Result<()> {
        self.save(Vec::new())
    }
}

/// A map view over a map setting, with values of type `V`.
pub struct BoundMap<V> {
    store: Arc<dyn SettingsStore>,
    key: String,
    _values: PhantomData<fn() -> V>,
}

impl<V> Clone for BoundMap<V> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            key: self.key.clone(),
            _values: PhantomData,
        }
    }
}

impl<V: SettingScalar> BoundMap<V> {
    pub fn new(store: Arc<dyn SettingsStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            _values: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn load(&self) -> Result<SettingsMap> {
        self.store.get_map(&self.key)
    }

    fn load_for_update(&self) -> Result<SettingsMap> {
        match self.store.get(&self.key)? {
            None => Ok(SettingsMap::new()),
            Some(Value::Map(map)) => Ok(map),
            Some(Value::StringArray(items)) => decode_flat_map(&self.key, &items),
            Some(value) => Err(malformed(&self.key, &value, "map")),
        }
    }

    fn save(&self, map: SettingsMap) -> Result<()> {
        self.store.put(&self.key, map)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.load()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.load()?.is_empty())
    }

    /// The value under `name`. A stored value that does not parse as `V` reads as `None`.
    pub fn get(&self, name: &str) -> Result<Option<V>> {
        Ok(self.load()?.get(name).and_then(V::parse_text))
    }

    pub fn contains_key(&self, name: &str) -> Result<bool> {
        Ok(self.load()?.contains_key(name))
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        Ok(self.load()?.keys().map(str::to_string).collect())
    }

    /// Entries in insertion order, skipping values that do not parse as `V`.
    pub fn to_vec(&self) -> Result<Vec<(String, V)>> {
        Ok(self
            .load()?
            .iter()
            .filter_map(|(k, v)| V::parse_text(v).map(|v| (k.to_string(), v)))
            .collect())
    }

    /// Inserts or replaces a value, returning the previous one.
    pub fn insert(&self, name: &str, value: V) -> Result<Option<V>> {
        let mut map = self.load_for_update()?;
        let previous = map.insert(name, value.format_text());
        self.save(map)?;
        Ok(previous.and_then(|p| V::parse_text(&p)))
    }

    pub fn remove(&self, name: &str) -> Result<bool> {
        let mut map = self.load_for_update()?;
        if map.remove(name).is_none() {
            return Ok(false);
        }
        self.save(map)?;
        Ok(true)
    }

    pub fn clear(&self) -> Result<()> {
        self.save(SettingsMap::new())
    }
}

fn malformed(key: &str, value: &Value, expected: &str) -> SettingsError {
    SettingsError::MalformedStoredValue {
        key: key.to_string(),
        reason: format!("cannot read {} as {}", value.kind(), expected),
    }
}

/// Bound views over a shared store.
pub trait StoreViews {
    fn list<T: SettingScalar>(&self, key: &str) -> BoundList<T>;

    fn map<V: SettingScalar>(&self, key: &str) -> BoundMap<V>;
}

impl StoreViews for Arc<dyn SettingsStore> {
    fn list<T: SettingScalar>(&self, key: &str) -> BoundList<T> {
        BoundList::new(self.clone(), key)
    }

    fn map<V: SettingScalar>(&self, key: &str) -> BoundMap<V> {
        BoundMap::new(self.clone(), key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::hive::Registry;
    use crate::store::registry::{RegistryStore, RegistryStoreOptions};

    fn store() -> Arc<dyn SettingsStore> {
        let registry = Registry::in_memory();
        Arc::new(
            RegistryStore::open(&registry, false, r"Software\Views", RegistryStoreOptions::default())
                .unwrap(),
        )
    }

    #[test]
    fn test_list_writes_through() {
        let store = store();
        let list = store.list::<String>("Recent");
        assert!(list.is_empty().unwrap());

        list.push("a".to_string()).unwrap();
        list.push("b".to_string()).unwrap();
        list.insert(0, "first".to_string()).unwrap();

        assert_eq!(
            store.get_string_array("Recent").unwrap(),
            vec!["first", "a", "b"]
        );
        assert_eq!(list.index_of(&"a".to_string()).unwrap(), Some(1));
    }

    #[test]
    fn test_list_sees_external_changes() {
        let store = store();
        let list = store.list::<i32>("Numbers");
        store.put("Numbers", vec![4, 5]).unwrap();

        assert_eq!(list.to_vec().unwrap(), vec![4, 5]);
        list.set(1, 6).unwrap();
        assert_eq!(store.get_int_array("Numbers").unwrap(), vec![4, 6]);
        assert_eq!(list.remove_at(0).unwrap(), 4);
        assert!(list.remove(&6).unwrap());
        assert!(!list.remove(&6).unwrap());
        assert_eq!(list.len().unwrap(), 0);
    }

    #[test]
    fn test_list_index_out_of_range() {
        let store = store();
        let list = store.list::<bool>("Flags");
        assert!(matches!(list.set(0, true), Err(SettingsError::Store(_))));
        assert!(matches!(list.insert(1, true), Err(SettingsError::Store(_))));
        assert!(list.remove_at(0).is_err());
        assert_eq!(list.get(3).unwrap(), None);
    }

    #[test]
    fn test_map_writes_through() {
        let store = store();
        let map = store.map::<i32>("Sizes");

        assert_eq!(map.insert("small", 1).unwrap(), None);
        assert_eq!(map.insert("large", 9).unwrap(), None);
        assert_eq!(map.insert("small", 2).unwrap(), Some(1));

        assert_eq!(map.keys().unwrap(), vec!["small", "large"]);
        assert_eq!(map.get("small").unwrap(), Some(2));
        assert_eq!(store.get_map("Sizes").unwrap().get("large"), Some("9"));

        assert!(map.remove("small").unwrap());
        assert!(!map.contains_key("small").unwrap());
        map.clear().unwrap();
        assert!(map.is_empty().unwrap());
    }

    #[test]
    fn test_map_skips_unparseable_values() {
        let store = store();
        let raw: SettingsMap = [("a", "1"), ("b", "x")].into_iter().collect();
        store.put("Mixed", raw).unwrap();

        let map = store.map::<i64>("Mixed");
        assert_eq!(map.to_vec().unwrap(), vec![("a".to_string(), 1)]);
        assert_eq!(map.get("b").unwrap(), None);
        assert_eq!(map.len().unwrap(), 2);
    }

    #[test]
    fn test_list_mutation_keeps_unreadable_value() {
        let store = store();
        store.put("Numbers", "1,x,3".to_string()).unwrap();
        let list = store.list::<i32>("Numbers");

        assert!(list.is_empty().unwrap());
        assert!(matches!(
            list.push(4),
            Err(SettingsError::MalformedStoredValue { .. })
        ));
        assert!(list.remove_at(0).is_err());
        assert_eq!(store.get_string("Numbers").unwrap(), "1,x,3");

        list.clear().unwrap();
        list.push(4).unwrap();
        assert_eq!(list.to_vec().unwrap(), vec![4]);
    }

    #[test]
    fn test_map_mutation_keeps_odd_flat_value() {
        let store = store();
        let odd = vec!["a".to_string(), "1".to_string(), "b".to_string()];
        store.put("Sizes", odd.clone()).unwrap();
        let map = store.map::<String>("Sizes");

        assert!(map.is_empty().unwrap());
        assert!(matches!(
            map.insert("c", "3".to_string()),
            Err(SettingsError::MalformedStoredValue { .. })
        ));
        assert!(map.remove("a").is_err());
        assert_eq!(store.get_string_array("Sizes").unwrap(), odd);
    }
}
