use std::collections::HashMap;
use std::hash::Hash;

/// A map from a key to an ordered list of values.
///
/// A key is present only while it has at least one value; removing the last value removes the
/// key. Used by the adapter to keep change subscribers per key prefix.
#[derive(Debug, Clone)]
pub struct MultiMap<K, V> {
    entries: HashMap<K, Vec<V>>,
}

impl<K: Eq + Hash, V> Default for MultiMap<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, V> MultiMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: K, value: V) {
        self.entries.entry(key).or_default().push(value);
    }

    pub fn add_all(&mut self, key: K, values: impl IntoIterator<Item = V>) {
        let mut values = values.into_iter().peekable();
        if values.peek().is_none() {
            return;
        }
        self.entries.entry(key).or_default().extend(values);
    }

    /// Removes every value under `key` matching `pred`. Returns how many were removed.
    pub fn remove_where(&mut self, key: &K, mut pred: impl FnMut(&V) -> bool) -> usize {
        let Some(list) = self.entries.get_mut(key) else {
            return 0;
        };
        let before = list.len();
        list.retain(|v| !pred(v));
        let removed = before - list.len();
        if list.is_empty() {
            self.entries.remove(key);
        }
        removed
    }

    /// The values under `key`, or an empty slice.
    pub fn get_or_empty(&self, key: &K) -> &[V] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn contains_value(&self, key: &K, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.get_or_empty(key).contains(value)
    }

    pub fn value_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries
            .iter()
            .flat_map(|(k, list)| list.iter().map(move |v| (k, v)))
    }
}
