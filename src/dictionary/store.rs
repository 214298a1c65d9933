//! Key/value storage behind an observable dictionary.

use crate::engine::SlotStore;
use crate::error::{CollectionError, Result};
use crate::keys::{Key, KeyComparer};
use crate::types::SlotId;
use std::collections::HashMap;

/// One stored entry. The key is kept exactly as it was supplied.
#[derive(Clone, Debug)]
pub(crate) struct Entry<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) slot: SlotId,
}

/// Outcome of replacing the value of an existing key.
pub(crate) struct Replaced<K, V> {
    /// The stored key (which may differ in form from the one supplied).
    pub(crate) key: K,
    pub(crate) previous: V,
    pub(crate) previous_slot: SlotId,
    pub(crate) slot: SlotId,
}

/// Outcome of moving a value to a new key.
pub(crate) struct Rekeyed<K> {
    pub(crate) previous_key: K,
    pub(crate) previous_slot: SlotId,
    pub(crate) slot: SlotId,
}

/// Hash map keyed by the comparer's canonical form of each key.
pub(crate) struct DictionaryStore<K, V, C: KeyComparer<K>> {
    comparer: C,
    entries: HashMap<C::Canonical, Entry<K, V>>,
    next_slot: u64,
}

impl<K, V, C> DictionaryStore<K, V, C>
where
    K: Key,
    V: Send + 'static,
    C: KeyComparer<K>,
{
    pub(crate) fn new(comparer: C) -> Self {
        Self {
            comparer,
            entries: HashMap::new(),
            next_slot: 1,
        }
    }

    /// Build a store from initial contents. All or nothing: the first null
    /// or duplicate key fails the whole construction.
    pub(crate) fn from_entries<I>(entries: I, comparer: C) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut store = Self::new(comparer);
        for (key, value) in entries {
            if key.is_null() {
                return Err(CollectionError::NullArgument("key"));
            }
            if store.contains(&key) {
                return Err(CollectionError::DuplicateKey(format!("{:?}", key)));
            }
            store.insert(key, value);
        }
        Ok(store)
    }

    fn next_slot(&mut self) -> SlotId {
        let slot = SlotId(self.next_slot);
        self.next_slot += 1;
        slot
    }

    pub(crate) fn try_get(&self, key: &K) -> Option<&Entry<K, V>> {
        self.entries.get(&self.comparer.canonicalize(key))
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(&self.comparer.canonicalize(key))
    }

    /// Insert a key known to be absent.
    pub(crate) fn insert(&mut self, key: K, value: V) -> SlotId {
        let slot = self.next_slot();
        let canonical = self.comparer.canonicalize(&key);
        self.entries.insert(canonical, Entry { key, value, slot });
        slot
    }

    /// Replace the value of an existing key. The value gets a fresh slot.
    pub(crate) fn replace(&mut self, key: &K, value: V) -> Option<Replaced<K, V>>
    where
        K: Clone,
    {
        let slot = SlotId(self.next_slot);
        let entry = self.entries.get_mut(&self.comparer.canonicalize(key))?;
        self.next_slot += 1;

        let previous = std::mem::replace(&mut entry.value, value);
        let previous_slot = std::mem::replace(&mut entry.slot, slot);
        Some(Replaced {
            key: entry.key.clone(),
            previous,
            previous_slot,
            slot,
        })
    }

    /// Move the value stored under `old` to `new`. The caller has checked
    /// that `new` is free (or names the same entry).
    pub(crate) fn rekey(&mut self, old: &K, new: K) -> Option<Rekeyed<K>> {
        let mut entry = self.entries.remove(&self.comparer.canonicalize(old))?;
        let slot = self.next_slot();

        let previous_key = std::mem::replace(&mut entry.key, new);
        let previous_slot = std::mem::replace(&mut entry.slot, slot);
        let canonical = self.comparer.canonicalize(&entry.key);
        self.entries.insert(canonical, entry);

        Some(Rekeyed {
            previous_key,
            previous_slot,
            slot,
        })
    }

    pub(crate) fn delete(&mut self, key: &K) -> Option<Entry<K, V>> {
        self.entries.remove(&self.comparer.canonicalize(key))
    }

    /// The value under `key`, provided it still lives in `slot`.
    pub(crate) fn value_in_slot(&self, key: &K, slot: SlotId) -> Option<&V> {
        self.try_get(key)
            .filter(|entry| entry.slot == slot)
            .map(|entry| &entry.value)
    }

    pub(crate) fn same_key(&self, a: &K, b: &K) -> bool {
        self.comparer.canonicalize(a) == self.comparer.canonicalize(b)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Entry<K, V>> {
        self.entries.values()
    }
}

impl<K, V, C> SlotStore for DictionaryStore<K, V, C>
where
    K: Key,
    V: Send + 'static,
    C: KeyComparer<K>,
{
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}
