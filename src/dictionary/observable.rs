//! Observable dictionary.

use super::store::DictionaryStore;
use crate::collection::{NotificationHub, ObservableCollection};
use crate::config::CollectionConfig;
use crate::engine::{Batch, Core, Engine};
use crate::error::{CollectionError, Result};
use crate::items::{Element, PropertyChangedHandler};
use crate::keys::{DefaultComparer, Key, KeyComparer};
use crate::types::{DictionaryChange, SlotId};
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Weak};

type Store<K, V, C> = DictionaryStore<K, V, C>;
type DictionaryEngine<K, V, C> = Engine<Store<K, V, C>, DictionaryChange<K, V>>;

/// A key/value collection that publishes every mutation.
///
/// Values exposing a property-changed signal (see
/// [`ChangeAware`](crate::items::ChangeAware)) are subscribed while they are
/// stored; their property changes surface as `ItemValueChanged` records.
///
/// All operations are serialised through one sync root. Subscribers run
/// while it is held and may call back into the dictionary.
pub struct ObservableDictionary<K, V, C = DefaultComparer>
where
    K: Key,
    V: Element,
    C: KeyComparer<K>,
{
    engine: Arc<DictionaryEngine<K, V, C>>,
}

impl<K, V> ObservableDictionary<K, V, DefaultComparer>
where
    K: Key + Eq + Hash,
    V: Element,
{
    /// Create an empty dictionary with the default comparer and config.
    pub fn new() -> Self {
        Self::with_config(CollectionConfig::default())
    }

    /// Create an empty dictionary with the default comparer.
    pub fn with_config(config: CollectionConfig) -> Self {
        Self::with_comparer(DefaultComparer, config)
    }
}

impl<K, V> Default for ObservableDictionary<K, V, DefaultComparer>
where
    K: Key + Eq + Hash,
    V: Element,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, C> ObservableDictionary<K, V, C>
where
    K: Key,
    V: Element,
    C: KeyComparer<K>,
{
    /// Empty dictionary using `comparer` for key equality.
    pub fn with_comparer(comparer: C, config: CollectionConfig) -> Self {
        Self {
            engine: Engine::new("dictionary", Store::new(comparer), config),
        }
    }

    /// Dictionary holding `entries`.
    ///
    /// Fails with `DuplicateKey` or `NullArgument` without building anything.
    /// Notification-capable values are subscribed straight away.
    pub fn from_entries<I>(entries: I, comparer: C, config: CollectionConfig) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let store = Store::from_entries(entries, comparer)?;
        let dictionary = Self {
            engine: Engine::new("dictionary", store, config),
        };

        let weak = dictionary.engine.downgrade();
        dictionary.engine.with_core(|core| {
            let initial: Vec<(K, V, SlotId)> = core
                .store
                .iter()
                .map(|entry| (entry.key.clone(), entry.value.clone(), entry.slot))
                .collect();
            for (key, value, slot) in initial {
                core.watch(slot, &value, || item_handler(weak.clone(), key, slot));
            }
        });
        Ok(dictionary)
    }

    // --- Single-item Operations ---

    /// Add a new entry.
    pub fn add(&self, key: K, value: V) -> Result<()> {
        check_key(&key)?;
        self.engine.mutate_batch(|core| {
            if core.store.contains(&key) {
                return Err(CollectionError::DuplicateKey(format!("{:?}", key)));
            }
            Ok(Batch::single(self.insert_entry(core, key, value)))
        })
    }

    /// Add a new entry unless the key is taken. Returns whether it was added.
    pub fn try_add(&self, key: K, value: V) -> Result<bool> {
        check_key(&key)?;
        self.engine.mutate(|core| {
            if core.store.contains(&key) {
                return Ok((Batch::empty(), false));
            }
            Ok((Batch::single(self.insert_entry(core, key, value)), true))
        })
    }

    /// Add or replace. A replacement publishes `ItemValueReplaced`.
    pub fn set(&self, key: K, value: V) -> Result<()> {
        check_key(&key)?;
        self.engine.mutate_batch(|core| {
            let record = match self.replace_entry(core, &key, value.clone()) {
                Some(record) => record,
                None => self.insert_entry(core, key, value),
            };
            Ok(Batch::single(record))
        })
    }

    /// Replace the value of an existing key.
    pub fn update(&self, key: K, value: V) -> Result<()> {
        check_key(&key)?;
        self.engine.mutate_batch(|core| match self.replace_entry(core, &key, value) {
            Some(record) => Ok(Batch::single(record)),
            None => Err(CollectionError::KeyNotFound(format!("{:?}", key))),
        })
    }

    /// Replace the value of an existing key. Returns whether the key existed.
    pub fn try_update(&self, key: K, value: V) -> Result<bool> {
        check_key(&key)?;
        self.engine.mutate(|core| match self.replace_entry(core, &key, value) {
            Some(record) => Ok((Batch::single(record), true)),
            None => Ok((Batch::empty(), false)),
        })
    }

    /// Remove an entry. A missing key is a silent no-op.
    pub fn remove(&self, key: &K) -> Result<Option<V>> {
        check_key(key)?;
        self.engine.mutate(|core| match remove_entry(core, key) {
            Some((record, value)) => Ok((Batch::single(record), Some(value))),
            None => Ok((Batch::empty(), None)),
        })
    }

    /// Remove an entry. Returns whether it existed.
    pub fn try_remove(&self, key: &K) -> Result<bool> {
        self.remove(key).map(|removed| removed.is_some())
    }

    /// Move the value stored under `old` to `new`, publishing
    /// `ItemKeyChanged`.
    pub fn change_key(&self, old: &K, new: K) -> Result<()> {
        check_key(old)?;
        check_key(&new)?;
        self.engine.mutate_batch(|core| {
            let Some(value) = core.store.try_get(old).map(|entry| entry.value.clone()) else {
                return Err(CollectionError::KeyNotFound(format!("{:?}", old)));
            };
            if core.store.contains(&new) && !core.store.same_key(old, &new) {
                return Err(CollectionError::DuplicateKey(format!("{:?}", new)));
            }
            let Some(moved) = core.store.rekey(old, new.clone()) else {
                return Ok(Batch::empty());
            };

            core.unwatch(moved.previous_slot);
            let weak = self.engine.downgrade();
            core.watch(moved.slot, &value, || item_handler(weak, new.clone(), moved.slot));

            Ok(Batch::single(DictionaryChange::key_changed(
                new,
                moved.previous_key,
                value,
            )))
        })
    }

    // --- Queries ---

    /// Get the value stored under `key`, or `KeyNotFound`.
    pub fn get(&self, key: &K) -> Result<V> {
        self.try_get(key)?
            .ok_or_else(|| CollectionError::KeyNotFound(format!("{:?}", key)))
    }

    /// Get the value stored under `key`, if any.
    pub fn try_get(&self, key: &K) -> Result<Option<V>> {
        check_key(key)?;
        self.engine
            .read(|core| Ok(core.store.try_get(key).map(|entry| entry.value.clone())))
    }

    /// Check whether `key` is present.
    pub fn contains_key(&self, key: &K) -> Result<bool> {
        check_key(key)?;
        self.engine.read(|core| Ok(core.store.contains(key)))
    }

    /// Snapshot of the keys, in no particular order.
    pub fn keys(&self) -> Result<Vec<K>> {
        self.engine
            .read(|core| Ok(core.store.iter().map(|entry| entry.key.clone()).collect()))
    }

    /// Snapshot of the values, in no particular order.
    pub fn values(&self) -> Result<Vec<V>> {
        self.engine
            .read(|core| Ok(core.store.iter().map(|entry| entry.value.clone()).collect()))
    }

    /// Snapshot of the entries, in no particular order.
    pub fn entries(&self) -> Result<Vec<(K, V)>> {
        self.engine.read(|core| {
            Ok(core
                .store
                .iter()
                .map(|entry| (entry.key.clone(), entry.value.clone()))
                .collect())
        })
    }

    // --- Range Operations ---

    /// Add every entry whose key is free.
    ///
    /// Entries that cannot be added (null or duplicate key) are skipped; the
    /// rest are applied and published, then `PartialBulkFailure` names the
    /// skipped keys.
    pub fn add_range<I>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        bulk_outcome(self.add_entries(entries)?)
    }

    /// Like [`add_range`](Self::add_range) but reports the skipped keys
    /// instead of failing.
    pub fn try_add_range<I>(&self, entries: I) -> Result<(bool, Vec<K>)>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let failed = self.add_entries(entries)?;
        Ok((failed.is_empty(), failed))
    }

    /// Remove every listed key that is present; missing keys are reported
    /// through `PartialBulkFailure`.
    pub fn remove_range<I>(&self, keys: I) -> Result<()>
    where
        I: IntoIterator<Item = K>,
    {
        bulk_outcome(self.remove_keys(keys)?)
    }

    /// Remove every present key; returns `(all removed, missing keys)`.
    pub fn try_remove_range<I>(&self, keys: I) -> Result<(bool, Vec<K>)>
    where
        I: IntoIterator<Item = K>,
    {
        let failed = self.remove_keys(keys)?;
        Ok((failed.is_empty(), failed))
    }

    fn add_entries<I>(&self, entries: I) -> Result<Vec<K>>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        self.engine.mutate(|core| {
            let mut batch = Batch::empty();
            let mut failed = Vec::new();
            for (key, value) in entries {
                if key.is_null() || core.store.contains(&key) {
                    failed.push(key);
                    continue;
                }
                batch.push(self.insert_entry(core, key, value));
            }
            Ok((batch, failed))
        })
    }

    fn remove_keys<I>(&self, keys: I) -> Result<Vec<K>>
    where
        I: IntoIterator<Item = K>,
    {
        self.engine.mutate(|core| {
            let mut batch = Batch::empty();
            let mut failed = Vec::new();
            for key in keys {
                if key.is_null() {
                    failed.push(key);
                    continue;
                }
                match remove_entry(core, &key) {
                    Some((record, _)) => batch.push(record),
                    None => failed.push(key),
                }
            }
            Ok((batch, failed))
        })
    }

    // --- Internals ---

    fn insert_entry(
        &self,
        core: &mut Core<Store<K, V, C>>,
        key: K,
        value: V,
    ) -> DictionaryChange<K, V> {
        let slot = core.store.insert(key.clone(), value.clone());
        let weak = self.engine.downgrade();
        core.watch(slot, &value, || item_handler(weak, key.clone(), slot));
        DictionaryChange::added(key, value)
    }

    fn replace_entry(
        &self,
        core: &mut Core<Store<K, V, C>>,
        key: &K,
        value: V,
    ) -> Option<DictionaryChange<K, V>> {
        let replaced = core.store.replace(key, value.clone())?;
        core.unwatch(replaced.previous_slot);
        let weak = self.engine.downgrade();
        let stored_key = replaced.key.clone();
        core.watch(replaced.slot, &value, || {
            item_handler(weak, stored_key, replaced.slot)
        });
        Some(DictionaryChange::replaced(
            replaced.key,
            value,
            replaced.previous,
        ))
    }
}

impl<K, V, C> ObservableDictionary<K, V, C>
where
    K: Key,
    V: Element + PartialEq,
    C: KeyComparer<K>,
{
    /// Remove every listed entry whose key is present with an equal value.
    /// Pairs that do not match are reported through `PartialBulkFailure`.
    pub fn remove_entries<I>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        bulk_outcome(self.remove_pairs(entries)?)
    }

    /// Remove every matching pair; returns `(all removed, unmatched pairs)`.
    pub fn try_remove_entries<I>(&self, entries: I) -> Result<(bool, Vec<(K, V)>)>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let failed = self.remove_pairs(entries)?;
        Ok((failed.is_empty(), failed))
    }

    fn remove_pairs<I>(&self, entries: I) -> Result<Vec<(K, V)>>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        self.engine.mutate(|core| {
            let mut batch = Batch::empty();
            let mut failed = Vec::new();
            for (key, value) in entries {
                let matches = !key.is_null()
                    && core
                        .store
                        .try_get(&key)
                        .is_some_and(|entry| entry.value == value);
                if !matches {
                    failed.push((key, value));
                    continue;
                }
                if let Some((record, _)) = remove_entry(core, &key) {
                    batch.push(record);
                }
            }
            Ok((batch, failed))
        })
    }
}

fn check_key<K: Key>(key: &K) -> Result<()> {
    if key.is_null() {
        Err(CollectionError::NullArgument("key"))
    } else {
        Ok(())
    }
}

fn bulk_outcome<T: fmt::Debug>(failed: Vec<T>) -> Result<()> {
    if failed.is_empty() {
        Ok(())
    } else {
        Err(CollectionError::partial_bulk_failure(&failed))
    }
}

fn remove_entry<K, V, C>(
    core: &mut Core<Store<K, V, C>>,
    key: &K,
) -> Option<(DictionaryChange<K, V>, V)>
where
    K: Key,
    V: Element,
    C: KeyComparer<K>,
{
    let entry = core.store.delete(key)?;
    core.unwatch(entry.slot);
    Some((
        DictionaryChange::removed(entry.key, entry.value.clone()),
        entry.value,
    ))
}

/// Forwards property changes of the value stored under `key` in `slot`.
fn item_handler<K, V, C>(
    engine: Weak<DictionaryEngine<K, V, C>>,
    key: K,
    slot: SlotId,
) -> PropertyChangedHandler
where
    K: Key,
    V: Element,
    C: KeyComparer<K>,
{
    Arc::new(move |property: &str| {
        let Some(engine) = engine.upgrade() else {
            return Ok(());
        };
        engine.forward_item_change(slot, |store| {
            store
                .value_in_slot(&key, slot)
                .map(|value| DictionaryChange::value_changed(key.clone(), value.clone(), property))
        })
    })
}

impl<K, V, C> ObservableCollection for ObservableDictionary<K, V, C>
where
    K: Key,
    V: Element,
    C: KeyComparer<K>,
{
    type Change = DictionaryChange<K, V>;

    fn notifications(&self) -> &dyn NotificationHub<Self::Change> {
        &*self.engine
    }
}

impl<K, V, C> Drop for ObservableDictionary<K, V, C>
where
    K: Key,
    V: Element,
    C: KeyComparer<K>,
{
    fn drop(&mut self) {
        self.engine.dispose();
    }
}

impl<K, V, C> fmt::Debug for ObservableDictionary<K, V, C>
where
    K: Key,
    V: Element,
    C: KeyComparer<K>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableDictionary")
            .field("len", &self.engine.count())
            .field("lifecycle", &self.engine.lifecycle())
            .finish()
    }
}
