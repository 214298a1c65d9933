//! Observable list.

use super::store::ListStore;
use crate::collection::{NotificationHub, ObservableCollection};
use crate::config::CollectionConfig;
use crate::engine::{Batch, Core, Engine, SlotStore};
use crate::error::{CollectionError, Result};
use crate::items::{Element, PropertyChangedHandler};
use crate::types::{ListChange, SlotId};
use std::fmt;
use std::sync::{Arc, Weak};

type ListEngine<T> = Engine<ListStore<T>, ListChange<T>>;

/// An ordered collection that publishes every mutation.
///
/// Indexes in published records are positions at the time of the
/// individual change, so replaying a batch of records in order reproduces
/// the list.
pub struct ObservableList<T: Element> {
    engine: Arc<ListEngine<T>>,
}

impl<T: Element> ObservableList<T> {
    /// Create an empty list with the default config.
    pub fn new() -> Self {
        Self::with_config(CollectionConfig::default())
    }

    /// Create an empty list.
    pub fn with_config(config: CollectionConfig) -> Self {
        Self {
            engine: Engine::new("list", ListStore::new(), config),
        }
    }

    /// List holding `items`, with notification-capable items subscribed.
    pub fn from_items<I>(items: I, config: CollectionConfig) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let list = Self {
            engine: Engine::new("list", ListStore::from_items(items), config),
        };

        let weak = list.engine.downgrade();
        list.engine.with_core(|core| {
            let initial: Vec<(SlotId, T)> = core
                .store
                .iter()
                .map(|slot| (slot.id, slot.item.clone()))
                .collect();
            for (slot, item) in initial {
                core.watch(slot, &item, || item_handler(weak.clone(), slot));
            }
        });
        list
    }

    // --- Mutations ---

    /// Append an item at the end.
    pub fn push(&self, item: T) -> Result<()> {
        self.engine.mutate_batch(|core| {
            let index = core.store.len();
            Ok(Batch::single(self.insert_item(core, index, item)))
        })
    }

    /// Insert at `index`; `index == len` appends.
    pub fn insert(&self, index: usize, item: T) -> Result<()> {
        self.engine.mutate_batch(|core| {
            check_insert_index(core, index)?;
            Ok(Batch::single(self.insert_item(core, index, item)))
        })
    }

    /// Append every item as one logical operation.
    pub fn add_range<I>(&self, items: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
    {
        self.engine.mutate_batch(|core| {
            let mut batch = Batch::empty();
            for item in items {
                let index = core.store.len();
                batch.push(self.insert_item(core, index, item));
            }
            Ok(batch)
        })
    }

    /// Insert every item starting at `index`, keeping their order.
    pub fn insert_range<I>(&self, index: usize, items: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
    {
        self.engine.mutate_batch(|core| {
            check_insert_index(core, index)?;
            let mut batch = Batch::empty();
            for (offset, item) in items.into_iter().enumerate() {
                batch.push(self.insert_item(core, index + offset, item));
            }
            Ok(batch)
        })
    }

    /// Replace the item at `index`, publishing `ItemRemoved` then
    /// `ItemAdded` at that index. Returns the displaced item.
    pub fn set(&self, index: usize, item: T) -> Result<T> {
        self.engine.mutate(|core| {
            check_index(core, index)?;
            let (previous, slot) = core.store.replace(index, item.clone());
            core.unwatch(previous.id);
            let weak = self.engine.downgrade();
            core.watch(slot, &item, || item_handler(weak, slot));

            let batch = Batch::from(vec![
                ListChange::removed(previous.item.clone(), index),
                ListChange::added(item, index),
            ]);
            Ok((batch, previous.item))
        })
    }

    /// Move the item at `from` so it ends up at `to`.
    pub fn move_item(&self, from: usize, to: usize) -> Result<()> {
        self.engine.mutate_batch(|core| {
            check_index(core, from)?;
            check_index(core, to)?;
            if from == to {
                return Ok(Batch::empty());
            }
            core.store.move_item(from, to);
            let item = core.store.get(to).cloned();
            Ok(match item {
                Some(item) => Batch::single(ListChange::moved(item, from, to)),
                None => Batch::empty(),
            })
        })
    }

    /// Remove and return the item at `index`.
    pub fn remove_at(&self, index: usize) -> Result<T> {
        self.engine.mutate(|core| {
            check_index(core, index)?;
            let (record, item) = remove_item(core, index);
            Ok((Batch::single(record), item))
        })
    }

    // --- Queries ---

    /// Get the item at `index`.
    pub fn get(&self, index: usize) -> Result<T> {
        self.engine.read(|core| {
            core.store.get(index).cloned().ok_or(CollectionError::IndexOutOfRange {
                index,
                len: core.store.len(),
            })
        })
    }

    /// Snapshot of the items in order.
    pub fn to_vec(&self) -> Result<Vec<T>> {
        self.engine
            .read(|core| Ok(core.store.iter().map(|slot| slot.item.clone()).collect()))
    }

    fn insert_item(&self, core: &mut Core<ListStore<T>>, index: usize, item: T) -> ListChange<T> {
        let slot = core.store.insert(index, item.clone());
        let weak = self.engine.downgrade();
        core.watch(slot, &item, || item_handler(weak, slot));
        ListChange::added(item, index)
    }
}

impl<T: Element + PartialEq> ObservableList<T> {
    /// Remove the first item equal to `item`. Returns whether one was found.
    pub fn remove(&self, item: &T) -> Result<bool> {
        self.engine.mutate(|core| match core.store.index_of(item) {
            Some(index) => {
                let (record, _) = remove_item(core, index);
                Ok((Batch::single(record), true))
            }
            None => Ok((Batch::empty(), false)),
        })
    }

    /// Remove the first occurrence of every listed item.
    ///
    /// Items that are not present are skipped; the rest are removed and
    /// published, then `PartialBulkFailure` names the skipped items.
    pub fn remove_range<I>(&self, items: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
    {
        let failed = self.remove_items(items)?;
        if failed.is_empty() {
            Ok(())
        } else {
            Err(CollectionError::partial_bulk_failure(&failed))
        }
    }

    /// Remove the first occurrence of each item; returns `(all removed, missing items)`.
    pub fn try_remove_range<I>(&self, items: I) -> Result<(bool, Vec<T>)>
    where
        I: IntoIterator<Item = T>,
    {
        let failed = self.remove_items(items)?;
        Ok((failed.is_empty(), failed))
    }

    /// Check whether the list holds an item equal to `item`.
    pub fn contains(&self, item: &T) -> Result<bool> {
        self.index_of(item).map(|index| index.is_some())
    }

    /// Position of the first item equal to `item`.
    pub fn index_of(&self, item: &T) -> Result<Option<usize>> {
        self.engine.read(|core| Ok(core.store.index_of(item)))
    }

    fn remove_items<I>(&self, items: I) -> Result<Vec<T>>
    where
        I: IntoIterator<Item = T>,
    {
        self.engine.mutate(|core| {
            let mut batch = Batch::empty();
            let mut failed = Vec::new();
            for item in items {
                match core.store.index_of(&item) {
                    Some(index) => batch.push(remove_item(core, index).0),
                    None => failed.push(item),
                }
            }
            Ok((batch, failed))
        })
    }
}

impl<T: Element> Default for ObservableList<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn check_index<T: Element>(core: &Core<ListStore<T>>, index: usize) -> Result<()> {
    let len = core.store.len();
    if index < len {
        Ok(())
    } else {
        Err(CollectionError::IndexOutOfRange { index, len })
    }
}

fn check_insert_index<T: Element>(core: &Core<ListStore<T>>, index: usize) -> Result<()> {
    let len = core.store.len();
    if index <= len {
        Ok(())
    } else {
        Err(CollectionError::IndexOutOfRange { index, len })
    }
}

fn remove_item<T: Element>(core: &mut Core<ListStore<T>>, index: usize) -> (ListChange<T>, T) {
    let slot = core.store.remove(index);
    core.unwatch(slot.id);
    (ListChange::removed(slot.item.clone(), index), slot.item)
}

/// Forwards property changes of the item inserted into `slot`, reported at
/// its current position.
fn item_handler<T: Element>(engine: Weak<ListEngine<T>>, slot: SlotId) -> PropertyChangedHandler {
    Arc::new(move |property: &str| {
        let Some(engine) = engine.upgrade() else {
            return Ok(());
        };
        engine.forward_item_change(slot, |store| {
            let index = store.position_of(slot)?;
            let item = store.get(index)?;
            Some(ListChange::changed(item.clone(), index, property))
        })
    })
}

impl<T: Element> ObservableCollection for ObservableList<T> {
    type Change = ListChange<T>;

    fn notifications(&self) -> &dyn NotificationHub<Self::Change> {
        &*self.engine
    }
}

impl<T: Element> Drop for ObservableList<T> {
    fn drop(&mut self) {
        self.engine.dispose();
    }
}

impl<T: Element> fmt::Debug for ObservableList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableList")
            .field("len", &self.engine.count())
            .field("lifecycle", &self.engine.lifecycle())
            .finish()
    }
}
