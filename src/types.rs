//! Core types for observable collections.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one stored element occurrence.
///
/// Every insertion gets a fresh slot, so two equal values stored twice are
/// still told apart by the per-item subscription registry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub u64);

impl fmt::Debug for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slot({})", self.0)
    }
}

/// The four independently suppressible notification channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// The full change stream (and the item-changes stream derived from it).
    Changes,
    /// The count stream.
    Counts,
    /// Property changes forwarded from contained elements.
    ItemChanges,
    /// The resets-only stream.
    Resets,
}

impl Channel {
    pub const ALL: [Channel; 4] = [
        Channel::Changes,
        Channel::Counts,
        Channel::ItemChanges,
        Channel::Resets,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            Channel::Changes => 0,
            Channel::Counts => 1,
            Channel::ItemChanges => 2,
            Channel::Resets => 3,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Channel::Changes => "Change",
            Channel::Counts => "Count",
            Channel::ItemChanges => "Item change",
            Channel::Resets => "Reset",
        };
        f.write_str(name)
    }
}

/// Disposal state of a collection. Transitions are monotonic.
///
/// A constructed collection starts `Live`; there is no observable state
/// before construction completes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Lifecycle {
    Live,
    Disposing,
    Disposed,
}

impl Lifecycle {
    pub fn is_live(self) -> bool {
        self == Lifecycle::Live
    }
}

/// A structured description of one mutation, or its reset-collapsed form.
pub trait ChangeRecord: Clone + fmt::Debug + Send + Sync + 'static {
    /// The payload-free reset signal.
    fn reset() -> Self;

    fn is_reset(&self) -> bool;

    /// Whether this record was forwarded from a contained element's own
    /// property change.
    fn is_item_change(&self) -> bool;
}

// --- Dictionary Records ---

/// Kind of a dictionary change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DictionaryChangeKind {
    ItemAdded,
    ItemKeyChanged,
    ItemValueChanged,
    ItemValueReplaced,
    ItemRemoved,
    Reset,
}

/// One dictionary change record.
///
/// A `Reset` record carries no payload; every optional field is `None`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DictionaryChange<K, V> {
    pub kind: DictionaryChangeKind,
    pub key: Option<K>,
    pub value: Option<V>,
    pub previous_value: Option<V>,
    /// Only set for `ItemKeyChanged`.
    pub previous_key: Option<K>,
    /// Only set for `ItemValueChanged`.
    pub changed_property_name: Option<String>,
}

impl<K, V> DictionaryChange<K, V> {
    fn with_kind(kind: DictionaryChangeKind) -> Self {
        Self {
            kind,
            key: None,
            value: None,
            previous_value: None,
            previous_key: None,
            changed_property_name: None,
        }
    }

    pub fn added(key: K, value: V) -> Self {
        Self {
            key: Some(key),
            value: Some(value),
            ..Self::with_kind(DictionaryChangeKind::ItemAdded)
        }
    }

    pub fn removed(key: K, value: V) -> Self {
        Self {
            key: Some(key),
            value: Some(value),
            ..Self::with_kind(DictionaryChangeKind::ItemRemoved)
        }
    }

    pub fn replaced(key: K, value: V, previous_value: V) -> Self {
        Self {
            key: Some(key),
            value: Some(value),
            previous_value: Some(previous_value),
            ..Self::with_kind(DictionaryChangeKind::ItemValueReplaced)
        }
    }

    pub fn key_changed(key: K, previous_key: K, value: V) -> Self {
        Self {
            key: Some(key),
            value: Some(value),
            previous_key: Some(previous_key),
            ..Self::with_kind(DictionaryChangeKind::ItemKeyChanged)
        }
    }

    pub fn value_changed(key: K, value: V, property_name: &str) -> Self {
        Self {
            key: Some(key),
            value: Some(value),
            changed_property_name: Some(property_name.to_string()),
            ..Self::with_kind(DictionaryChangeKind::ItemValueChanged)
        }
    }
}

impl<K, V> ChangeRecord for DictionaryChange<K, V>
where
    K: Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + fmt::Debug + Send + Sync + 'static,
{
    fn reset() -> Self {
        Self::with_kind(DictionaryChangeKind::Reset)
    }

    fn is_reset(&self) -> bool {
        self.kind == DictionaryChangeKind::Reset
    }

    fn is_item_change(&self) -> bool {
        self.kind == DictionaryChangeKind::ItemValueChanged
    }
}

// --- List Records ---

/// Kind of a list change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListChangeKind {
    ItemAdded,
    ItemChanged,
    ItemMoved,
    ItemRemoved,
    Reset,
}

/// One list change record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ListChange<T> {
    pub kind: ListChangeKind,
    pub item: Option<T>,
    pub index: Option<usize>,
    /// Only set for `ItemMoved`.
    pub old_index: Option<usize>,
    /// Only set for `ItemChanged`.
    pub changed_property_name: Option<String>,
}

impl<T> ListChange<T> {
    fn with_kind(kind: ListChangeKind) -> Self {
        Self {
            kind,
            item: None,
            index: None,
            old_index: None,
            changed_property_name: None,
        }
    }

    pub fn added(item: T, index: usize) -> Self {
        Self {
            item: Some(item),
            index: Some(index),
            ..Self::with_kind(ListChangeKind::ItemAdded)
        }
    }

    pub fn removed(item: T, index: usize) -> Self {
        Self {
            item: Some(item),
            index: Some(index),
            ..Self::with_kind(ListChangeKind::ItemRemoved)
        }
    }

    pub fn moved(item: T, old_index: usize, index: usize) -> Self {
        Self {
            item: Some(item),
            index: Some(index),
            old_index: Some(old_index),
            ..Self::with_kind(ListChangeKind::ItemMoved)
        }
    }

    pub fn changed(item: T, index: usize, property_name: &str) -> Self {
        Self {
            item: Some(item),
            index: Some(index),
            changed_property_name: Some(property_name.to_string()),
            ..Self::with_kind(ListChangeKind::ItemChanged)
        }
    }
}

impl<T> ChangeRecord for ListChange<T>
where
    T: Clone + fmt::Debug + Send + Sync + 'static,
{
    fn reset() -> Self {
        Self::with_kind(ListChangeKind::Reset)
    }

    fn is_reset(&self) -> bool {
        self.kind == ListChangeKind::Reset
    }

    fn is_item_change(&self) -> bool {
        self.kind == ListChangeKind::ItemChanged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_carries_no_payload() {
        let reset = DictionaryChange::<i32, String>::reset();
        assert!(reset.is_reset());
        assert!(reset.key.is_none());
        assert!(reset.value.is_none());
        assert!(reset.previous_value.is_none());
        assert!(reset.changed_property_name.is_none());

        let reset = ListChange::<i32>::reset();
        assert!(reset.is_reset());
        assert!(reset.item.is_none() && reset.index.is_none());
    }

    #[test]
    fn test_item_change_kinds() {
        assert!(DictionaryChange::value_changed(1, "a", "Name").is_item_change());
        assert!(!DictionaryChange::replaced(1, "b", "a").is_item_change());
        assert!(!DictionaryChange::added(1, "a").is_item_change());

        assert!(ListChange::changed('x', 0, "Name").is_item_change());
        assert!(!ListChange::moved('x', 0, 2).is_item_change());
    }

    #[test]
    fn test_channel_display() {
        assert_eq!(Channel::ItemChanges.to_string(), "Item change");
        assert_eq!(Channel::ALL.len(), 4);
        for (i, channel) in Channel::ALL.iter().enumerate() {
            assert_eq!(channel.index(), i);
        }
    }

    #[test]
    fn test_lifecycle_is_monotonic_order() {
        assert!(Lifecycle::Live < Lifecycle::Disposing);
        assert!(Lifecycle::Disposing < Lifecycle::Disposed);
        assert!(Lifecycle::Live.is_live());
        assert!(!Lifecycle::Disposed.is_live());
    }
}
