//! Side-table of live per-element subscriptions.

use super::notify::{ChangeAware, PropertyChangedHandler, PropertySubscription};
use crate::types::SlotId;
use std::collections::HashMap;

/// One forwarding subscription per contained, notification-capable element.
///
/// Entries are keyed by slot identity rather than value equality, so the
/// same value stored twice holds two independent subscriptions.
#[derive(Debug, Default)]
pub(crate) struct ItemSubscriptions {
    live: HashMap<SlotId, PropertySubscription>,
}

impl ItemSubscriptions {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Subscribe to `value` if it exposes the capability.
    ///
    /// The handler factory only runs for capable values. Returns whether a
    /// subscription was registered.
    pub(crate) fn watch<V, F>(&mut self, slot: SlotId, value: &V, handler: F) -> bool
    where
        V: ChangeAware + ?Sized,
        F: FnOnce() -> PropertyChangedHandler,
    {
        let Some(notifier) = value.property_notifier() else {
            return false;
        };
        let subscription = notifier.subscribe_property_changed(handler());
        // A replaced subscription for the same slot is torn down on drop.
        self.live.insert(slot, subscription);
        true
    }

    /// Tear down the subscription of one slot, if any.
    pub(crate) fn unwatch(&mut self, slot: SlotId) -> bool {
        self.live.remove(&slot).is_some()
    }

    /// Detach every subscription. The caller decides when they are dropped.
    pub(crate) fn take_all(&mut self) -> Vec<PropertySubscription> {
        self.live.drain().map(|(_, subscription)| subscription).collect()
    }

    pub(crate) fn contains(&self, slot: SlotId) -> bool {
        self.live.contains_key(&slot)
    }

    pub(crate) fn len(&self) -> usize {
        self.live.len()
    }
}
