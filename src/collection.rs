//! Behaviour shared by every observable collection.

use crate::engine::SuppressionScope;
use crate::error::{ObserverResult, Result};
use crate::subscriptions::{
    FaultObserver, Observer, ObserverFault, SubscriptionConfig, SubscriptionHandle, SubscriptionId,
};
use crate::types::{ChangeRecord, Channel, Lifecycle};
use std::sync::Arc;

pub(crate) mod sealed {
    pub trait Sealed {}
}

/// The notification engine behind a collection.
///
/// Implemented by this crate only. Most callers use the provided methods of
/// [`ObservableCollection`] instead.
pub trait NotificationHub<R: ChangeRecord>: sealed::Sealed + Send + Sync {
    /// Current element count. Safe to query after disposal.
    fn count(&self) -> usize;

    fn lifecycle(&self) -> Lifecycle;

    /// Tear down every item subscription and subscriber. Idempotent.
    fn dispose(&self);

    fn clear(&self) -> Result<()>;

    fn reset(&self) -> Result<()>;

    fn reset_threshold(&self) -> Result<usize>;

    fn set_reset_threshold(&self, threshold: usize) -> Result<()>;

    fn escalates_subscriber_faults(&self) -> Result<bool>;

    fn set_escalate_subscriber_faults(&self, escalate: bool) -> Result<()>;

    fn is_tracking(&self, channel: Channel) -> Result<bool>;

    fn suppress(&self, channel: Channel, signal_on_release: bool) -> Result<SuppressionScope>;

    fn subscribe_changes(&self, observer: Observer<R>) -> Result<SubscriptionId>;

    fn subscribe_item_changes(&self, observer: Observer<R>) -> Result<SubscriptionId>;

    fn subscribe_counts(&self, observer: Observer<usize>) -> Result<SubscriptionId>;

    fn subscribe_resets(&self, observer: Observer<()>) -> Result<SubscriptionId>;

    fn subscribe_faults(&self, observer: FaultObserver) -> Result<SubscriptionId>;

    fn changes_feed(&self, config: SubscriptionConfig) -> Result<SubscriptionHandle<R>>;

    fn item_changes_feed(&self, config: SubscriptionConfig) -> Result<SubscriptionHandle<R>>;

    fn count_feed(&self, config: SubscriptionConfig) -> Result<SubscriptionHandle<usize>>;

    fn reset_feed(&self, config: SubscriptionConfig) -> Result<SubscriptionHandle<()>>;

    fn unsubscribe(&self, id: SubscriptionId) -> bool;

    /// Subscribers across all channels, fault observers included.
    fn subscription_count(&self) -> usize;

    /// Live subscriptions to contained elements.
    fn item_subscription_count(&self) -> usize;
}

/// A collection that publishes its mutations as change records.
///
/// After disposal only `len`, `is_empty`, `is_disposed`, `is_disposing`,
/// `dispose` and `unsubscribe` remain usable; everything else fails with
/// `ObjectDisposed`.
pub trait ObservableCollection {
    type Change: ChangeRecord;

    /// The engine that owns this collection's channels.
    fn notifications(&self) -> &dyn NotificationHub<Self::Change>;

    // --- Lifecycle ---

    fn len(&self) -> usize {
        self.notifications().count()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_disposed(&self) -> bool {
        self.notifications().lifecycle() == Lifecycle::Disposed
    }

    fn is_disposing(&self) -> bool {
        self.notifications().lifecycle() == Lifecycle::Disposing
    }

    fn dispose(&self) {
        self.notifications().dispose()
    }

    // --- Bulk ---

    /// Remove everything and publish a reset.
    fn clear(&self) -> Result<()> {
        self.notifications().clear()
    }

    /// Publish a reset without changing anything.
    fn reset(&self) -> Result<()> {
        self.notifications().reset()
    }

    // --- Settings ---

    fn reset_threshold(&self) -> Result<usize> {
        self.notifications().reset_threshold()
    }

    fn set_reset_threshold(&self, threshold: usize) -> Result<()> {
        self.notifications().set_reset_threshold(threshold)
    }

    fn escalates_subscriber_faults(&self) -> Result<bool> {
        self.notifications().escalates_subscriber_faults()
    }

    fn set_escalate_subscriber_faults(&self, escalate: bool) -> Result<()> {
        self.notifications().set_escalate_subscriber_faults(escalate)
    }

    // --- Suppression ---

    fn is_tracking(&self, channel: Channel) -> Result<bool> {
        self.notifications().is_tracking(channel)
    }

    /// Suppress the full change stream (and the item-changes stream).
    fn suppress_notifications(&self, signal_on_release: bool) -> Result<SuppressionScope> {
        self.notifications()
            .suppress(Channel::Changes, signal_on_release)
    }

    fn suppress_count_notifications(&self, signal_on_release: bool) -> Result<SuppressionScope> {
        self.notifications()
            .suppress(Channel::Counts, signal_on_release)
    }

    /// Suppress forwarding of element property changes. Elements added while
    /// suppressed are not subscribed.
    fn suppress_item_change_notifications(
        &self,
        signal_on_release: bool,
    ) -> Result<SuppressionScope> {
        self.notifications()
            .suppress(Channel::ItemChanges, signal_on_release)
    }

    fn suppress_reset_notifications(&self, signal_on_release: bool) -> Result<SuppressionScope> {
        self.notifications()
            .suppress(Channel::Resets, signal_on_release)
    }

    // --- Subscriptions ---

    fn subscribe_changes<F>(&self, observer: F) -> Result<SubscriptionId>
    where
        F: Fn(&Self::Change) -> ObserverResult + Send + Sync + 'static,
    {
        self.notifications().subscribe_changes(Arc::new(observer))
    }

    fn subscribe_item_changes<F>(&self, observer: F) -> Result<SubscriptionId>
    where
        F: Fn(&Self::Change) -> ObserverResult + Send + Sync + 'static,
    {
        self.notifications()
            .subscribe_item_changes(Arc::new(observer))
    }

    fn subscribe_counts<F>(&self, observer: F) -> Result<SubscriptionId>
    where
        F: Fn(usize) -> ObserverResult + Send + Sync + 'static,
    {
        self.notifications()
            .subscribe_counts(Arc::new(move |count: &usize| observer(*count)))
    }

    fn subscribe_resets<F>(&self, observer: F) -> Result<SubscriptionId>
    where
        F: Fn() -> ObserverResult + Send + Sync + 'static,
    {
        self.notifications()
            .subscribe_resets(Arc::new(move |_: &()| observer()))
    }

    /// Observe subscriber faults. Set `handled` to keep a fault from being
    /// re-raised out of the mutation call.
    fn subscribe_faults<F>(&self, observer: F) -> Result<SubscriptionId>
    where
        F: Fn(&mut ObserverFault) + Send + Sync + 'static,
    {
        self.notifications().subscribe_faults(Arc::new(observer))
    }

    fn changes_feed(&self, config: SubscriptionConfig) -> Result<SubscriptionHandle<Self::Change>> {
        self.notifications().changes_feed(config)
    }

    fn item_changes_feed(
        &self,
        config: SubscriptionConfig,
    ) -> Result<SubscriptionHandle<Self::Change>> {
        self.notifications().item_changes_feed(config)
    }

    fn count_feed(&self, config: SubscriptionConfig) -> Result<SubscriptionHandle<usize>> {
        self.notifications().count_feed(config)
    }

    fn reset_feed(&self, config: SubscriptionConfig) -> Result<SubscriptionHandle<()>> {
        self.notifications().reset_feed(config)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.notifications().unsubscribe(id)
    }
}
