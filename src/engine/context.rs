//! Shared notification context of one collection.

use super::delivery::DeliveryContext;
use super::policy::{Batch, Shape};
use super::suppression::{ReleaseSuppression, SuppressionFlags, SuppressionScope};
use crate::collection::{sealed, NotificationHub};
use crate::config::CollectionConfig;
use crate::error::{CollectionError, Result};
use crate::items::{ChangeAware, ItemSubscriptions, PropertyChangedHandler};
use crate::subscriptions::{
    FaultObserver, Observer, Publication, SubscriptionConfig, SubscriptionHandle, SubscriptionId,
    SubscriptionManager,
};
use crate::types::{ChangeRecord, Channel, Lifecycle, SlotId};
use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::sync::{Arc, Weak};
use tracing::{debug, error};

/// Storage collaborator of a collection.
pub(crate) trait SlotStore: Send + 'static {
    fn len(&self) -> usize;

    fn clear(&mut self);
}

/// Mutable state guarded by the collection's sync root.
pub(crate) struct Core<S> {
    pub(crate) store: S,
    items: ItemSubscriptions,
    suppression: SuppressionFlags,
    threshold: usize,
    escalate_faults: bool,
    lifecycle: Lifecycle,
}

impl<S: SlotStore> Core<S> {
    pub(crate) fn ensure_live(&self) -> Result<()> {
        if self.lifecycle.is_live() {
            Ok(())
        } else {
            Err(CollectionError::ObjectDisposed)
        }
    }

    /// Subscribe to a newly stored value, unless item changes are suppressed
    /// or the value cannot notify.
    pub(crate) fn watch<V, F>(&mut self, slot: SlotId, value: &V, handler: F) -> bool
    where
        V: ChangeAware + ?Sized,
        F: FnOnce() -> PropertyChangedHandler,
    {
        if !self.suppression.is_tracking(Channel::ItemChanges) {
            return false;
        }
        self.items.watch(slot, value, handler)
    }

    /// Tear down the subscription of a value that left the collection.
    pub(crate) fn unwatch(&mut self, slot: SlotId) -> bool {
        self.items.unwatch(slot)
    }

    /// Number of live per-item subscriptions.
    pub(crate) fn watched(&self) -> usize {
        self.items.len()
    }

    /// Shape a batch and filter it through the channel flags.
    ///
    /// The count stream gets the post-operation count once per shaped record,
    /// counted before the changes flag applies.
    fn publication<R: ChangeRecord>(&self, batch: Batch<R>) -> Option<Publication<R>> {
        let (records, reset) = match batch.shape(self.threshold) {
            Shape::Nothing => return None,
            Shape::Individual(records) => (records, false),
            Shape::Reset => (vec![R::reset()], true),
        };

        let counts = if self.suppression.is_tracking(Channel::Counts) {
            vec![self.store.len(); records.len()]
        } else {
            Vec::new()
        };
        let changes = if self.suppression.is_tracking(Channel::Changes) {
            records
        } else {
            Vec::new()
        };
        let resets = usize::from(reset && self.suppression.is_tracking(Channel::Resets));

        Some(Publication {
            changes,
            resets,
            counts,
        })
    }
}

/// The notification engine behind one collection.
///
/// Owns the sync root, the subscribers and the delivery context. Every
/// structural mutation runs under the root; its records are shaped by the
/// threshold policy, filtered by the suppression flags, and handed to the
/// delivery context before the root is released, so deliveries keep
/// mutation order.
pub(crate) struct Engine<S, R> {
    name: &'static str,
    root: ReentrantMutex<RefCell<Core<S>>>,
    subscriptions: Arc<SubscriptionManager<R>>,
    delivery: Option<Arc<dyn DeliveryContext>>,
    me: Weak<Self>,
}

impl<S: SlotStore, R: ChangeRecord> Engine<S, R> {
    pub(crate) fn new(name: &'static str, store: S, config: CollectionConfig) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            name,
            root: ReentrantMutex::new(RefCell::new(Core {
                store,
                items: ItemSubscriptions::new(),
                suppression: SuppressionFlags::default(),
                threshold: config.reset_threshold,
                escalate_faults: config.escalate_subscriber_faults,
                lifecycle: Lifecycle::Live,
            })),
            subscriptions: Arc::new(SubscriptionManager::new()),
            delivery: config.delivery,
            me: me.clone(),
        })
    }

    /// Read live state under the root.
    pub(crate) fn read<T>(&self, f: impl FnOnce(&Core<S>) -> Result<T>) -> Result<T> {
        let guard = self.root.lock();
        let core = guard.borrow();
        core.ensure_live()?;
        f(&core)
    }

    /// Touch the core without a liveness check or publication. Used to attach
    /// subscriptions to initial contents.
    pub(crate) fn with_core<T>(&self, f: impl FnOnce(&mut Core<S>) -> T) -> T {
        let guard = self.root.lock();
        let mut core = guard.borrow_mut();
        f(&mut core)
    }

    /// Apply a mutation and publish the batch it produced.
    ///
    /// `f` must leave the store untouched when it returns an error.
    pub(crate) fn mutate<T>(
        &self,
        f: impl FnOnce(&mut Core<S>) -> Result<(Batch<R>, T)>,
    ) -> Result<T> {
        let guard = self.root.lock();
        let (publication, escalate, output) = {
            let mut core = guard.borrow_mut();
            core.ensure_live()?;
            let (batch, output) = f(&mut core)?;
            (core.publication(batch), core.escalate_faults, output)
        };

        if let Some(publication) = publication {
            self.dispatch(publication, escalate)?;
        }
        Ok(output)
    }

    /// Apply a mutation that returns nothing but its batch.
    pub(crate) fn mutate_batch(
        &self,
        f: impl FnOnce(&mut Core<S>) -> Result<Batch<R>>,
    ) -> Result<()> {
        self.mutate(|core| f(core).map(|batch| (batch, ())))
    }

    /// Publish a property change forwarded from the element in `slot`.
    ///
    /// Silently ignored when the slot is no longer watched, item changes are
    /// suppressed, or the collection is being disposed.
    pub(crate) fn forward_item_change(
        &self,
        slot: SlotId,
        build: impl FnOnce(&S) -> Option<R>,
    ) -> Result<()> {
        let guard = self.root.lock();
        let (publication, escalate) = {
            let core = guard.borrow();
            if !core.lifecycle.is_live()
                || !core.items.contains(slot)
                || !core.suppression.is_tracking(Channel::ItemChanges)
            {
                return Ok(());
            }
            let Some(record) = build(&core.store) else {
                return Ok(());
            };
            (core.publication(Batch::single(record)), core.escalate_faults)
        };

        match publication {
            Some(publication) => self.dispatch(publication, escalate),
            None => Ok(()),
        }
    }

    /// Handle to the engine for per-item handlers.
    pub(crate) fn downgrade(&self) -> Weak<Self> {
        self.me.clone()
    }

    fn dispatch(&self, publication: Publication<R>, escalate: bool) -> Result<()> {
        if publication.is_empty() {
            return Ok(());
        }
        match &self.delivery {
            None => self.subscriptions.deliver(&publication, escalate),
            Some(context) => {
                let subscriptions = Arc::clone(&self.subscriptions);
                let name = self.name;
                context.schedule(Box::new(move || {
                    if let Err(e) = subscriptions.deliver(&publication, escalate) {
                        error!(collection = name, error = %e, "subscriber fault on delivery context");
                    }
                }));
                Ok(())
            }
        }
    }

    fn ensure_live(&self) -> Result<()> {
        self.root.lock().borrow().ensure_live()
    }
}

impl<S, R> sealed::Sealed for Engine<S, R> {}

impl<S: SlotStore, R: ChangeRecord> NotificationHub<R> for Engine<S, R> {
    fn count(&self) -> usize {
        self.root.lock().borrow().store.len()
    }

    fn lifecycle(&self) -> Lifecycle {
        self.root.lock().borrow().lifecycle
    }

    fn dispose(&self) {
        let guard = self.root.lock();
        let detached = {
            let mut core = guard.borrow_mut();
            if core.lifecycle != Lifecycle::Live {
                return;
            }
            core.lifecycle = Lifecycle::Disposing;
            core.items.take_all()
        };

        debug!(collection = self.name, item_subscriptions = detached.len(), "disposing");
        drop(detached);
        self.subscriptions.clear();

        guard.borrow_mut().lifecycle = Lifecycle::Disposed;
    }

    fn clear(&self) -> Result<()> {
        self.mutate_batch(|core| {
            let detached = core.items.take_all();
            core.store.clear();
            drop(detached);
            Ok(Batch::reset())
        })
    }

    fn reset(&self) -> Result<()> {
        self.mutate_batch(|_| Ok(Batch::reset()))
    }

    fn reset_threshold(&self) -> Result<usize> {
        self.read(|core| Ok(core.threshold))
    }

    fn set_reset_threshold(&self, threshold: usize) -> Result<()> {
        let guard = self.root.lock();
        let mut core = guard.borrow_mut();
        core.ensure_live()?;
        core.threshold = threshold;
        Ok(())
    }

    fn escalates_subscriber_faults(&self) -> Result<bool> {
        self.read(|core| Ok(core.escalate_faults))
    }

    fn set_escalate_subscriber_faults(&self, escalate: bool) -> Result<()> {
        let guard = self.root.lock();
        let mut core = guard.borrow_mut();
        core.ensure_live()?;
        core.escalate_faults = escalate;
        Ok(())
    }

    fn is_tracking(&self, channel: Channel) -> Result<bool> {
        self.read(|core| Ok(core.suppression.is_tracking(channel)))
    }

    fn suppress(&self, channel: Channel, signal_on_release: bool) -> Result<SuppressionScope> {
        let target = self.me.upgrade().ok_or(CollectionError::ObjectDisposed)?;
        let guard = self.root.lock();
        let mut core = guard.borrow_mut();
        core.ensure_live()?;
        core.suppression.acquire(channel)?;
        debug!(collection = self.name, %channel, signal_on_release, "suppression acquired");
        Ok(SuppressionScope::new(target, channel, signal_on_release))
    }

    fn subscribe_changes(&self, observer: Observer<R>) -> Result<SubscriptionId> {
        self.ensure_live()?;
        Ok(self.subscriptions.subscribe_changes(observer))
    }

    fn subscribe_item_changes(&self, observer: Observer<R>) -> Result<SubscriptionId> {
        self.ensure_live()?;
        Ok(self.subscriptions.subscribe_item_changes(observer))
    }

    fn subscribe_counts(&self, observer: Observer<usize>) -> Result<SubscriptionId> {
        self.ensure_live()?;
        Ok(self.subscriptions.subscribe_counts(observer))
    }

    fn subscribe_resets(&self, observer: Observer<()>) -> Result<SubscriptionId> {
        self.ensure_live()?;
        Ok(self.subscriptions.subscribe_resets(observer))
    }

    fn subscribe_faults(&self, observer: FaultObserver) -> Result<SubscriptionId> {
        self.ensure_live()?;
        Ok(self.subscriptions.subscribe_faults(observer))
    }

    fn changes_feed(&self, config: SubscriptionConfig) -> Result<SubscriptionHandle<R>> {
        self.ensure_live()?;
        Ok(self.subscriptions.changes_feed(config))
    }

    fn item_changes_feed(&self, config: SubscriptionConfig) -> Result<SubscriptionHandle<R>> {
        self.ensure_live()?;
        Ok(self.subscriptions.item_changes_feed(config))
    }

    fn count_feed(&self, config: SubscriptionConfig) -> Result<SubscriptionHandle<usize>> {
        self.ensure_live()?;
        Ok(self.subscriptions.count_feed(config))
    }

    fn reset_feed(&self, config: SubscriptionConfig) -> Result<SubscriptionHandle<()>> {
        self.ensure_live()?;
        Ok(self.subscriptions.reset_feed(config))
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscriptions.unsubscribe(id)
    }

    fn subscription_count(&self) -> usize {
        self.subscriptions.subscription_count()
    }

    fn item_subscription_count(&self) -> usize {
        self.root.lock().borrow().watched()
    }
}

impl<S: SlotStore, R: ChangeRecord> ReleaseSuppression for Engine<S, R> {
    fn release_suppression(&self, channel: Channel, signal_on_release: bool) -> Result<()> {
        let guard = self.root.lock();
        let (publication, escalate) = {
            let mut core = guard.borrow_mut();
            core.ensure_live()?;
            core.suppression.release(channel);
            debug!(collection = self.name, %channel, signal_on_release, "suppression released");

            if !signal_on_release {
                return Ok(());
            }
            let publication = match channel {
                Channel::Changes | Channel::ItemChanges => core.publication(Batch::reset()),
                Channel::Counts => Some(Publication::count_only(core.store.len())),
                Channel::Resets => Some(Publication::reset_only()),
            };
            (publication, core.escalate_faults)
        };

        match publication {
            Some(publication) => self.dispatch(publication, escalate),
            None => Ok(()),
        }
    }
}
