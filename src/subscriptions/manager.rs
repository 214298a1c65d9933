//! Subscription manager fanning change records out to the channels.

use crate::error::{CollectionError, Result};
use crate::types::{ChangeRecord, Channel};
use crossbeam_channel::{bounded, Sender};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace, warn};

use super::types::{
    FaultObserver, Observer, ObserverFault, SubscriptionConfig, SubscriptionHandle, SubscriptionId,
};

/// What one logical operation delivers, already shaped by the threshold
/// policy and filtered by the suppression flags.
#[derive(Clone, Debug)]
pub(crate) struct Publication<R> {
    /// Records for the full change stream.
    pub(crate) changes: Vec<R>,
    /// Unit signals for the resets stream.
    pub(crate) resets: usize,
    /// Post-operation count, once per record of the operation.
    pub(crate) counts: Vec<usize>,
}

impl<R> Publication<R> {
    pub(crate) fn count_only(count: usize) -> Self {
        Self {
            changes: Vec::new(),
            resets: 0,
            counts: vec![count],
        }
    }

    pub(crate) fn reset_only() -> Self {
        Self {
            changes: Vec::new(),
            resets: 1,
            counts: Vec::new(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.resets == 0 && self.counts.is_empty()
    }
}

enum Subscriber<T> {
    Callback(Observer<T>),
    Feed(Sender<T>),
}

impl<T> Clone for Subscriber<T> {
    fn clone(&self) -> Self {
        match self {
            Subscriber::Callback(observer) => Subscriber::Callback(observer.clone()),
            Subscriber::Feed(sender) => Subscriber::Feed(sender.clone()),
        }
    }
}

/// Internal subscription state.
struct Subscription<T> {
    id: SubscriptionId,
    subscriber: Subscriber<T>,
}

impl<T> Clone for Subscription<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            subscriber: self.subscriber.clone(),
        }
    }
}

/// Subscribers of one primary channel.
struct ObserverList<T> {
    channel: Channel,
    subscriptions: RwLock<Vec<Subscription<T>>>,
}

impl<T: Clone> ObserverList<T> {
    fn new(channel: Channel) -> Self {
        Self {
            channel,
            subscriptions: RwLock::new(Vec::new()),
        }
    }

    fn add(&self, id: SubscriptionId, subscriber: Subscriber<T>) {
        self.subscriptions
            .write()
            .push(Subscription { id, subscriber });
    }

    fn remove(&self, id: SubscriptionId) -> bool {
        let mut subs = self.subscriptions.write();
        let before = subs.len();
        subs.retain(|sub| sub.id != id);
        subs.len() != before
    }

    fn len(&self) -> usize {
        self.subscriptions.read().len()
    }

    fn clear(&self) {
        self.subscriptions.write().clear();
    }

    /// Deliver one value to every subscriber, in subscription order.
    ///
    /// Works on a snapshot so subscribers may (un)subscribe while being
    /// notified. Feeds that overflow or lost their receiver are dropped.
    fn notify(&self, value: &T, on_fault: &mut dyn FnMut(ObserverFault)) {
        let snapshot: Vec<Subscription<T>> = self.subscriptions.read().clone();
        let mut to_remove = Vec::new();

        for sub in &snapshot {
            match &sub.subscriber {
                Subscriber::Callback(observer) => {
                    if let Err(e) = observer(value) {
                        on_fault(ObserverFault::new(e, self.channel));
                    }
                }
                Subscriber::Feed(sender) => match sender.try_send(value.clone()) {
                    Ok(()) => {}
                    Err(crossbeam_channel::TrySendError::Full(_)) => {
                        warn!(channel = %self.channel, id = sub.id.0, "dropping feed: buffer overflow");
                        to_remove.push(sub.id);
                    }
                    Err(crossbeam_channel::TrySendError::Disconnected(_)) => {
                        debug!(channel = %self.channel, id = sub.id.0, "dropping feed: receiver gone");
                        to_remove.push(sub.id);
                    }
                },
            }
        }

        if !to_remove.is_empty() {
            self.subscriptions
                .write()
                .retain(|sub| !to_remove.contains(&sub.id));
        }
    }
}

/// Manages the subscribers of one collection.
///
/// Four primary channels share one record stream:
/// - changes: every record
/// - item changes: records forwarded from element property changes
/// - counts: the post-operation count, once per record
/// - resets: a unit signal per reset
///
/// A fault side-channel receives every error a primary subscriber returns.
pub(crate) struct SubscriptionManager<R> {
    changes: ObserverList<R>,
    item_changes: ObserverList<R>,
    counts: ObserverList<usize>,
    resets: ObserverList<()>,
    faults: RwLock<Vec<(SubscriptionId, FaultObserver)>>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
}

impl<R: ChangeRecord> SubscriptionManager<R> {
    pub(crate) fn new() -> Self {
        Self {
            changes: ObserverList::new(Channel::Changes),
            item_changes: ObserverList::new(Channel::ItemChanges),
            counts: ObserverList::new(Channel::Counts),
            resets: ObserverList::new(Channel::Resets),
            faults: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn feed<T: Clone>(
        &self,
        list: &ObserverList<T>,
        config: SubscriptionConfig,
    ) -> SubscriptionHandle<T> {
        let id = self.next_id();
        let (sender, receiver) = bounded(config.buffer_size);
        list.add(id, Subscriber::Feed(sender));
        SubscriptionHandle { id, receiver }
    }

    pub(crate) fn subscribe_changes(&self, observer: Observer<R>) -> SubscriptionId {
        let id = self.next_id();
        self.changes.add(id, Subscriber::Callback(observer));
        id
    }

    pub(crate) fn subscribe_item_changes(&self, observer: Observer<R>) -> SubscriptionId {
        let id = self.next_id();
        self.item_changes.add(id, Subscriber::Callback(observer));
        id
    }

    pub(crate) fn subscribe_counts(&self, observer: Observer<usize>) -> SubscriptionId {
        let id = self.next_id();
        self.counts.add(id, Subscriber::Callback(observer));
        id
    }

    pub(crate) fn subscribe_resets(&self, observer: Observer<()>) -> SubscriptionId {
        let id = self.next_id();
        self.resets.add(id, Subscriber::Callback(observer));
        id
    }

    pub(crate) fn subscribe_faults(&self, observer: FaultObserver) -> SubscriptionId {
        let id = self.next_id();
        self.faults.write().push((id, observer));
        id
    }

    pub(crate) fn changes_feed(&self, config: SubscriptionConfig) -> SubscriptionHandle<R> {
        self.feed(&self.changes, config)
    }

    pub(crate) fn item_changes_feed(&self, config: SubscriptionConfig) -> SubscriptionHandle<R> {
        self.feed(&self.item_changes, config)
    }

    pub(crate) fn count_feed(&self, config: SubscriptionConfig) -> SubscriptionHandle<usize> {
        self.feed(&self.counts, config)
    }

    pub(crate) fn reset_feed(&self, config: SubscriptionConfig) -> SubscriptionHandle<()> {
        self.feed(&self.resets, config)
    }

    /// Unsubscribe from whichever channel owns `id`.
    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        if self.changes.remove(id)
            || self.item_changes.remove(id)
            || self.counts.remove(id)
            || self.resets.remove(id)
        {
            return true;
        }
        let mut faults = self.faults.write();
        let before = faults.len();
        faults.retain(|(fault_id, _)| *fault_id != id);
        faults.len() != before
    }

    /// Get subscription count across all channels.
    pub(crate) fn subscription_count(&self) -> usize {
        self.changes.len()
            + self.item_changes.len()
            + self.counts.len()
            + self.resets.len()
            + self.faults.read().len()
    }

    /// Drop every subscriber. Feed receivers observe a disconnect.
    pub(crate) fn clear(&self) {
        self.changes.clear();
        self.item_changes.clear();
        self.counts.clear();
        self.resets.clear();
        self.faults.write().clear();
    }

    // --- Delivery ---

    /// Deliver a publication to every channel.
    ///
    /// Each subscriber error goes to the fault side-channel right away. With
    /// `escalate`, the first fault nobody marked handled is returned once the
    /// whole publication has been delivered.
    pub(crate) fn deliver(&self, publication: &Publication<R>, escalate: bool) -> Result<()> {
        trace!(
            changes = publication.changes.len(),
            resets = publication.resets,
            counts = publication.counts.len(),
            "delivering publication"
        );

        let mut unhandled: Option<CollectionError> = None;
        let mut on_fault = |fault: ObserverFault| {
            if let Some(fault) = self.raise_fault(fault) {
                if escalate && unhandled.is_none() {
                    unhandled = Some(fault.into_error());
                }
            }
        };

        for change in &publication.changes {
            self.changes.notify(change, &mut on_fault);
            if change.is_item_change() {
                self.item_changes.notify(change, &mut on_fault);
            }
        }
        for _ in 0..publication.resets {
            self.resets.notify(&(), &mut on_fault);
        }
        for count in &publication.counts {
            self.counts.notify(count, &mut on_fault);
        }

        match unhandled {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Hand a fault to the fault observers. Returns it if still unhandled.
    fn raise_fault(&self, mut fault: ObserverFault) -> Option<ObserverFault> {
        let observers: Vec<FaultObserver> = self
            .faults
            .read()
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();

        for observer in observers {
            observer(&mut fault);
        }

        if fault.handled {
            debug!(channel = %fault.channel(), error = %fault.error(), "subscriber fault handled");
            None
        } else {
            warn!(channel = %fault.channel(), error = %fault.error(), "unhandled subscriber fault");
            Some(fault)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DictionaryChange, DictionaryChangeKind};
    use parking_lot::Mutex;
    use std::sync::Arc;

    type Change = DictionaryChange<i32, String>;

    fn observer_error(message: &str) -> crate::error::ObserverError {
        message.into()
    }

    fn publication(changes: Vec<Change>, count: usize) -> Publication<Change> {
        let resets = changes.iter().filter(|c| c.is_reset()).count();
        let counts = vec![count; changes.len()];
        Publication {
            changes,
            resets,
            counts,
        }
    }

    #[test]
    fn test_subscribe_unsubscribe() {
        let manager = SubscriptionManager::<Change>::new();

        let id = manager.subscribe_changes(Arc::new(|_: &Change| Ok(())));
        let feed = manager.count_feed(SubscriptionConfig::default());
        assert_eq!(manager.subscription_count(), 2);

        assert!(manager.unsubscribe(id));
        assert!(manager.unsubscribe(feed.id));
        assert!(!manager.unsubscribe(id));
        assert_eq!(manager.subscription_count(), 0);
    }

    #[test]
    fn test_deliver_routes_to_channels() {
        let manager = SubscriptionManager::<Change>::new();
        let changes = manager.changes_feed(SubscriptionConfig::default());
        let items = manager.item_changes_feed(SubscriptionConfig::default());
        let counts = manager.count_feed(SubscriptionConfig::default());
        let resets = manager.reset_feed(SubscriptionConfig::default());

        manager
            .deliver(
                &publication(
                    vec![
                        DictionaryChange::added(1, "One".to_string()),
                        DictionaryChange::value_changed(1, "One".to_string(), "Len"),
                        Change::reset(),
                    ],
                    1,
                ),
                true,
            )
            .unwrap();

        let kinds: Vec<_> = changes.drain().into_iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                DictionaryChangeKind::ItemAdded,
                DictionaryChangeKind::ItemValueChanged,
                DictionaryChangeKind::Reset,
            ]
        );
        let item_kinds: Vec<_> = items.drain().into_iter().map(|c| c.kind).collect();
        assert_eq!(item_kinds, vec![DictionaryChangeKind::ItemValueChanged]);
        assert_eq!(counts.drain(), vec![1, 1, 1]);
        assert_eq!(resets.drain().len(), 1);
    }

    #[test]
    fn test_drop_slow_feed() {
        let manager = SubscriptionManager::<Change>::new();
        let _feed = manager.changes_feed(SubscriptionConfig { buffer_size: 2 });

        for i in 0..10 {
            manager
                .deliver(
                    &publication(
                        vec![DictionaryChange::added(i, i.to_string())],
                        i as usize + 1,
                    ),
                    true,
                )
                .unwrap();
        }

        // Subscriber should be dropped
        assert_eq!(manager.subscription_count(), 0);
    }

    #[test]
    fn test_drop_disconnected_feed() {
        let manager = SubscriptionManager::<Change>::new();
        let feed = manager.reset_feed(SubscriptionConfig::default());
        drop(feed);

        manager
            .deliver(&Publication::reset_only(), true)
            .unwrap();
        assert_eq!(manager.subscription_count(), 0);
    }

    #[test]
    fn test_unhandled_fault_is_escalated() {
        let manager = SubscriptionManager::<Change>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        manager.subscribe_counts(Arc::new(|_: &usize| Err(observer_error("count failed"))));
        let sink = Arc::clone(&seen);
        manager.subscribe_faults(Arc::new(move |fault: &mut ObserverFault| {
            sink.lock().push(fault.channel());
        }));

        let result = manager.deliver(&Publication::count_only(3), true);
        match result {
            Err(CollectionError::SubscriberFault(err)) => assert_eq!(err.to_string(), "count failed"),
            other => panic!("expected subscriber fault, got {:?}", other),
        }
        assert_eq!(*seen.lock(), vec![Channel::Counts]);
    }

    #[test]
    fn test_handled_fault_is_swallowed() {
        let manager = SubscriptionManager::<Change>::new();
        manager.subscribe_resets(Arc::new(|_: &()| Err(observer_error("reset failed"))));
        manager.subscribe_faults(Arc::new(|fault: &mut ObserverFault| fault.handled = true));

        assert!(manager.deliver(&Publication::reset_only(), true).is_ok());
    }

    #[test]
    fn test_fault_swallowed_without_escalation() {
        let manager = SubscriptionManager::<Change>::new();
        manager.subscribe_resets(Arc::new(|_: &()| Err(observer_error("reset failed"))));

        assert!(manager.deliver(&Publication::reset_only(), false).is_ok());
    }

    #[test]
    fn test_remaining_subscribers_still_notified_after_fault() {
        let manager = SubscriptionManager::<Change>::new();
        manager.subscribe_counts(Arc::new(|_: &usize| Err(observer_error("first"))));
        let feed = manager.count_feed(SubscriptionConfig::default());

        assert!(manager.deliver(&Publication::count_only(5), true).is_err());
        assert_eq!(feed.drain(), vec![5]);
    }

    #[test]
    fn test_empty_publication() {
        assert!(!Publication::<Change>::count_only(0).is_empty());
        let empty = Publication::<Change> {
            changes: Vec::new(),
            resets: 0,
            counts: Vec::new(),
        };
        assert!(empty.is_empty());
    }
}
