//! Disposal lifecycle.

mod common;

use common::Person;
use herald::{
    CollectionConfig, CollectionError, Lifecycle, ObservableCollection, ObservableDictionary,
    ObservableList, SubscriptionConfig,
};
use std::sync::Arc;

fn disposed<T>(result: herald::Result<T>) -> bool {
    matches!(result, Err(CollectionError::ObjectDisposed))
}

#[test]
fn test_collections_start_live() {
    let map = ObservableDictionary::<u32, u32>::new();
    let list = ObservableList::from_items(vec![1u8, 2], CollectionConfig::default());

    assert_eq!(map.notifications().lifecycle(), Lifecycle::Live);
    assert_eq!(list.notifications().lifecycle(), Lifecycle::Live);
    assert!(!map.is_disposed() && !map.is_disposing());

    list.dispose();
    assert_eq!(list.notifications().lifecycle(), Lifecycle::Disposed);
}

#[test]
fn test_dispose_freezes_collection() {
    let map = ObservableDictionary::<u32, u32>::new();
    map.add(1, 1).unwrap();
    let id = map.subscribe_changes(|_| Ok(())).unwrap();

    map.dispose();
    assert!(map.is_disposed());
    assert!(!map.is_disposing());

    // Still safe after disposal.
    assert_eq!(map.len(), 1);
    assert!(!map.is_empty());
    assert!(!map.unsubscribe(id));
    map.dispose();

    assert!(disposed(map.add(2, 2)));
    assert!(disposed(map.get(&1)));
    assert!(disposed(map.keys()));
    assert!(disposed(map.remove(&1)));
    assert!(disposed(map.clear()));
    assert!(disposed(map.reset()));
    assert!(disposed(map.reset_threshold()));
    assert!(disposed(map.set_reset_threshold(1)));
    assert!(disposed(map.subscribe_changes(|_| Ok(()))));
    assert!(disposed(map.changes_feed(SubscriptionConfig::default())));
    assert!(disposed(map.suppress_notifications(false)));
    assert!(disposed(map.is_tracking(herald::Channel::Counts)));
}

#[test]
fn test_dispose_closes_feeds() {
    let list = ObservableList::<u8>::new();
    let changes = list.changes_feed(SubscriptionConfig::default()).unwrap();
    list.push(1).unwrap();

    list.dispose();
    assert_eq!(changes.drain().len(), 1);
    assert!(changes.recv().is_err());
    assert_eq!(list.notifications().subscription_count(), 0);
}

#[test]
fn test_dispose_detaches_elements() {
    let alice = Person::new("Alice");
    let list = ObservableList::<Arc<Person>>::new();
    list.push(alice.clone()).unwrap();
    assert_eq!(alice.listeners(), 1);

    list.dispose();
    assert_eq!(alice.listeners(), 0);
    assert_eq!(list.notifications().item_subscription_count(), 0);

    // Raising after disposal is harmless.
    alice.rename("Alicia").unwrap();
}

#[test]
fn test_scope_release_after_dispose() {
    let map = ObservableDictionary::<u32, u32>::new();
    let mut scope = map.suppress_count_notifications(true).unwrap();

    map.dispose();
    assert!(disposed(scope.release()));
    // A second release is a no-op, and so is the drop.
    scope.release().unwrap();
}
