//! Property tests for the notification pipeline.

mod common;

use common::Person;
use herald::{
    CollectionConfig, CollectionError, DefaultComparer, DictionaryChange, DictionaryChangeKind,
    IgnoreAsciiCase, ObservableCollection, ObservableDictionary, SubscriptionConfig,
};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;

type Map = ObservableDictionary<u16, u16>;

fn with_threshold(threshold: usize) -> Map {
    Map::with_config(CollectionConfig::default().with_reset_threshold(threshold))
}

fn feed() -> SubscriptionConfig {
    SubscriptionConfig {
        buffer_size: 10_000,
    }
}

proptest! {
    #[test]
    fn prop_counts_follow_adds(n in 0usize..200) {
        let map = Map::new();
        let counts = map.count_feed(feed()).unwrap();

        for i in 0..n {
            map.add(i as u16, 0).unwrap();
        }

        prop_assert_eq!(counts.drain(), (1..=n).collect::<Vec<_>>());
        prop_assert_eq!(map.len(), n);
    }

    #[test]
    fn prop_zero_threshold_resets_every_add(n in 1usize..50) {
        let map = with_threshold(0);
        let changes = map.changes_feed(feed()).unwrap();

        for i in 0..n {
            map.add(i as u16, 0).unwrap();
        }

        let seen = changes.drain();
        prop_assert_eq!(seen.len(), n);
        prop_assert!(seen.iter().all(|c| c.kind == DictionaryChangeKind::Reset));
    }

    #[test]
    fn prop_range_collapses_from_threshold(k in 1usize..100) {
        let entries: Vec<(u16, u16)> = (0..k as u16).map(|i| (i, i)).collect();

        let collapsed = with_threshold(k);
        let changes = collapsed.changes_feed(feed()).unwrap();
        collapsed.add_range(entries.clone()).unwrap();
        let kinds: Vec<_> = changes.drain().into_iter().map(|c| c.kind).collect();
        prop_assert_eq!(kinds, vec![DictionaryChangeKind::Reset]);

        let individual = with_threshold(k + 1);
        let changes = individual.changes_feed(feed()).unwrap();
        individual.add_range(entries.clone()).unwrap();
        let seen = changes.drain();
        prop_assert_eq!(seen.len(), k);
        prop_assert!(seen.iter().all(|c| c.kind == DictionaryChangeKind::ItemAdded));
    }

    #[test]
    fn prop_bulk_add_is_best_effort(
        existing in prop::collection::btree_set(0u16..64, 0..20),
        incoming in prop::collection::btree_set(0u16..64, 0..20),
    ) {
        let throwing = Map::new();
        let trying = Map::new();
        for key in &existing {
            throwing.add(*key, 0).unwrap();
            trying.add(*key, 0).unwrap();
        }
        let entries: Vec<(u16, u16)> = incoming.iter().map(|k| (*k, 1)).collect();
        let expected_failures: Vec<u16> = incoming.intersection(&existing).copied().collect();

        match throwing.add_range(entries.clone()) {
            Ok(()) => prop_assert!(expected_failures.is_empty()),
            Err(CollectionError::PartialBulkFailure { failed }) => {
                let named: Vec<String> = expected_failures.iter().map(|k| k.to_string()).collect();
                prop_assert_eq!(failed, named);
            }
            Err(other) => prop_assert!(false, "unexpected error: {:?}", other),
        }

        let (all_added, failed) = trying.try_add_range(entries).unwrap();
        prop_assert_eq!(all_added, expected_failures.is_empty());
        prop_assert_eq!(failed, expected_failures);

        let union: BTreeSet<u16> = existing.union(&incoming).copied().collect();
        let mut left = throwing.entries().unwrap();
        let mut right = trying.entries().unwrap();
        left.sort();
        right.sort();
        prop_assert_eq!(&left, &right);
        prop_assert_eq!(left.iter().map(|(k, _)| *k).collect::<BTreeSet<_>>(), union);
    }

    #[test]
    fn prop_bulk_remove_is_best_effort(
        existing in prop::collection::btree_set(0u16..64, 0..20),
        doomed in prop::collection::btree_set(0u16..64, 0..20),
    ) {
        let map = Map::new();
        for key in &existing {
            map.add(*key, 0).unwrap();
        }
        let expected_failures: Vec<u16> = doomed.difference(&existing).copied().collect();

        let (all_removed, failed) = map.try_remove_range(doomed.iter().copied()).unwrap();
        prop_assert_eq!(all_removed, expected_failures.is_empty());
        prop_assert_eq!(failed, expected_failures);

        let mut keys = map.keys().unwrap();
        keys.sort();
        let remaining: Vec<u16> = existing.difference(&doomed).copied().collect();
        prop_assert_eq!(keys, remaining);
    }

    #[test]
    fn prop_item_suppression_releases_one_reset(
        elements in 1usize..6,
        renames in prop::collection::vec(0usize..6, 0..30),
    ) {
        let people = ObservableDictionary::<usize, Arc<Person>>::new();
        let persons: Vec<_> = (0..elements).map(|i| Person::new(&format!("p{}", i))).collect();
        for (i, person) in persons.iter().enumerate() {
            people.add(i, person.clone()).unwrap();
        }
        let changes = people.changes_feed(feed()).unwrap();
        let items = people.item_changes_feed(feed()).unwrap();

        let scope = people.suppress_item_change_notifications(true).unwrap();
        for (step, target) in renames.iter().enumerate() {
            persons[target % elements].rename(&format!("r{}", step)).unwrap();
        }
        prop_assert!(changes.drain().is_empty());
        drop(scope);

        let kinds: Vec<_> = changes.drain().into_iter().map(|c| c.kind).collect();
        prop_assert_eq!(kinds, vec![DictionaryChangeKind::Reset]);
        prop_assert!(items.drain().is_empty());
    }

    #[test]
    fn prop_removed_elements_go_quiet(renames in 0usize..20) {
        let people = ObservableDictionary::<u8, Arc<Person>>::new();
        let alice = Person::new("Alice");
        people.add(1, alice.clone()).unwrap();
        people.remove(&1).unwrap();

        let changes = people.changes_feed(feed()).unwrap();
        let items = people.item_changes_feed(feed()).unwrap();
        let counts = people.count_feed(feed()).unwrap();
        let resets = people.reset_feed(feed()).unwrap();

        for i in 0..renames {
            alice.rename(&i.to_string()).unwrap();
        }

        prop_assert!(changes.drain().is_empty());
        prop_assert!(items.drain().is_empty());
        prop_assert!(counts.drain().is_empty());
        prop_assert!(resets.drain().is_empty());
    }
}

#[test]
fn test_construction_depends_on_comparer() {
    let entries = || vec![("a".to_string(), 1), ("A".to_string(), 2)];

    let result = ObservableDictionary::from_entries(
        entries(),
        IgnoreAsciiCase,
        CollectionConfig::default(),
    );
    assert!(matches!(result, Err(CollectionError::DuplicateKey(_))));

    let map = ObservableDictionary::from_entries(
        entries(),
        DefaultComparer,
        CollectionConfig::default(),
    )
    .unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map.get(&"A".to_string()).unwrap(), 2);
}

#[test]
fn test_add_add_remove_example() {
    let map = ObservableDictionary::<i32, &str>::new();
    let changes = map.changes_feed(feed()).unwrap();

    map.add(1, "One").unwrap();
    map.add(2, "Two").unwrap();
    map.remove(&1).unwrap();

    assert_eq!(
        changes.drain(),
        vec![
            DictionaryChange::added(1, "One"),
            DictionaryChange::added(2, "Two"),
            DictionaryChange::removed(1, "One"),
        ]
    );
    assert_eq!(map.len(), 1);
}
