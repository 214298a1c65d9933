//! Subscription system for collection notifications.
//!
//! Every collection exposes four primary channels over the same record
//! stream:
//! - Changes: every change record, in mutation order
//! - Item changes: only records forwarded from element property changes
//! - Counts: the element count after the operation, once per published record
//! - Resets: a unit signal for every reset
//!
//! Subscribers are either callbacks or bounded channel feeds. A callback
//! that returns an error raises an [`ObserverFault`] on the fault
//! side-channel; a fault nobody marks handled is re-raised from the call
//! that triggered the notification. Feeds never fault: a feed that
//! overflows or whose receiver is gone is dropped.
//!
//! # Example
//!
//! ```ignore
//! let map = ObservableDictionary::new();
//! let feed = map.changes_feed(SubscriptionConfig::default())?;
//!
//! map.add(1, "One".to_string())?;
//!
//! for change in feed.drain() {
//!     println!("{:?} {:?}", change.kind, change.key);
//! }
//! ```

mod manager;
mod types;

pub(crate) use manager::{Publication, SubscriptionManager};
pub use types::{
    FaultObserver, Observer, ObserverFault, SubscriptionConfig, SubscriptionHandle, SubscriptionId,
};
