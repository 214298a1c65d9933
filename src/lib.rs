//! # Herald
//!
//! Observable dictionary and list collections that publish a structured
//! record for every mutation.
//!
//! ## Core Concepts
//!
//! - **Channels**: full changes, item changes, counts and resets, each
//!   observable through callbacks or bounded feeds
//! - **Reset threshold**: a range operation producing too many records is
//!   published as one reset instead
//! - **Suppression**: scoped per-channel silence with an optional catch-up
//!   notification on release
//! - **Item subscriptions**: contained elements that raise property changes
//!   are watched while they are members
//! - **Fault escalation**: a failing subscriber surfaces from the mutation
//!   call that triggered it, unless a fault observer handles it
//!
//! ## Example
//!
//! ```ignore
//! use herald::{ObservableCollection, ObservableDictionary};
//!
//! let map = ObservableDictionary::new();
//! map.subscribe_changes(|change| {
//!     println!("{:?} {:?}", change.kind, change.key);
//!     Ok(())
//! })?;
//!
//! map.add("one".to_string(), 1)?;
//!
//! // Silence counts while bulk loading, then publish the final count once.
//! let scope = map.suppress_count_notifications(true)?;
//! map.add_range((2..100).map(|n| (n.to_string(), n)))?;
//! drop(scope);
//! ```

pub mod collection;
pub mod config;
pub mod dictionary;
pub mod engine;
pub mod error;
pub mod items;
pub mod keys;
pub mod list;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use collection::{NotificationHub, ObservableCollection};
pub use config::CollectionConfig;
pub use dictionary::ObservableDictionary;
pub use engine::{DeliveryContext, DeliveryJob, SerialExecutor, SuppressionScope};
pub use error::{CollectionError, ObserverError, ObserverResult, Result};
pub use items::{
    ChangeAware, Element, NotifyPropertyChanged, PropertyChangedHandler, PropertyChangedSource,
    PropertySubscription,
};
pub use keys::{DefaultComparer, IgnoreAsciiCase, Key, KeyComparer};
pub use list::ObservableList;
pub use subscriptions::{
    FaultObserver, Observer, ObserverFault, SubscriptionConfig, SubscriptionHandle, SubscriptionId,
};
pub use types::*;
