//! Per-item change subscriptions.
//!
//! Contained elements that expose a property-changed signal are subscribed
//! while they are members of a collection. Their property changes are
//! surfaced through the collection as item-change records:
//! - `ItemValueChanged` for dictionaries
//! - `ItemChanged` for lists
//!
//! A subscription is torn down as soon as the element leaves the collection
//! (remove, replace, clear) or the collection is disposed.

mod notify;
mod registry;

pub use notify::{
    ChangeAware, Element, NotifyPropertyChanged, PropertyChangedHandler, PropertyChangedSource,
    PropertySubscription,
};
pub(crate) use registry::ItemSubscriptions;
