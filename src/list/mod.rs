//! Observable sequence.
//!
//! Publishes [`ListChange`](crate::types::ListChange) records. Replacing an
//! item is reported as an `ItemRemoved` / `ItemAdded` pair at the same index.

mod observable;
mod store;

pub use observable::ObservableList;
