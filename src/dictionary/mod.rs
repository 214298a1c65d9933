//! Observable key/value collection.
//!
//! Every mutation publishes a [`DictionaryChange`](crate::types::DictionaryChange):
//! - `ItemAdded` / `ItemRemoved` for structural changes
//! - `ItemValueReplaced` when a key gets a new value
//! - `ItemKeyChanged` when a value moves to a new key
//! - `ItemValueChanged` when a stored value raises a property change
//! - `Reset` for clear, explicit resets and collapsed range operations

mod observable;
mod store;

pub use observable::ObservableDictionary;
