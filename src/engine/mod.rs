//! The change-notification engine shared by every collection.
//!
//! - `policy`: collapses large batches of records into one reset
//! - `suppression`: scoped, per-channel suppression with catch-up on release
//! - `delivery`: inline or externally scheduled, order-preserving delivery
//! - `context`: the per-collection context tying them to the sync root

mod context;
mod delivery;
mod policy;
mod suppression;

pub(crate) use context::{Core, Engine, SlotStore};
pub use delivery::{DeliveryContext, DeliveryJob, SerialExecutor};
pub(crate) use policy::Batch;
pub use suppression::SuppressionScope;
