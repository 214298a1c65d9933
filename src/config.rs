//! Collection configuration.

use crate::engine::DeliveryContext;
use std::fmt;
use std::sync::Arc;

/// Collection configuration.
#[derive(Clone)]
pub struct CollectionConfig {
    /// Number of change records from one operation at which they are
    /// collapsed into a single reset.
    /// Default: `usize::MAX` (never collapse)
    pub reset_threshold: usize,

    /// Whether an unhandled subscriber fault is re-raised from the mutation
    /// call that triggered it.
    /// Default: true
    pub escalate_subscriber_faults: bool,

    /// Where notifications are delivered (None = inline on the mutating thread).
    pub delivery: Option<Arc<dyn DeliveryContext>>,
}

impl CollectionConfig {
    /// Set the batch size at which records collapse into one reset.
    pub fn with_reset_threshold(mut self, threshold: usize) -> Self {
        self.reset_threshold = threshold;
        self
    }

    /// Deliver notifications through `delivery` instead of inline.
    pub fn with_delivery(mut self, delivery: Arc<dyn DeliveryContext>) -> Self {
        self.delivery = Some(delivery);
        self
    }

    /// Enable or disable re-raising unhandled subscriber faults.
    pub fn with_escalation(mut self, escalate: bool) -> Self {
        self.escalate_subscriber_faults = escalate;
        self
    }
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            reset_threshold: usize::MAX,
            escalate_subscriber_faults: true,
            delivery: None,
        }
    }
}

impl fmt::Debug for CollectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionConfig")
            .field("reset_threshold", &self.reset_threshold)
            .field("escalate_subscriber_faults", &self.escalate_subscriber_faults)
            .field("delivery", &if self.delivery.is_some() { "context" } else { "inline" })
            .finish()
    }
}
