//! Error types for observable collections.

use crate::types::Channel;
use std::error::Error;
use std::sync::Arc;
use thiserror::Error;

/// Error returned by a subscriber callback.
pub type ObserverError = Box<dyn Error + Send + Sync>;

/// Return type of every subscriber callback.
pub type ObserverResult = std::result::Result<(), ObserverError>;

/// Main error type for collection operations.
#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("Argument must not be null: {0}")]
    NullArgument(&'static str),

    #[error("An item with the same key has already been added: {0}")]
    DuplicateKey(String),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Index {index} is out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Bulk operation failed for {} item(s): {}", .failed.len(), .failed.join(", "))]
    PartialBulkFailure { failed: Vec<String> },

    #[error("{0} notifications are already suppressed")]
    InvalidConcurrentSuppression(Channel),

    #[error("Collection has been disposed")]
    ObjectDisposed,

    #[error("Subscriber fault: {0}")]
    SubscriberFault(#[source] Arc<dyn Error + Send + Sync>),
}

impl CollectionError {
    /// Build a `PartialBulkFailure` naming every failed item.
    pub(crate) fn partial_bulk_failure<T: std::fmt::Debug>(failed: &[T]) -> Self {
        CollectionError::PartialBulkFailure {
            failed: failed.iter().map(|item| format!("{:?}", item)).collect(),
        }
    }
}

/// Result type for collection operations.
pub type Result<T> = std::result::Result<T, CollectionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_bulk_failure_names_items() {
        let err = CollectionError::partial_bulk_failure(&[3, 7]);
        match &err {
            CollectionError::PartialBulkFailure { failed } => {
                assert_eq!(failed, &vec!["3".to_string(), "7".to_string()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(err.to_string(), "Bulk operation failed for 2 item(s): 3, 7");
    }

    #[test]
    fn test_subscriber_fault_keeps_source() {
        let inner: ObserverError = "boom".into();
        let err = CollectionError::SubscriberFault(Arc::from(inner));
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "Subscriber fault: boom");
    }
}
