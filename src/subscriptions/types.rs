//! Subscription types for collection notifications.

use crate::error::{CollectionError, ObserverError, ObserverResult};
use crate::types::Channel;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Configuration for a channel feed.
#[derive(Clone, Debug)]
pub struct SubscriptionConfig {
    /// Max buffered notifications before the feed is dropped.
    /// Default: 1000
    pub buffer_size: usize,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self { buffer_size: 1000 }
    }
}

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Callback subscribed to one primary channel.
pub type Observer<T> = Arc<dyn Fn(&T) -> ObserverResult + Send + Sync>;

/// Callback subscribed to the fault side-channel.
pub type FaultObserver = Arc<dyn Fn(&mut ObserverFault) + Send + Sync>;

/// A fault raised by a subscriber while a notification was delivered.
///
/// Fault observers may mark it handled; an unhandled fault is re-raised from
/// the mutation call that produced the notification.
pub struct ObserverFault {
    error: Arc<dyn Error + Send + Sync>,
    channel: Channel,
    pub handled: bool,
}

impl ObserverFault {
    pub(crate) fn new(error: ObserverError, channel: Channel) -> Self {
        Self {
            error: Arc::from(error),
            channel,
            handled: false,
        }
    }

    /// The error the subscriber returned.
    pub fn error(&self) -> &(dyn Error + Send + Sync) {
        &*self.error
    }

    /// The channel whose subscriber failed.
    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub(crate) fn into_error(self) -> CollectionError {
        CollectionError::SubscriberFault(self.error)
    }
}

impl fmt::Debug for ObserverFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverFault")
            .field("error", &self.error.to_string())
            .field("channel", &self.channel)
            .field("handled", &self.handled)
            .finish()
    }
}

/// Handle to a channel feed.
pub struct SubscriptionHandle<T> {
    pub id: SubscriptionId,
    /// Channel to receive notifications.
    pub receiver: crossbeam_channel::Receiver<T>,
}

impl<T> SubscriptionHandle<T> {
    /// Receive the next notification (blocking).
    pub fn recv(&self) -> Result<T, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a notification (non-blocking).
    pub fn try_recv(&self) -> Result<T, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<T, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Take everything currently buffered.
    pub fn drain(&self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }
}
