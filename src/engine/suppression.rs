//! Scoped suppression of notification channels.

use crate::error::{CollectionError, Result};
use crate::types::Channel;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Which channels currently have an active suppression scope.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct SuppressionFlags {
    suppressed: [bool; 4],
}

impl SuppressionFlags {
    pub(crate) fn is_tracking(&self, channel: Channel) -> bool {
        !self.suppressed[channel.index()]
    }

    /// Start suppressing `channel`. At most one scope per channel.
    pub(crate) fn acquire(&mut self, channel: Channel) -> Result<()> {
        let slot = &mut self.suppressed[channel.index()];
        if *slot {
            return Err(CollectionError::InvalidConcurrentSuppression(channel));
        }
        *slot = true;
        Ok(())
    }

    pub(crate) fn release(&mut self, channel: Channel) {
        self.suppressed[channel.index()] = false;
    }
}

/// Implemented by whatever owns the flags a scope was taken from.
pub(crate) trait ReleaseSuppression: Send + Sync {
    fn release_suppression(&self, channel: Channel, signal_on_release: bool) -> Result<()>;
}

/// Guard that keeps one channel suppressed until released.
///
/// Releasing re-enables the channel and, when `signal_on_release` was
/// requested, delivers exactly one catch-up notification on it no matter how
/// many changes were suppressed:
/// - changes / item changes: a reset
/// - counts: the current count
/// - resets: one reset signal
///
/// Dropping the guard releases it. Use [`SuppressionScope::release`] to see
/// the outcome, which fails with `ObjectDisposed` once the collection is
/// disposed. Releasing twice is a no-op.
#[must_use = "the channel is re-enabled as soon as the scope is dropped"]
pub struct SuppressionScope {
    target: Arc<dyn ReleaseSuppression>,
    channel: Channel,
    signal_on_release: bool,
    released: bool,
}

impl SuppressionScope {
    pub(crate) fn new(
        target: Arc<dyn ReleaseSuppression>,
        channel: Channel,
        signal_on_release: bool,
    ) -> Self {
        Self {
            target,
            channel,
            signal_on_release,
            released: false,
        }
    }

    /// The channel this scope silences.
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Whether releasing publishes a catch-up signal.
    pub fn signals_on_release(&self) -> bool {
        self.signal_on_release
    }

    /// Whether the scope has already been released.
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Re-enable the channel.
    pub fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.target
            .release_suppression(self.channel, self.signal_on_release)
    }
}

impl Drop for SuppressionScope {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!(channel = %self.channel, error = %e, "suppression scope release failed on drop");
        }
    }
}

impl fmt::Debug for SuppressionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuppressionScope")
            .field("channel", &self.channel)
            .field("signal_on_release", &self.signal_on_release)
            .field("released", &self.released)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        releases: Mutex<Vec<(Channel, bool)>>,
    }

    impl ReleaseSuppression for Recorder {
        fn release_suppression(&self, channel: Channel, signal_on_release: bool) -> Result<()> {
            self.releases.lock().push((channel, signal_on_release));
            Ok(())
        }
    }

    #[test]
    fn test_flags_are_exclusive_per_channel() {
        let mut flags = SuppressionFlags::default();
        flags.acquire(Channel::Counts).unwrap();

        assert!(!flags.is_tracking(Channel::Counts));
        assert!(flags.is_tracking(Channel::Changes));
        assert!(matches!(
            flags.acquire(Channel::Counts),
            Err(CollectionError::InvalidConcurrentSuppression(Channel::Counts))
        ));
        flags.acquire(Channel::Resets).unwrap();

        flags.release(Channel::Counts);
        assert!(flags.is_tracking(Channel::Counts));
        flags.acquire(Channel::Counts).unwrap();
    }

    #[test]
    fn test_release_once() {
        let recorder = Arc::new(Recorder::default());
        let mut scope = SuppressionScope::new(recorder.clone(), Channel::Resets, true);

        scope.release().unwrap();
        scope.release().unwrap();
        assert!(scope.is_released());
        drop(scope);

        assert_eq!(*recorder.releases.lock(), vec![(Channel::Resets, true)]);
    }

    #[test]
    fn test_drop_releases() {
        let recorder = Arc::new(Recorder::default());
        {
            let _scope = SuppressionScope::new(recorder.clone(), Channel::ItemChanges, false);
        }
        assert_eq!(
            *recorder.releases.lock(),
            vec![(Channel::ItemChanges, false)]
        );
    }
}
