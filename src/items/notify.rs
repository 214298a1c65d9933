//! Property-change capability of contained elements.

use crate::error::Result;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Callback invoked with the name of the property that changed.
pub type PropertyChangedHandler = Arc<dyn Fn(&str) -> Result<()> + Send + Sync>;

/// An element that raises a signal whenever one of its properties changes.
pub trait NotifyPropertyChanged: Send + Sync {
    /// Register a handler. The handler stays registered until the returned
    /// subscription is dropped.
    fn subscribe_property_changed(&self, handler: PropertyChangedHandler) -> PropertySubscription;
}

/// Runtime query for the property-change capability.
///
/// Collections ask every inserted value whether it can notify. Values that
/// cannot are stored and tracked at the collection level only.
pub trait ChangeAware {
    fn property_notifier(&self) -> Option<&dyn NotifyPropertyChanged> {
        None
    }
}

/// Bounds shared by every value stored in an observable collection.
pub trait Element: Clone + fmt::Debug + ChangeAware + Send + Sync + 'static {}

impl<T> Element for T where T: Clone + fmt::Debug + ChangeAware + Send + Sync + 'static {}

macro_rules! impl_not_change_aware {
    ($($t:ty),* $(,)?) => {
        $(impl ChangeAware for $t {})*
    };
}

impl_not_change_aware!(
    (), bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64,
    String, &'static str,
);

impl<T> ChangeAware for Vec<T> {}

impl<T: ChangeAware> ChangeAware for Option<T> {
    fn property_notifier(&self) -> Option<&dyn NotifyPropertyChanged> {
        self.as_ref().and_then(|inner| inner.property_notifier())
    }
}

impl<T: ChangeAware + ?Sized> ChangeAware for Arc<T> {
    fn property_notifier(&self) -> Option<&dyn NotifyPropertyChanged> {
        (**self).property_notifier()
    }
}

impl<T: ChangeAware + ?Sized> ChangeAware for Box<T> {
    fn property_notifier(&self) -> Option<&dyn NotifyPropertyChanged> {
        (**self).property_notifier()
    }
}

/// Live registration of a property-change handler. Dropping it unregisters.
#[must_use = "dropping a PropertySubscription unregisters its handler"]
pub struct PropertySubscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl PropertySubscription {
    /// Wrap the closure that unregisters the handler.
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription with nothing to tear down.
    pub fn empty() -> Self {
        Self { cancel: None }
    }
}

impl Drop for PropertySubscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for PropertySubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertySubscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

type HandlerMap = Mutex<BTreeMap<u64, PropertyChangedHandler>>;

/// Ready-made property-change source to embed in element types.
///
/// ```ignore
/// struct Person {
///     name: Mutex<String>,
///     changes: PropertyChangedSource,
/// }
///
/// impl ChangeAware for Person {
///     fn property_notifier(&self) -> Option<&dyn NotifyPropertyChanged> {
///         Some(&self.changes)
///     }
/// }
///
/// impl Person {
///     fn rename(&self, name: &str) -> herald::Result<()> {
///         *self.name.lock() = name.to_string();
///         self.changes.raise("Name")
///     }
/// }
/// ```
#[derive(Default)]
pub struct PropertyChangedSource {
    handlers: Arc<HandlerMap>,
    next_id: AtomicU64,
}

impl PropertyChangedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.lock().len()
    }

    /// Signal that `property_name` changed.
    ///
    /// Every handler runs, in registration order; the first error any of them
    /// returned is passed back to the caller.
    pub fn raise(&self, property_name: &str) -> Result<()> {
        let handlers: Vec<PropertyChangedHandler> = self.handlers.lock().values().cloned().collect();

        let mut first_error = None;
        for handler in handlers {
            if let Err(e) = handler(property_name) {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl NotifyPropertyChanged for PropertyChangedSource {
    fn subscribe_property_changed(&self, handler: PropertyChangedHandler) -> PropertySubscription {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.handlers.lock().insert(id, handler);

        let handlers: Weak<HandlerMap> = Arc::downgrade(&self.handlers);
        PropertySubscription::new(move || {
            if let Some(handlers) = handlers.upgrade() {
                handlers.lock().remove(&id);
            }
        })
    }
}

impl fmt::Debug for PropertyChangedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyChangedSource")
            .field("handlers", &self.handler_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollectionError;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_raise_reaches_handlers_until_dropped() {
        let source = PropertyChangedSource::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        let subscription = source.subscribe_property_changed(Arc::new(move |name: &str| {
            assert_eq!(name, "Name");
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        source.raise("Name").unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(source.handler_count(), 1);

        drop(subscription);
        source.raise("Name").unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(source.handler_count(), 0);
    }

    #[test]
    fn test_raise_returns_first_error_after_running_all() {
        let source = PropertyChangedSource::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let _failing = source.subscribe_property_changed(Arc::new(|_: &str| {
            Err(CollectionError::ObjectDisposed)
        }));
        let counter = Arc::clone(&hits);
        let _counting = source.subscribe_property_changed(Arc::new(move |_: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        let result = source.raise("Age");
        assert!(matches!(result, Err(CollectionError::ObjectDisposed)));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_capability_query() {
        struct Plain;
        impl ChangeAware for Plain {}

        struct Notifying(PropertyChangedSource);
        impl ChangeAware for Notifying {
            fn property_notifier(&self) -> Option<&dyn NotifyPropertyChanged> {
                Some(&self.0)
            }
        }

        assert!(Plain.property_notifier().is_none());
        assert!(42i32.property_notifier().is_none());
        assert!(Arc::new(Notifying(PropertyChangedSource::new()))
            .property_notifier()
            .is_some());
        assert!(Some(Notifying(PropertyChangedSource::new()))
            .property_notifier()
            .is_some());
        assert!(None::<Notifying>.property_notifier().is_none());
    }

    #[test]
    fn test_subscription_outliving_source() {
        let source = PropertyChangedSource::new();
        let subscription = source.subscribe_property_changed(Arc::new(|_: &str| Ok(())));
        drop(source);
        drop(subscription);
    }
}
