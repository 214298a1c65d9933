//! Key validation and pluggable key equality.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

/// A dictionary key.
///
/// Keys that can represent "no value" report it through `is_null`; such
/// keys are rejected with `NullArgument` by every keyed operation.
pub trait Key: Clone + Debug + Send + Sync + 'static {
    fn is_null(&self) -> bool {
        false
    }
}

macro_rules! impl_key {
    ($($t:ty),* $(,)?) => {
        $(impl Key for $t {})*
    };
}

impl_key!(
    bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, String,
    &'static str,
);

impl Key for Arc<str> {}

impl<T: Key> Key for Option<T> {
    fn is_null(&self) -> bool {
        match self {
            Some(inner) => inner.is_null(),
            None => true,
        }
    }
}

impl<A: Key, B: Key> Key for (A, B) {
    fn is_null(&self) -> bool {
        self.0.is_null() || self.1.is_null()
    }
}

/// Equality used to locate keys in a dictionary.
///
/// Two keys are equal when their canonical forms are equal. The original key
/// is kept alongside the value, so records always report the key as supplied.
pub trait KeyComparer<K>: Send + Sync + 'static {
    type Canonical: Eq + Hash + Send + Sync + 'static;

    fn canonicalize(&self, key: &K) -> Self::Canonical;
}

/// Plain `Eq`/`Hash` equality of the key type.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultComparer;

impl<K> KeyComparer<K> for DefaultComparer
where
    K: Key + Eq + Hash,
{
    type Canonical = K;

    fn canonicalize(&self, key: &K) -> K {
        key.clone()
    }
}

/// ASCII case-insensitive equality for string-like keys.
#[derive(Clone, Copy, Debug, Default)]
pub struct IgnoreAsciiCase;

impl<K> KeyComparer<K> for IgnoreAsciiCase
where
    K: Key + AsRef<str>,
{
    type Canonical = String;

    fn canonicalize(&self, key: &K) -> String {
        key.as_ref().to_ascii_lowercase()
    }
}
