//! Keys ordered by a [`Comparator`].

use alloc::{sync::Arc, vec::Vec};
use core::{cmp::Ordering, fmt, marker::PhantomData};

use crate::comparator::Comparator;

/// An immutable key which orders itself with the comparator `C`.
///
/// This lets comparator-ordered keys be stored in any ordered collection. Cloning is cheap: the
/// bytes are shared.
pub struct OrderedKey<C> {
    bytes: Arc<[u8]>,
    _comparator: PhantomData<fn() -> C>,
}

impl<C> OrderedKey<C> {
    /// Create a key by copying the given bytes.
    pub fn from_slice(bytes: &[u8]) -> Self {
        OrderedKey {
            bytes: Arc::from(bytes),
            _comparator: PhantomData,
        }
    }

    /// The raw bytes of the key.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Copy the key out into a vector.
    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }

    /// The length of the key in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the key is the empty byte string.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl<C> From<Vec<u8>> for OrderedKey<C> {
    fn from(bytes: Vec<u8>) -> Self {
        OrderedKey {
            bytes: Arc::from(bytes),
            _comparator: PhantomData,
        }
    }
}

impl<C> Clone for OrderedKey<C> {
    fn clone(&self) -> Self {
        OrderedKey {
            bytes: self.bytes.clone(),
            _comparator: PhantomData,
        }
    }
}

impl<C> AsRef<[u8]> for OrderedKey<C> {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl<C> fmt::Debug for OrderedKey<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OrderedKey").field(&&self.bytes[..]).finish()
    }
}

impl<C: Comparator> PartialEq for OrderedKey<C> {
    fn eq(&self, other: &Self) -> bool {
        C::compare(&self.bytes, &other.bytes) == Ordering::Equal
    }
}

impl<C: Comparator> Eq for OrderedKey<C> {}

impl<C: Comparator> PartialOrd for OrderedKey<C> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<C: Comparator> Ord for OrderedKey<C> {
    fn cmp(&self, other: &Self) -> Ordering {
        C::compare(&self.bytes, &other.bytes)
    }
}
