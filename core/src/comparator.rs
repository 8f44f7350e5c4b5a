//! Total orders over byte-string keys.
//!
//! Comparators are zero-sized, type-level strategies. A store names its comparator as an
//! associated type and every structure layered on top of the store is parameterized by that same
//! type, so the store and anything merged with it can never disagree on ordering.

use core::{cmp::Ordering, marker::PhantomData};

/// A total order over byte-string keys.
///
/// Implementations must be consistent: `compare(a, b)` is the inverse of `compare(b, a)`, and
/// `Ordering::Equal` must only be returned for keys that the store treats as the same key.
pub trait Comparator: 'static {
    /// Compare two keys.
    fn compare(a: &[u8], b: &[u8]) -> Ordering;

    /// A stable name for this ordering, used in diagnostics.
    fn name() -> &'static str;
}

/// Lexicographic order over the raw key bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bytewise;

impl Comparator for Bytewise {
    fn compare(a: &[u8], b: &[u8]) -> Ordering {
        a.cmp(b)
    }

    fn name() -> &'static str {
        "txkv.Bytewise"
    }
}

/// The inverse of another ordering.
pub struct Reverse<C>(PhantomData<C>);

impl<C: Comparator> Comparator for Reverse<C> {
    fn compare(a: &[u8], b: &[u8]) -> Ordering {
        C::compare(b, a)
    }

    fn name() -> &'static str {
        "txkv.Reverse"
    }
}
