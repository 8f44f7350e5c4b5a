//! The ordered key-value store underneath transactions.
//!
//! Transactions never look inside the store. They need point lookups and cursors at a fixed
//! snapshot, and an atomic write of a batch of puts and deletes. Anything providing that can back
//! a transaction; [`MemStore`] is an in-process implementation.

use txkv_core::{Comparator, Value, WriteBatch};

pub use mem::{MemIterator, MemSnapshot, MemStore};

mod mem;

/// An ordered, byte-keyed store with snapshots and atomic batch writes.
pub trait OrderedStore {
    /// The order of keys in the store. Overlays layered on the store use the same order.
    type Comparator: Comparator;

    /// An immutable view of the store at some point in time.
    ///
    /// Dropping the snapshot releases it.
    type Snapshot;

    /// A cursor over a snapshot.
    type Iter: StoreIterator;

    /// Take a snapshot of the current state.
    fn snapshot(&self) -> Self::Snapshot;

    /// Look up `key` as of `snapshot`.
    fn get(&self, key: &[u8], snapshot: &Self::Snapshot) -> anyhow::Result<Option<Value>>;

    /// Create a cursor over `snapshot`. The cursor starts out invalid.
    fn new_iterator(&self, snapshot: &Self::Snapshot) -> Self::Iter;

    /// Apply all operations of `batch` in order, atomically: either all of them are applied or
    /// none are.
    fn write(&self, batch: &WriteBatch) -> anyhow::Result<()>;
}

/// A bidirectional cursor over a store snapshot.
///
/// Keys are visited in the store's comparator order. Stepping past either end makes the cursor
/// invalid. An error leaves the cursor in an unspecified position.
pub trait StoreIterator {
    /// Whether the cursor is positioned on an entry.
    fn valid(&self) -> bool;

    fn seek_to_first(&mut self) -> anyhow::Result<()>;

    fn seek_to_last(&mut self) -> anyhow::Result<()>;

    /// Position at the first entry whose key is at or after `target`.
    fn seek(&mut self, target: &[u8]) -> anyhow::Result<()>;

    /// Step forward. Requires a valid cursor.
    fn next(&mut self) -> anyhow::Result<()>;

    /// Step backward. Requires a valid cursor.
    fn prev(&mut self) -> anyhow::Result<()>;

    /// The current key. Requires a valid cursor.
    fn key(&self) -> &[u8];

    /// The current value. Requires a valid cursor.
    fn value(&self) -> &[u8];
}
