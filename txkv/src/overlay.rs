//! The in-memory overlay of uncommitted changes, and a cursor over it.
//!
//! An [`OverlayMap`] holds at most one [`ValueChange`] per key, ordered by the store's comparator.
//! A key that is written more than once before commit keeps only its latest change, so the
//! overlay turns into a write batch with exactly one operation per key.
//!
//! The overlay is backed by a persistent map: cloning it is O(1) and the clone is unaffected by
//! later writes to the original. [`OverlayIterator`]s walk such clones, which is what allows a
//! transaction to keep writing while iterators over it are alive.

use imbl::OrdMap;
use txkv_core::{Comparator, OrderedKey, ValueChange, WriteBatch};

use crate::cursor::OrdCursor;

/// An ordered map from key to the change buffered for it.
pub struct OverlayMap<C: Comparator> {
    entries: OrdMap<OrderedKey<C>, ValueChange>,
    // total bytes of keys and live values.
    approximate_size: usize,
}

impl<C: Comparator> OverlayMap<C> {
    /// Create an empty overlay.
    pub fn new() -> Self {
        OverlayMap {
            entries: OrdMap::new(),
            approximate_size: 0,
        }
    }

    /// Buffer `value` under `key`, replacing whatever was buffered for it.
    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        self.insert(key, ValueChange::Insert(value.to_vec()));
    }

    /// Buffer a deletion of `key`, replacing whatever was buffered for it.
    pub fn delete(&mut self, key: &[u8]) {
        self.insert(key, ValueChange::Delete);
    }

    fn insert(&mut self, key: &[u8], change: ValueChange) {
        let added = change.value_len();
        match self.entries.insert(OrderedKey::from_slice(key), change) {
            Some(prior) => self.approximate_size -= prior.value_len(),
            None => self.approximate_size += key.len(),
        }
        self.approximate_size += added;
    }

    /// The change buffered for `key`, if any.
    ///
    /// `None` means the overlay has nothing to say about the key, not that the key is absent.
    pub fn get(&self, key: &[u8]) -> Option<&ValueChange> {
        self.entries.get(&OrderedKey::from_slice(key))
    }

    /// The number of keys with a buffered change.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The number of key and value bytes buffered.
    pub fn approximate_size(&self) -> usize {
        self.approximate_size
    }

    /// Discard all buffered changes.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.approximate_size = 0;
    }

    /// Iterate over the buffered changes in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &ValueChange)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_bytes(), v))
    }

    /// Build a batch with one operation per buffered key, in key order.
    pub fn to_write_batch(&self) -> WriteBatch {
        let mut batch = WriteBatch::with_capacity(self.len());
        for (key, change) in self.iter() {
            match change {
                ValueChange::Insert(value) => batch.put(key, value),
                ValueChange::Delete => batch.delete(key),
            }
        }
        batch
    }

    /// Create a cursor over the current contents of the overlay.
    ///
    /// The cursor is unaffected by later changes to the overlay until it is refreshed.
    pub fn cursor(&self) -> OverlayIterator<C> {
        OverlayIterator {
            cursor: OrdCursor::new(self.entries.clone()),
        }
    }
}

impl<C: Comparator> Default for OverlayMap<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Comparator> Clone for OverlayMap<C> {
    fn clone(&self) -> Self {
        OverlayMap {
            entries: self.entries.clone(),
            approximate_size: self.approximate_size,
        }
    }
}

/// A cursor over a version of an [`OverlayMap`].
///
/// The cursor starts out invalid. Tombstones are visited like any other entry; it is up to the
/// caller to interpret them with [`OverlayIterator::is_deleted`].
pub struct OverlayIterator<C: Comparator> {
    cursor: OrdCursor<C, ValueChange>,
}

impl<C: Comparator> OverlayIterator<C> {
    /// Whether the cursor is positioned on an entry.
    pub fn valid(&self) -> bool {
        self.cursor.valid()
    }

    pub fn seek_to_first(&mut self) {
        self.cursor.seek_to_first();
    }

    pub fn seek_to_last(&mut self) {
        self.cursor.seek_to_last();
    }

    /// Position at the first entry whose key is at or after `target`.
    pub fn seek(&mut self, target: &[u8]) {
        self.cursor.seek(target);
    }

    /// Step forward. Stepping past the last entry makes the cursor invalid.
    ///
    /// Panics if the cursor is invalid.
    pub fn next(&mut self) {
        self.cursor.next();
    }

    /// Step backward. Stepping before the first entry makes the cursor invalid.
    ///
    /// Panics if the cursor is invalid.
    pub fn prev(&mut self) {
        self.cursor.prev();
    }

    /// Panics if the cursor is invalid.
    pub fn key(&self) -> &[u8] {
        self.cursor.key()
    }

    /// The value of the current entry.
    ///
    /// Panics if the cursor is invalid or positioned on a tombstone.
    pub fn value(&self) -> &[u8] {
        match self.cursor.entry() {
            ValueChange::Insert(value) => value,
            // PANIC: part of the function's contract.
            ValueChange::Delete => panic!("value read from a deleted overlay entry"),
        }
    }

    /// Whether the current entry is a tombstone.
    ///
    /// Panics if the cursor is invalid.
    pub fn is_deleted(&self) -> bool {
        self.cursor.entry().is_delete()
    }

    /// Move the cursor onto the current contents of `overlay`, keeping its position.
    ///
    /// Entries are never removed from an overlay that still has cursors over it, so the
    /// current key is always present in the newer version.
    pub fn refresh(&mut self, overlay: &OverlayMap<C>) {
        self.cursor.replace_map(overlay.entries.clone());
    }
}
