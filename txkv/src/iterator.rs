//! Iteration over the view of a transaction.

use crate::{
    merge::{self, Direction, Source},
    metrics::Metric,
    overlay::OverlayIterator,
    store::{OrderedStore, StoreIterator},
    transaction::Transaction,
};

/// A cursor over the store snapshot of a transaction with the transaction's writes applied.
///
/// Keys are visited in the store's order, each once, with keys deleted in the transaction
/// skipped. The iterator may be moved in either direction at any time.
///
/// Writes made through the transaction while the iterator is alive become visible no later than
/// the next call to [`key`](Self::key), [`value`](Self::value), [`next`](Self::next) or
/// [`prev`](Self::prev). Once the transaction finishes the iterator is invalid for good, and
/// repositioning it panics.
///
/// Deleting the key under the iterator through the transaction makes the iterator invalid for
/// reads, but it keeps its place: [`next`](Self::next) and [`prev`](Self::prev) still move to the
/// neighbouring visible keys, and writing the key again makes it valid once more.
///
/// Any error returned by the store leaves the iterator invalid.
pub struct MergingIterator<'t, S: OrderedStore> {
    txn: &'t Transaction<S>,
    // slot in the transaction's iterator registry.
    id: usize,
    data: OverlayIterator<S::Comparator>,
    db: S::Iter,
    current: Option<Source>,
    direction: Direction,
}

impl<'t, S: OrderedStore> MergingIterator<'t, S> {
    pub(crate) fn new(txn: &'t Transaction<S>) -> Self {
        MergingIterator {
            txn,
            id: txn.register_iterator(),
            data: txn.overlay_cursor(),
            db: txn.store_iterator(),
            current: None,
            direction: Direction::Forward,
        }
    }

    /// Whether the iterator is positioned on a visible entry.
    pub fn valid(&self) -> bool {
        let Some(current) = self.current else {
            return false;
        };
        if self.txn.iterator_invalidated(self.id) {
            return false;
        }

        if self.txn.iterator_dirty(self.id) {
            // not caught up yet. the key under the cursor is unchanged by a resync.
            let key = match current {
                Source::Overlay => self.data.key(),
                Source::Store => self.db.key(),
            };
            !self.txn.has_tombstone(key)
        } else {
            current == Source::Store || !self.data.is_deleted()
        }
    }

    pub fn seek_to_first(&mut self) -> anyhow::Result<()> {
        self.reposition(Direction::Forward, |data, db| {
            data.seek_to_first();
            db.seek_to_first()
        })
    }

    pub fn seek_to_last(&mut self) -> anyhow::Result<()> {
        self.reposition(Direction::Reverse, |data, db| {
            data.seek_to_last();
            db.seek_to_last()
        })
    }

    /// Position at the first visible key at or after `target`.
    pub fn seek(&mut self, target: &[u8]) -> anyhow::Result<()> {
        self.reposition(Direction::Forward, |data, db| {
            data.seek(target);
            db.seek(target)
        })
    }

    /// Move to the next visible key.
    ///
    /// Panics if the iterator is not positioned, unless its key was deleted under it.
    pub fn next(&mut self) -> anyhow::Result<()> {
        self.step(Direction::Forward)
    }

    /// Move to the previous visible key.
    ///
    /// Panics if the iterator is not positioned, unless its key was deleted under it.
    pub fn prev(&mut self) -> anyhow::Result<()> {
        self.step(Direction::Reverse)
    }

    /// The key under the iterator. Panics if the iterator is invalid.
    pub fn key(&mut self) -> &[u8] {
        match self.sync_readable() {
            Source::Overlay => self.data.key(),
            Source::Store => self.db.key(),
        }
    }

    /// The value under the iterator. Panics if the iterator is invalid.
    pub fn value(&mut self) -> &[u8] {
        match self.sync_readable() {
            Source::Overlay => self.data.value(),
            Source::Store => self.db.value(),
        }
    }

    fn reposition(
        &mut self,
        direction: Direction,
        position: impl FnOnce(&mut OverlayIterator<S::Comparator>, &mut S::Iter) -> anyhow::Result<()>,
    ) -> anyhow::Result<()> {
        assert!(
            !self.txn.iterator_invalidated(self.id),
            "iterator repositioned after its transaction finished"
        );

        self.current = None;
        self.direction = direction;
        let _ = self.txn.take_iterator_dirty(self.id);
        self.data = self.txn.overlay_cursor();

        position(&mut self.data, &mut self.db)?;
        self.current = merge::reconcile(&mut self.data, &mut self.db, direction)?;
        Ok(())
    }

    fn step(&mut self, to: Direction) -> anyhow::Result<()> {
        let current = self.sync();
        let from = std::mem::replace(&mut self.direction, to);

        self.current = None;
        self.current = merge::step(&mut self.data, &mut self.db, current, from, to)?;
        Ok(())
    }

    // Like `sync`, but the key under the cursor must not have been deleted.
    fn sync_readable(&mut self) -> Source {
        let current = self.sync();
        assert!(
            current == Source::Store || !self.data.is_deleted(),
            "merging iterator read at a key deleted through its transaction"
        );
        current
    }

    // Catch up with writes made through the transaction since the last call. Returns the
    // current source, which is the overlay if the key under the cursor was deleted. Panics if the
    // iterator is not positioned.
    fn sync(&mut self) -> Source {
        let current = match self.current {
            Some(current) if !self.txn.iterator_invalidated(self.id) => current,
            // PANIC: part of the contract of every caller.
            _ => panic!("merging iterator used while invalid"),
        };
        if !self.txn.take_iterator_dirty(self.id) {
            return current;
        }

        self.txn.refresh_overlay_cursor(&mut self.data);
        let current = merge::resync(&mut self.data, &self.db, current, self.direction);
        self.current = Some(current);

        self.txn.metrics().count(Metric::IteratorResyncs);
        tracing::trace!(iterator = self.id, ?current, "iterator caught up with the overlay");
        current
    }
}

impl<S: OrderedStore> Drop for MergingIterator<'_, S> {
    fn drop(&mut self) {
        self.txn.unregister_iterator(self.id);
    }
}
