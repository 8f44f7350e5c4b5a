//! Read-write transactions.
//!
//! A [`Transaction`] buffers writes in an [`OverlayMap`] and reads through it to a snapshot of the
//! store taken when the transaction began. Nothing reaches the store until [`Transaction::commit`],
//! which writes the whole overlay as one atomic batch.
//!
//! Transactions are single-threaded. All methods take `&self` so that the transaction can be
//! written to while [`MergingIterator`]s borrow it; iterators pick up such writes lazily.

use std::{
    cell::{Cell, RefCell},
    cmp::Ordering,
    sync::Arc,
};

use anyhow::Context;
use txkv_core::{Comparator, Value, ValueChange};

use crate::{
    iterator::MergingIterator,
    metrics::{Metric, Metrics},
    options::Options,
    overlay::{OverlayIterator, OverlayMap},
    registry::Registry,
    store::OrderedStore,
};

/// The outcome of a read through a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The key was written in this transaction.
    Overlay(Value),
    /// The key was deleted in this transaction. The store was not consulted.
    Deleted,
    /// The transaction did not touch the key, so the read went to the snapshot.
    Store(Option<Value>),
}

impl Lookup {
    /// The value visible to the transaction, if any.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Lookup::Overlay(value) => Some(value),
            Lookup::Deleted => None,
            Lookup::Store(value) => value,
        }
    }

    pub fn is_deleted_locally(&self) -> bool {
        matches!(self, Lookup::Deleted)
    }

    /// Whether the key has a value visible to the transaction.
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Overlay(_) | Lookup::Store(Some(_)))
    }
}

/// A read-write transaction over an [`OrderedStore`].
///
/// A transaction must be finished with [`Transaction::commit`] or [`Transaction::rollback`].
/// Using it afterwards panics. Dropping it unfinished discards its writes and is reported, see
/// [`Options::strict_finish`].
pub struct Transaction<S: OrderedStore> {
    store: Arc<S>,
    // `None` once finished.
    snapshot: RefCell<Option<S::Snapshot>>,
    overlay: RefCell<OverlayMap<S::Comparator>>,
    iterators: RefCell<Registry>,
    finished: Cell<bool>,
    metrics: Metrics,
    strict_finish: bool,
}

impl<S: OrderedStore> Transaction<S> {
    /// Begin a transaction on `store` with default options and no metrics.
    pub fn new(store: Arc<S>) -> Self {
        Self::open(store, &Options::default(), Metrics::new(false))
    }

    pub(crate) fn open(store: Arc<S>, options: &Options, metrics: Metrics) -> Self {
        let snapshot = store.snapshot();
        tracing::trace!(
            comparator = <S::Comparator as Comparator>::name(),
            "transaction started"
        );
        Transaction {
            store,
            snapshot: RefCell::new(Some(snapshot)),
            overlay: RefCell::new(OverlayMap::new()),
            iterators: RefCell::new(Registry::default()),
            finished: Cell::new(false),
            metrics,
            strict_finish: options.strict_finish,
        }
    }

    /// Read the value of `key` as seen by this transaction.
    pub fn get(&self, key: &[u8]) -> anyhow::Result<Option<Value>> {
        Ok(self.lookup(key)?.into_value())
    }

    /// Read `key`, reporting whether the answer came from this transaction's own writes.
    ///
    /// Keys written in the transaction are answered without touching the store.
    pub fn lookup(&self, key: &[u8]) -> anyhow::Result<Lookup> {
        self.assert_live();

        if let Some(change) = self.overlay.borrow().get(key) {
            self.metrics.count(Metric::OverlayHits);
            return Ok(match change {
                ValueChange::Insert(value) => Lookup::Overlay(value.clone()),
                ValueChange::Delete => Lookup::Deleted,
            });
        }

        self.metrics.count(Metric::StoreReads);
        let snapshot = self.snapshot.borrow();
        // UNWRAP: the snapshot is released only when the transaction finishes.
        let snapshot = snapshot.as_ref().unwrap();
        let value = self
            .store
            .get(key, snapshot)
            .context("failed to read from the store snapshot")?;
        Ok(Lookup::Store(value))
    }

    /// Buffer a write of `value` under `key`.
    pub fn put(&self, key: &[u8], value: &[u8]) {
        self.assert_live();
        self.overlay.borrow_mut().put(key, value);
        self.iterators.borrow_mut().mark_dirty();
        self.metrics.count(Metric::BufferedWrites);
    }

    /// Buffer a deletion of `key`. The deletion is recorded even if the store does not hold the
    /// key.
    pub fn delete(&self, key: &[u8]) {
        self.assert_live();
        self.overlay.borrow_mut().delete(key);
        self.iterators.borrow_mut().mark_dirty();
        self.metrics.count(Metric::BufferedDeletes);
    }

    /// Delete every key visible to the transaction in `[begin, end)`. Returns the number of keys
    /// deleted.
    pub fn remove_range(&self, begin: &[u8], end: &[u8]) -> anyhow::Result<usize> {
        let mut iter = self.create_iterator();
        iter.seek(begin)?;

        let mut removed = 0;
        while iter.valid() {
            let key = iter.key();
            if <S::Comparator as Comparator>::compare(key, end) != Ordering::Less {
                break;
            }
            let key = key.to_vec();
            self.delete(&key);
            removed += 1;
            iter.next()?;
        }
        Ok(removed)
    }

    /// Create an iterator over the transaction's view: the snapshot with the buffered writes
    /// applied.
    ///
    /// The iterator starts out unpositioned.
    pub fn create_iterator(&self) -> MergingIterator<'_, S> {
        self.assert_live();
        MergingIterator::new(self)
    }

    /// Write all buffered changes to the store as a single batch and finish the transaction.
    ///
    /// A transaction without changes finishes without contacting the store. If the store rejects
    /// the batch, the error is returned and the transaction is left as it was, unfinished. Only
    /// successful commits are timed.
    pub fn commit(&self) -> anyhow::Result<()> {
        self.assert_live();
        let timer = self.metrics.record(Metric::CommitTime);

        let batch = {
            let overlay = self.overlay.borrow();
            (!overlay.is_empty()).then(|| overlay.to_write_batch())
        };

        match batch {
            Some(batch) => {
                let written = self.store.write(&batch).with_context(|| {
                    format!("failed to commit a batch of {} operations", batch.len())
                });
                if let Err(err) = written {
                    if let Some(timer) = timer {
                        timer.discard();
                    }
                    return Err(err);
                }
                tracing::debug!(
                    ops = batch.len(),
                    bytes = batch.approximate_size(),
                    "transaction committed"
                );
            }
            None => tracing::debug!("empty transaction committed"),
        }

        self.overlay.borrow_mut().clear();
        self.metrics.count(Metric::Commits);
        self.finish();
        Ok(())
    }

    /// Discard all buffered changes and finish the transaction.
    pub fn rollback(&self) {
        self.assert_live();
        let discarded = {
            let mut overlay = self.overlay.borrow_mut();
            let discarded = overlay.len();
            overlay.clear();
            discarded
        };
        tracing::debug!(discarded, "transaction rolled back");
        self.metrics.count(Metric::Rollbacks);
        self.finish();
    }

    fn finish(&self) {
        self.finished.set(true);
        self.iterators.borrow_mut().invalidate_all();
        self.snapshot.borrow_mut().take();
    }

    /// Whether the transaction was committed or rolled back.
    pub fn is_finished(&self) -> bool {
        self.finished.get()
    }

    /// Whether the transaction has buffered any change.
    pub fn has_changes(&self) -> bool {
        !self.overlay.borrow().is_empty()
    }

    /// The number of keys with a buffered change.
    pub fn len(&self) -> usize {
        self.overlay.borrow().len()
    }

    /// The number of key and value bytes buffered.
    pub fn approximate_size(&self) -> usize {
        self.overlay.borrow().approximate_size()
    }

    /// The number of iterators currently alive over the transaction.
    pub fn live_iterators(&self) -> usize {
        self.iterators.borrow().len()
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn assert_live(&self) {
        assert!(
            !self.finished.get(),
            "transaction used after it was committed or rolled back"
        );
    }

    pub(crate) fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub(crate) fn register_iterator(&self) -> usize {
        self.iterators.borrow_mut().register()
    }

    pub(crate) fn unregister_iterator(&self, id: usize) {
        self.iterators.borrow_mut().unregister(id);
    }

    pub(crate) fn take_iterator_dirty(&self, id: usize) -> bool {
        self.iterators.borrow_mut().take_dirty(id)
    }

    pub(crate) fn iterator_dirty(&self, id: usize) -> bool {
        self.iterators.borrow().is_dirty(id)
    }

    // Whether the overlay holds a tombstone for `key`.
    pub(crate) fn has_tombstone(&self, key: &[u8]) -> bool {
        matches!(self.overlay.borrow().get(key), Some(ValueChange::Delete))
    }

    pub(crate) fn iterator_invalidated(&self, id: usize) -> bool {
        self.iterators.borrow().is_invalidated(id)
    }

    pub(crate) fn overlay_cursor(&self) -> OverlayIterator<S::Comparator> {
        self.overlay.borrow().cursor()
    }

    pub(crate) fn refresh_overlay_cursor(&self, cursor: &mut OverlayIterator<S::Comparator>) {
        cursor.refresh(&self.overlay.borrow());
    }

    pub(crate) fn store_iterator(&self) -> S::Iter {
        let snapshot = self.snapshot.borrow();
        // UNWRAP: iterators are only created while the transaction is live.
        self.store.new_iterator(snapshot.as_ref().unwrap())
    }
}

impl<S: OrderedStore> Drop for Transaction<S> {
    fn drop(&mut self) {
        if self.finished.get() {
            return;
        }

        let pending = self.overlay.get_mut().len();
        if self.strict_finish && !std::thread::panicking() {
            panic!("transaction with {pending} pending changes dropped without commit or rollback");
        }
        tracing::warn!(
            pending,
            "transaction dropped without commit or rollback, discarding its changes"
        );
    }
}
