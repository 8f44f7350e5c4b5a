//! Write-only transactions.
//!
//! When a caller never reads its own writes there is no need for an overlay: operations are
//! appended to a [`WriteBatch`] as they come, duplicates included, and the store applies them in
//! order on commit.

use std::sync::Arc;

use anyhow::Context;
use txkv_core::WriteBatch;

use crate::{
    metrics::{Metric, Metrics},
    options::Options,
    store::OrderedStore,
};

/// A transaction that only writes.
///
/// Like [`crate::Transaction`], it must be finished with [`commit`](Self::commit) or
/// [`rollback`](Self::rollback), and panics when used afterwards.
pub struct WriteOnlyTransaction<S: OrderedStore> {
    store: Arc<S>,
    batch: WriteBatch,
    finished: bool,
    metrics: Metrics,
    strict_finish: bool,
}

impl<S: OrderedStore> WriteOnlyTransaction<S> {
    /// Begin a write-only transaction on `store` with default options and no metrics.
    pub fn new(store: Arc<S>) -> Self {
        Self::open(store, &Options::default(), Metrics::new(false))
    }

    pub(crate) fn open(store: Arc<S>, options: &Options, metrics: Metrics) -> Self {
        WriteOnlyTransaction {
            store,
            batch: WriteBatch::new(),
            finished: false,
            metrics,
            strict_finish: options.strict_finish,
        }
    }

    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        self.assert_live();
        self.batch.put(key, value);
        self.metrics.count(Metric::BufferedWrites);
    }

    pub fn delete(&mut self, key: &[u8]) {
        self.assert_live();
        self.batch.delete(key);
        self.metrics.count(Metric::BufferedDeletes);
    }

    /// Apply all operations to the store atomically and finish the transaction.
    ///
    /// On failure the operations are kept and the transaction stays unfinished. Only successful
    /// commits are timed.
    pub fn commit(&mut self) -> anyhow::Result<()> {
        self.assert_live();
        let timer = self.metrics.record(Metric::CommitTime);

        if !self.batch.is_empty() {
            let written = self.store.write(&self.batch).with_context(|| {
                format!("failed to commit a batch of {} operations", self.batch.len())
            });
            if let Err(err) = written {
                if let Some(timer) = timer {
                    timer.discard();
                }
                return Err(err);
            }
        }
        tracing::debug!(ops = self.batch.len(), "write-only transaction committed");

        self.batch.clear();
        self.finished = true;
        self.metrics.count(Metric::Commits);
        Ok(())
    }

    /// Discard all operations and finish the transaction.
    pub fn rollback(&mut self) {
        self.assert_live();
        tracing::debug!(
            discarded = self.batch.len(),
            "write-only transaction rolled back"
        );
        self.batch.clear();
        self.finished = true;
        self.metrics.count(Metric::Rollbacks);
    }

    /// The number of operations buffered.
    pub fn len(&self) -> usize {
        self.batch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }

    pub fn approximate_size(&self) -> u64 {
        self.batch.approximate_size()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn assert_live(&self) {
        assert!(
            !self.finished,
            "write-only transaction used after it was committed or rolled back"
        );
    }
}

impl<S: OrderedStore> Drop for WriteOnlyTransaction<S> {
    fn drop(&mut self) {
        if self.finished || self.batch.is_empty() {
            return;
        }

        let pending = self.batch.len();
        if self.strict_finish && !std::thread::panicking() {
            panic!("write-only transaction with {pending} operations dropped without commit");
        }
        tracing::warn!(
            pending,
            "write-only transaction dropped without commit or rollback, discarding its operations"
        );
    }
}
