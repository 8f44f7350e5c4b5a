//! Transactions over ordered key-value stores.
//!
//! A [`Transaction`] buffers puts and deletes in memory on top of a snapshot of an
//! [`OrderedStore`]. Reads see the transaction's own writes, iterators walk the snapshot and the
//! writes merged into one ordered view, and a commit hands all writes to the store as a single
//! atomic [`WriteBatch`].
//!
//! ```
//! use txkv::{Bytewise, Db, MemStore, Options};
//!
//! let store = MemStore::<Bytewise>::from_entries([("a", "1"), ("c", "3")]);
//! let db = Db::new(store, Options::new());
//! let txn = db.begin();
//! txn.put(b"b", b"2");
//! txn.delete(b"c");
//!
//! let mut iter = txn.create_iterator();
//! iter.seek_to_first()?;
//! let mut keys = Vec::new();
//! while iter.valid() {
//!     keys.push(iter.key().to_vec());
//!     iter.next()?;
//! }
//! assert_eq!(keys, [b"a".to_vec(), b"b".to_vec()]);
//!
//! drop(iter);
//! txn.commit()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::sync::Arc;

pub use txkv_core::{BatchOp, Bytewise, Comparator, Reverse, Value, ValueChange, WriteBatch};

pub use iterator::MergingIterator;
pub use metrics::{Metric, Metrics, MetricsReport, TimerGuard};
pub use options::Options;
pub use overlay::{OverlayIterator, OverlayMap};
pub use store::{MemIterator, MemSnapshot, MemStore, OrderedStore, StoreIterator};
pub use transaction::{Lookup, Transaction};
pub use write_only::WriteOnlyTransaction;

#[cfg(feature = "benchmarks")]
pub mod benches;

mod cursor;
mod iterator;
mod merge;
mod metrics;
mod options;
mod overlay;
mod registry;
mod store;
mod transaction;
mod write_only;

/// A handle to a store from which transactions are begun.
///
/// All transactions begun from a handle, or from its clones, share its options and metrics.
pub struct Db<S: OrderedStore> {
    store: Arc<S>,
    options: Options,
    metrics: Metrics,
}

impl<S: OrderedStore> Db<S> {
    pub fn new(store: S, options: Options) -> Self {
        Self::from_shared(Arc::new(store), options)
    }

    /// Create a handle to a store that is also used elsewhere.
    pub fn from_shared(store: Arc<S>, options: Options) -> Self {
        let metrics = Metrics::new(options.metrics);
        Db {
            store,
            options,
            metrics,
        }
    }

    /// Begin a read-write transaction on a snapshot of the store as it is now.
    pub fn begin(&self) -> Transaction<S> {
        Transaction::open(self.store.clone(), &self.options, self.metrics.clone())
    }

    pub fn begin_write_only(&self) -> WriteOnlyTransaction<S> {
        WriteOnlyTransaction::open(self.store.clone(), &self.options, self.metrics.clone())
    }

    /// The metrics collected by transactions of this handle.
    pub fn metrics(&self) -> Metrics {
        self.metrics.clone()
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}

impl<S: OrderedStore> Clone for Db<S> {
    fn clone(&self) -> Self {
        Db {
            store: self.store.clone(),
            options: self.options.clone(),
            metrics: self.metrics.clone(),
        }
    }
}
