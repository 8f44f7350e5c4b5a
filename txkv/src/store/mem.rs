use imbl::OrdMap;
use parking_lot::RwLock;
use txkv_core::{BatchOp, Bytewise, Comparator, OrderedKey, Value, WriteBatch};

use super::{OrderedStore, StoreIterator};
use crate::cursor::OrdCursor;

/// An in-memory [`OrderedStore`].
///
/// Snapshots are structural copies of the whole store and cost O(1) to take. A write applies the
/// batch to a copy of the current state and then swaps the copy in, so readers observe either
/// all of a batch or none of it.
pub struct MemStore<C: Comparator = Bytewise> {
    state: RwLock<State<C>>,
}

struct State<C: Comparator> {
    entries: OrdMap<OrderedKey<C>, Value>,
    // bumped by every write.
    seqn: u64,
}

/// A snapshot of a [`MemStore`].
pub struct MemSnapshot<C: Comparator> {
    entries: OrdMap<OrderedKey<C>, Value>,
    seqn: u64,
}

impl<C: Comparator> MemSnapshot<C> {
    /// The sequence number of the last write visible in this snapshot.
    pub fn seqn(&self) -> u64 {
        self.seqn
    }
}

impl<C: Comparator> Clone for MemSnapshot<C> {
    fn clone(&self) -> Self {
        MemSnapshot {
            entries: self.entries.clone(),
            seqn: self.seqn,
        }
    }
}

impl<C: Comparator> MemStore<C> {
    /// Create an empty store.
    pub fn new() -> Self {
        MemStore {
            state: RwLock::new(State {
                entries: OrdMap::new(),
                seqn: 0,
            }),
        }
    }

    /// Create a store holding the given entries. Later duplicates overwrite earlier ones.
    pub fn from_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let entries = entries
            .into_iter()
            .map(|(k, v)| (OrderedKey::from_slice(k.as_ref()), v.as_ref().to_vec()))
            .collect();
        MemStore {
            state: RwLock::new(State { entries, seqn: 0 }),
        }
    }

    /// The number of keys currently stored.
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    /// The number of writes applied so far.
    pub fn seqn(&self) -> u64 {
        self.state.read().seqn
    }

    /// Copy out the current contents in key order.
    pub fn dump(&self) -> Vec<(Vec<u8>, Value)> {
        self.state
            .read()
            .entries
            .iter()
            .map(|(k, v)| (k.to_vec(), v.clone()))
            .collect()
    }
}

impl<C: Comparator> Default for MemStore<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Comparator> OrderedStore for MemStore<C> {
    type Comparator = C;
    type Snapshot = MemSnapshot<C>;
    type Iter = MemIterator<C>;

    fn snapshot(&self) -> MemSnapshot<C> {
        let state = self.state.read();
        MemSnapshot {
            entries: state.entries.clone(),
            seqn: state.seqn,
        }
    }

    fn get(&self, key: &[u8], snapshot: &MemSnapshot<C>) -> anyhow::Result<Option<Value>> {
        Ok(snapshot
            .entries
            .get(&OrderedKey::from_slice(key))
            .cloned())
    }

    fn new_iterator(&self, snapshot: &MemSnapshot<C>) -> MemIterator<C> {
        MemIterator {
            cursor: OrdCursor::new(snapshot.entries.clone()),
        }
    }

    fn write(&self, batch: &WriteBatch) -> anyhow::Result<()> {
        let mut state = self.state.write();
        let mut entries = state.entries.clone();
        for op in batch {
            match op {
                BatchOp::Put { key, value } => {
                    entries.insert(OrderedKey::from_slice(key), value.clone());
                }
                BatchOp::Delete { key } => {
                    entries.remove(&OrderedKey::from_slice(key));
                }
            }
        }
        state.entries = entries;
        state.seqn += 1;
        tracing::trace!(ops = batch.len(), seqn = state.seqn, "applied write batch");
        Ok(())
    }
}

/// A cursor over a [`MemSnapshot`].
pub struct MemIterator<C: Comparator> {
    cursor: OrdCursor<C, Value>,
}

impl<C: Comparator> StoreIterator for MemIterator<C> {
    fn valid(&self) -> bool {
        self.cursor.valid()
    }

    fn seek_to_first(&mut self) -> anyhow::Result<()> {
        self.cursor.seek_to_first();
        Ok(())
    }

    fn seek_to_last(&mut self) -> anyhow::Result<()> {
        self.cursor.seek_to_last();
        Ok(())
    }

    fn seek(&mut self, target: &[u8]) -> anyhow::Result<()> {
        self.cursor.seek(target);
        Ok(())
    }

    fn next(&mut self) -> anyhow::Result<()> {
        self.cursor.next();
        Ok(())
    }

    fn prev(&mut self) -> anyhow::Result<()> {
        self.cursor.prev();
        Ok(())
    }

    fn key(&self) -> &[u8] {
        self.cursor.key()
    }

    fn value(&self) -> &[u8] {
        self.cursor.entry()
    }
}
