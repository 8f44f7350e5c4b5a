//! Buffered mutations and the write batches that carry them to a store.

use alloc::vec::Vec;

use crate::Value;

/// The change buffered for a single key.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshDeserialize, borsh::BorshSerialize)
)]
pub enum ValueChange {
    /// The key is set to the given value.
    Insert(Value),
    /// The key is deleted. This shadows any value the store holds for the key.
    Delete,
}

impl ValueChange {
    /// Whether this change is a deletion (a tombstone).
    pub fn is_delete(&self) -> bool {
        matches!(self, ValueChange::Delete)
    }

    /// The inserted value, or `None` for a deletion.
    pub fn as_value(&self) -> Option<&[u8]> {
        match self {
            ValueChange::Insert(value) => Some(value),
            ValueChange::Delete => None,
        }
    }

    /// The size of the value in bytes. Deletions have no value.
    pub fn value_len(&self) -> usize {
        self.as_value().map_or(0, |v| v.len())
    }
}

/// A single operation within a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshDeserialize, borsh::BorshSerialize)
)]
pub enum BatchOp {
    /// Set `key` to `value`.
    Put { key: Vec<u8>, value: Value },
    /// Remove `key`.
    Delete { key: Vec<u8> },
}

impl BatchOp {
    /// The key this operation applies to.
    pub fn key(&self) -> &[u8] {
        match self {
            BatchOp::Put { key, .. } | BatchOp::Delete { key } => key,
        }
    }

    fn size(&self) -> usize {
        match self {
            BatchOp::Put { key, value } => key.len() + value.len(),
            BatchOp::Delete { key } => key.len(),
        }
    }
}

/// An ordered, append-only sequence of puts and deletes.
///
/// A store applies a batch atomically and in order, so if the same key appears more than once
/// the last operation on it wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshDeserialize, borsh::BorshSerialize)
)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
    approximate_size: u64,
}

impl WriteBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty batch with room for `capacity` operations.
    pub fn with_capacity(capacity: usize) -> Self {
        WriteBatch {
            ops: Vec::with_capacity(capacity),
            approximate_size: 0,
        }
    }

    /// Append a put of `value` under `key`.
    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        self.push(BatchOp::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        });
    }

    /// Append a deletion of `key`.
    pub fn delete(&mut self, key: &[u8]) {
        self.push(BatchOp::Delete { key: key.to_vec() });
    }

    /// Append an already-built operation.
    pub fn push(&mut self, op: BatchOp) {
        self.approximate_size += op.size() as u64;
        self.ops.push(op);
    }

    /// The number of operations in the batch.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the batch holds no operations.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// The total number of key and value bytes in the batch.
    pub fn approximate_size(&self) -> u64 {
        self.approximate_size
    }

    /// Remove all operations.
    pub fn clear(&mut self) {
        self.ops.clear();
        self.approximate_size = 0;
    }

    /// The operations in the order they were appended.
    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    /// Iterate over the operations in the order they were appended.
    pub fn iter(&self) -> core::slice::Iter<'_, BatchOp> {
        self.ops.iter()
    }
}

impl<'a> IntoIterator for &'a WriteBatch {
    type Item = &'a BatchOp;
    type IntoIter = core::slice::Iter<'a, BatchOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

impl IntoIterator for WriteBatch {
    type Item = BatchOp;
    type IntoIter = alloc::vec::IntoIter<BatchOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}
