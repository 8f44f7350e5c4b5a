//! Book-keeping for the iterators that are alive over a transaction.
//!
//! The transaction does not own its iterators, but it must be able to tell them that the overlay
//! changed under them, or that they are no longer usable because the transaction finished. Each
//! iterator claims a slot on creation and releases it when dropped; the transaction signals
//! iterators by writing to their slots.

use slab::Slab;

#[derive(Default)]
pub(crate) struct Registry {
    slots: Slab<Signal>,
}

#[derive(Default, Clone, Copy)]
struct Signal {
    // the overlay was written to since the iterator last looked at it.
    dirty: bool,
    // the transaction finished; the iterator may never be used again.
    invalidated: bool,
}

impl Registry {
    pub fn register(&mut self) -> usize {
        self.slots.insert(Signal::default())
    }

    pub fn unregister(&mut self, id: usize) {
        let _ = self.slots.try_remove(id);
    }

    /// The number of registered iterators.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Tell every iterator that the overlay changed.
    pub fn mark_dirty(&mut self) {
        for (_, signal) in self.slots.iter_mut() {
            signal.dirty = true;
        }
    }

    /// Tell every iterator that it can no longer be used.
    pub fn invalidate_all(&mut self) {
        for (_, signal) in self.slots.iter_mut() {
            signal.invalidated = true;
        }
    }

    pub fn is_dirty(&self, id: usize) -> bool {
        self.slots[id].dirty
    }

    /// Whether the iterator must catch up with the overlay. Clears the signal.
    pub fn take_dirty(&mut self, id: usize) -> bool {
        std::mem::take(&mut self.slots[id].dirty)
    }

    pub fn is_invalidated(&self, id: usize) -> bool {
        self.slots[id].invalidated
    }
}
