//! The merge of an overlay cursor with a store cursor.
//!
//! The merged view is the store snapshot with the overlay laid over it: an overlay entry replaces
//! the store entry with the same key, and an overlay tombstone hides it. Two cursors are kept,
//! one per source, and the merged position is whichever of them holds the next key in the
//! traversal direction (the "current" cursor).
//!
//! Invariant, whenever the merged view is positioned:
//!   - the current cursor holds the smallest (forward) or largest (reverse) key of the two;
//!   - the other cursor is invalid, or strictly past that key in the traversal direction;
//!   - the current cursor is never on a tombstone, except after [`resync`] when the current key
//!     itself was deleted. The merged view then holds no entry, but keeps its place so that it
//!     can still be stepped to either neighbour.
//!
//! Reversing the direction breaks the second point, since the other cursor then sits on the wrong
//! side of the current key. [`step`] repositions it before moving.

use std::cmp::Ordering;

use txkv_core::Comparator;

use crate::{overlay::OverlayIterator, store::StoreIterator};

/// The direction the merged view was last moved in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Forward,
    Reverse,
}

/// Which cursor the merged view reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Source {
    Overlay,
    Store,
}

impl Direction {
    // whether `a` comes strictly before `b` when traversing in this direction.
    fn precedes<C: Comparator>(self, a: &[u8], b: &[u8]) -> bool {
        let before = match self {
            Direction::Forward => Ordering::Less,
            Direction::Reverse => Ordering::Greater,
        };
        C::compare(a, b) == before
    }

    fn step_overlay<C: Comparator>(self, data: &mut OverlayIterator<C>) {
        match self {
            Direction::Forward => data.next(),
            Direction::Reverse => data.prev(),
        }
    }

    fn step_store(self, db: &mut impl StoreIterator) -> anyhow::Result<()> {
        match self {
            Direction::Forward => db.next(),
            Direction::Reverse => db.prev(),
        }
    }
}

fn same_key<C: Comparator>(a: &[u8], b: &[u8]) -> bool {
    C::compare(a, b) == Ordering::Equal
}

/// Resolve equal keys and tombstones after either cursor moved, then select the current cursor.
///
/// Both cursors must be on the correct side of the last merged position for `direction`. Returns
/// `None` when the merged view is exhausted.
pub(crate) fn reconcile<C: Comparator, I: StoreIterator>(
    data: &mut OverlayIterator<C>,
    db: &mut I,
    direction: Direction,
) -> anyhow::Result<Option<Source>> {
    loop {
        if data.valid() && db.valid() && same_key::<C>(data.key(), db.key()) {
            // the overlay decides what happens to this key. the store entry is shadowed.
            direction.step_store(db)?;
        }

        // a tombstone ahead of the store cursor has nothing left to hide.
        let skip_tombstone = data.valid()
            && data.is_deleted()
            && (!db.valid() || direction.precedes::<C>(data.key(), db.key()));
        if !skip_tombstone {
            break;
        }
        direction.step_overlay(data);
    }

    let selected = select(data, db, direction);
    debug_assert!(selected != Some(Source::Overlay) || !data.is_deleted());
    Ok(selected)
}

/// Pick the cursor holding the next key in `direction`. Ties go to the overlay.
pub(crate) fn select<C: Comparator, I: StoreIterator>(
    data: &OverlayIterator<C>,
    db: &I,
    direction: Direction,
) -> Option<Source> {
    match (data.valid(), db.valid()) {
        (false, false) => None,
        (true, false) => Some(Source::Overlay),
        (false, true) => Some(Source::Store),
        (true, true) if direction.precedes::<C>(db.key(), data.key()) => Some(Source::Store),
        (true, true) => Some(Source::Overlay),
    }
}

/// Move the merged view one entry in direction `to`, having last moved in direction `from`.
///
/// `current` must be the current cursor of a positioned merged view.
pub(crate) fn step<C: Comparator, I: StoreIterator>(
    data: &mut OverlayIterator<C>,
    db: &mut I,
    current: Source,
    from: Direction,
    to: Direction,
) -> anyhow::Result<Option<Source>> {
    if from != to {
        turn(data, db, current, to)?;
    } else {
        clear_current_key(data, db, current, to)?;
    }

    match current {
        Source::Overlay => to.step_overlay(data),
        Source::Store => to.step_store(db)?,
    }
    reconcile(data, db, to)
}

// Put the other cursor strictly past the current key for traversal in `direction`, which is the
// opposite of the direction it was positioned for.
fn turn<C: Comparator, I: StoreIterator>(
    data: &mut OverlayIterator<C>,
    db: &mut I,
    current: Source,
    direction: Direction,
) -> anyhow::Result<()> {
    match (current, direction) {
        (Source::Store, Direction::Forward) => {
            let key = db.key();
            data.seek(key);
            if data.valid() && same_key::<C>(data.key(), key) {
                data.next();
            }
        }
        (Source::Overlay, Direction::Forward) => {
            let key = data.key();
            db.seek(key)?;
            if db.valid() && same_key::<C>(db.key(), key) {
                db.next()?;
            }
        }
        // seeking lands on the first key at or after the current one, so a single step back is
        // always strictly before it.
        (Source::Store, Direction::Reverse) => {
            data.seek(db.key());
            if data.valid() {
                data.prev();
            } else {
                data.seek_to_last();
            }
        }
        (Source::Overlay, Direction::Reverse) => {
            db.seek(data.key())?;
            if db.valid() {
                db.prev()?;
            } else {
                db.seek_to_last()?;
            }
        }
    }
    Ok(())
}

// A resync may hand the current key over to the overlay while the store cursor still sits on it.
fn clear_current_key<C: Comparator, I: StoreIterator>(
    data: &mut OverlayIterator<C>,
    db: &mut I,
    current: Source,
    direction: Direction,
) -> anyhow::Result<()> {
    match current {
        Source::Overlay => {
            if db.valid() && same_key::<C>(db.key(), data.key()) {
                direction.step_store(db)?;
            }
        }
        Source::Store => {
            if data.valid() && same_key::<C>(data.key(), db.key()) {
                direction.step_overlay(data);
            }
        }
    }
    Ok(())
}

/// Re-establish the invariants after `data` was refreshed with a newer version of the overlay.
///
/// Returns the new current cursor. If the overlay now holds an entry for the current key, the
/// overlay becomes current, even if that entry is a tombstone. In that case the merged view has
/// no entry to read until it is stepped.
pub(crate) fn resync<C: Comparator, I: StoreIterator>(
    data: &mut OverlayIterator<C>,
    db: &I,
    current: Source,
    direction: Direction,
) -> Source {
    if current == Source::Overlay {
        // refreshing kept the overlay cursor on the current key.
        return Source::Overlay;
    }

    let key = db.key();
    data.seek(key);
    if data.valid() && same_key::<C>(data.key(), key) {
        return Source::Overlay;
    }

    if direction == Direction::Reverse {
        if data.valid() {
            data.prev();
        } else {
            data.seek_to_last();
        }
    }
    Source::Store
}
