//! A bidirectional cursor over an owned copy of an ordered map.
//!
//! The cursor remembers the key it is positioned on instead of holding a borrowed iterator. This
//! lets it step in either direction at any time, and lets the map be swapped for a newer version
//! without losing the position, as long as the newer version still contains the key.
//!
//! Copies of an [`OrdMap`] share structure and keys share their bytes, so handing a map to a
//! cursor and moving the cursor around are both cheap.

use std::ops::Bound;

use imbl::OrdMap;
use txkv_core::{Comparator, OrderedKey};

pub(crate) struct OrdCursor<C: Comparator, V: Clone> {
    map: OrdMap<OrderedKey<C>, V>,
    // `None` means the cursor is not positioned on an entry.
    position: Option<OrderedKey<C>>,
}

impl<C: Comparator, V: Clone> OrdCursor<C, V> {
    pub fn new(map: OrdMap<OrderedKey<C>, V>) -> Self {
        OrdCursor {
            map,
            position: None,
        }
    }

    pub fn valid(&self) -> bool {
        self.position.is_some()
    }

    pub fn seek_to_first(&mut self) {
        self.position = self.map.iter().next().map(|(k, _)| k.clone());
    }

    pub fn seek_to_last(&mut self) {
        self.position = self.map.iter().next_back().map(|(k, _)| k.clone());
    }

    /// Position at the first entry whose key is at or after `target`.
    pub fn seek(&mut self, target: &[u8]) {
        let target = OrderedKey::<C>::from_slice(target);
        self.position = self
            .map
            .range((Bound::Included(target), Bound::Unbounded))
            .next()
            .map(|(k, _)| k.clone());
    }

    pub fn next(&mut self) {
        let Some(position) = self.position.take() else {
            // PANIC: part of the function's contract.
            panic!("cursor advanced while not positioned")
        };
        self.position = self
            .map
            .range((Bound::Excluded(position), Bound::Unbounded))
            .next()
            .map(|(k, _)| k.clone());
    }

    pub fn prev(&mut self) {
        let Some(position) = self.position.take() else {
            // PANIC: part of the function's contract.
            panic!("cursor advanced while not positioned")
        };
        self.position = self
            .map
            .range((Bound::Unbounded, Bound::Excluded(position)))
            .next_back()
            .map(|(k, _)| k.clone());
    }

    pub fn key(&self) -> &[u8] {
        self.position().as_bytes()
    }

    pub fn entry(&self) -> &V {
        // UNWRAP: positions are only ever taken from keys in the map, and a replacement map is
        // required to still hold the position.
        self.map.get(self.position()).unwrap()
    }

    /// Swap in another version of the map, keeping the current position.
    ///
    /// The new map must contain the key the cursor is positioned on, if any.
    pub fn replace_map(&mut self, map: OrdMap<OrderedKey<C>, V>) {
        debug_assert!(self
            .position
            .as_ref()
            .map_or(true, |position| map.contains_key(position)));
        self.map = map;
    }

    fn position(&self) -> &OrderedKey<C> {
        match self.position {
            Some(ref position) => position,
            // PANIC: part of the function's contract.
            None => panic!("cursor read while not positioned"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::OrdCursor;
    use imbl::OrdMap;
    use txkv_core::{Bytewise, OrderedKey};

    fn map(keys: &[&str]) -> OrdMap<OrderedKey<Bytewise>, u32> {
        keys.iter()
            .enumerate()
            .map(|(i, k)| (OrderedKey::from_slice(k.as_bytes()), i as u32))
            .collect()
    }

    #[test]
    fn seek_is_lower_bound() {
        let mut cursor = OrdCursor::new(map(&["b", "d", "f"]));
        cursor.seek(b"c");
        assert_eq!(cursor.key(), b"d");
        cursor.seek(b"d");
        assert_eq!(cursor.key(), b"d");
        cursor.seek(b"g");
        assert!(!cursor.valid());
        cursor.seek(b"");
        assert_eq!(cursor.key(), b"b");
    }

    #[test]
    fn steps_off_both_ends() {
        let mut cursor = OrdCursor::new(map(&["a", "b"]));
        cursor.seek_to_last();
        assert_eq!(cursor.key(), b"b");
        assert_eq!(*cursor.entry(), 1);
        cursor.next();
        assert!(!cursor.valid());

        cursor.seek_to_first();
        assert_eq!(cursor.key(), b"a");
        cursor.prev();
        assert!(!cursor.valid());
    }

    #[test]
    fn empty_map_is_never_valid() {
        let mut cursor = OrdCursor::<Bytewise, u32>::new(OrdMap::new());
        cursor.seek_to_first();
        assert!(!cursor.valid());
        cursor.seek_to_last();
        assert!(!cursor.valid());
        cursor.seek(b"x");
        assert!(!cursor.valid());
    }

    #[test]
    fn replace_map_keeps_position() {
        let mut cursor = OrdCursor::new(map(&["a", "c"]));
        cursor.seek(b"a");

        let mut newer = map(&["a", "c"]);
        newer.insert(OrderedKey::from_slice(b"b"), 7);
        cursor.replace_map(newer);

        assert_eq!(cursor.key(), b"a");
        cursor.next();
        assert_eq!(cursor.key(), b"b");
        assert_eq!(*cursor.entry(), 7);
    }

    #[test]
    #[should_panic]
    fn reading_unpositioned_panics() {
        let cursor = OrdCursor::new(map(&["a"]));
        let _ = cursor.key();
    }
}
