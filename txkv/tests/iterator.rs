mod common;

use std::sync::Arc;

use common::{collect_forward, collect_reverse, init_logging, mem_store, pairs, TestStore};
use txkv::{Bytewise, MemStore, Reverse, Transaction};

#[test]
fn merged_scan_hides_deleted_keys() {
    init_logging();
    let txn = Transaction::new(mem_store(&[("a", "1"), ("c", "3")]));
    txn.put(b"b", b"2");
    txn.delete(b"c");

    let mut iter = txn.create_iterator();
    assert_eq!(collect_forward(&mut iter), pairs(&[("a", "1"), ("b", "2")]));
    assert_eq!(collect_reverse(&mut iter), pairs(&[("b", "2"), ("a", "1")]));
    drop(iter);
    txn.rollback();
}

#[test]
fn overlay_replaces_store_values() {
    let txn = Transaction::new(mem_store(&[("a", "1"), ("b", "2"), ("c", "3")]));
    txn.put(b"b", b"20");
    txn.put(b"d", b"4");

    let mut iter = txn.create_iterator();
    let expected = pairs(&[("a", "1"), ("b", "20"), ("c", "3"), ("d", "4")]);
    assert_eq!(collect_forward(&mut iter), expected);
    let mut reverse = collect_reverse(&mut iter);
    reverse.reverse();
    assert_eq!(reverse, expected);
    drop(iter);
    txn.rollback();
}

#[test]
fn empty_view() {
    let txn = Transaction::new(mem_store(&[("a", "1")]));
    txn.delete(b"a");
    txn.delete(b"b");

    let mut iter = txn.create_iterator();
    iter.seek_to_first().unwrap();
    assert!(!iter.valid());
    iter.seek_to_last().unwrap();
    assert!(!iter.valid());
    iter.seek(b"").unwrap();
    assert!(!iter.valid());
    drop(iter);
    txn.rollback();
}

#[test]
fn seek_is_lower_bound_over_visible_keys() {
    let txn = Transaction::new(mem_store(&[("b", "2"), ("d", "4"), ("f", "6")]));
    txn.delete(b"d");
    txn.put(b"e", b"5");

    let mut iter = txn.create_iterator();
    iter.seek(b"c").unwrap();
    assert_eq!(iter.key(), b"e");
    iter.seek(b"d").unwrap();
    assert_eq!(iter.key(), b"e");
    iter.seek(b"b").unwrap();
    assert_eq!(iter.key(), b"b");
    iter.seek(b"a").unwrap();
    assert_eq!(iter.key(), b"b");
    iter.seek(b"g").unwrap();
    assert!(!iter.valid());
    drop(iter);
    txn.rollback();
}

#[test]
fn switching_direction() {
    let txn = Transaction::new(mem_store(&[("a", "1"), ("c", "3"), ("e", "5")]));
    txn.put(b"b", b"2");
    txn.put(b"c", b"30");
    txn.put(b"d", b"4");

    let mut iter = txn.create_iterator();
    iter.seek(b"c").unwrap();
    assert_eq!(iter.value(), b"30");
    iter.prev().unwrap();
    assert_eq!(iter.key(), b"b");
    iter.next().unwrap();
    assert_eq!(iter.key(), b"c");
    iter.next().unwrap();
    assert_eq!(iter.key(), b"d");
    iter.prev().unwrap();
    assert_eq!(iter.key(), b"c");
    iter.prev().unwrap();
    iter.prev().unwrap();
    assert_eq!(iter.key(), b"a");
    iter.prev().unwrap();
    assert!(!iter.valid());

    iter.seek_to_last().unwrap();
    assert_eq!(iter.key(), b"e");
    iter.next().unwrap();
    assert!(!iter.valid());
    drop(iter);
    txn.rollback();
}

#[test]
fn switching_direction_around_tombstones() {
    let txn = Transaction::new(mem_store(&[("a", "1"), ("b", "2"), ("c", "3"), ("d", "4")]));
    txn.delete(b"b");
    txn.delete(b"c");

    let mut iter = txn.create_iterator();
    iter.seek_to_first().unwrap();
    iter.next().unwrap();
    assert_eq!(iter.key(), b"d");
    iter.prev().unwrap();
    assert_eq!(iter.key(), b"a");
    iter.next().unwrap();
    assert_eq!(iter.key(), b"d");
    drop(iter);
    txn.rollback();
}

#[test]
fn writes_ahead_of_the_cursor_are_seen() {
    let txn = Transaction::new(mem_store(&[("a", "1"), ("d", "4"), ("g", "7")]));
    let mut iter = txn.create_iterator();
    iter.seek_to_first().unwrap();

    txn.put(b"b", b"2");
    txn.delete(b"d");
    iter.next().unwrap();
    assert_eq!(iter.key(), b"b");
    txn.put(b"c", b"3");
    iter.next().unwrap();
    assert_eq!(iter.key(), b"c");
    iter.next().unwrap();
    assert_eq!(iter.key(), b"g");
    drop(iter);
    txn.rollback();
}

#[test]
fn writes_behind_the_cursor_are_seen_in_reverse() {
    let txn = Transaction::new(mem_store(&[("a", "1"), ("d", "4"), ("g", "7")]));
    let mut iter = txn.create_iterator();
    iter.seek_to_last().unwrap();

    txn.put(b"e", b"5");
    txn.delete(b"d");
    iter.prev().unwrap();
    assert_eq!(iter.key(), b"e");
    iter.prev().unwrap();
    assert_eq!(iter.key(), b"a");
    txn.put(b"0", b"0");
    iter.prev().unwrap();
    assert_eq!(iter.key(), b"0");
    iter.prev().unwrap();
    assert!(!iter.valid());
    drop(iter);
    txn.rollback();
}

#[test]
fn overwrite_under_the_cursor() {
    let txn = Transaction::new(mem_store(&[("a", "1"), ("b", "2"), ("c", "3")]));
    let mut iter = txn.create_iterator();
    iter.seek(b"b").unwrap();
    assert_eq!(iter.value(), b"2");

    txn.put(b"b", b"20");
    assert_eq!(iter.value(), b"20");
    iter.prev().unwrap();
    assert_eq!(iter.key(), b"a");
    iter.next().unwrap();
    assert_eq!(iter.value(), b"20");
    iter.next().unwrap();
    assert_eq!(iter.key(), b"c");
    iter.next().unwrap();
    assert!(!iter.valid());
    drop(iter);
    txn.rollback();
}

#[test]
fn delete_under_the_cursor_detaches_it() {
    let txn = Transaction::new(mem_store(&[("a", "1"), ("b", "2"), ("c", "3")]));
    let mut iter = txn.create_iterator();
    iter.seek(b"b").unwrap();

    txn.delete(b"b");
    assert!(!iter.valid());
    iter.next().unwrap();
    assert_eq!(iter.key(), b"c");
    iter.prev().unwrap();
    assert_eq!(iter.key(), b"a");
    drop(iter);
    txn.rollback();
}

#[test]
fn delete_under_the_cursor_in_reverse() {
    let txn = Transaction::new(mem_store(&[("a", "1"), ("c", "3")]));
    txn.put(b"b", b"2");
    let mut iter = txn.create_iterator();
    iter.seek_to_last().unwrap();
    iter.prev().unwrap();
    assert_eq!(iter.key(), b"b");

    // the overlay entry under the cursor turns into a tombstone.
    txn.delete(b"b");
    assert!(!iter.valid());
    iter.prev().unwrap();
    assert_eq!(iter.key(), b"a");
    assert_eq!(iter.value(), b"1");

    txn.delete(b"a");
    assert!(!iter.valid());
    iter.next().unwrap();
    assert_eq!(iter.key(), b"c");
    drop(iter);
    txn.rollback();
}

#[test]
fn iterators_share_the_transaction() {
    let txn = Transaction::new(mem_store(&[("a", "1"), ("c", "3")]));
    let mut first = txn.create_iterator();
    let mut second = txn.create_iterator();
    first.seek_to_first().unwrap();
    second.seek_to_last().unwrap();

    txn.put(b"b", b"2");
    first.next().unwrap();
    second.prev().unwrap();
    assert_eq!(first.key(), b"b");
    assert_eq!(second.key(), b"b");
    assert_eq!(txn.live_iterators(), 2);
    drop((first, second));
    txn.rollback();
}

#[test]
fn finishing_invalidates_iterators() {
    let txn = Transaction::new(mem_store(&[("a", "1")]));
    let mut iter = txn.create_iterator();
    iter.seek_to_first().unwrap();
    txn.put(b"b", b"2");
    txn.commit().unwrap();
    assert!(!iter.valid());
}

#[test]
#[should_panic(expected = "used while invalid")]
fn next_after_commit_panics() {
    let txn = Transaction::new(mem_store(&[("a", "1")]));
    let mut iter = txn.create_iterator();
    iter.seek_to_first().unwrap();
    txn.commit().unwrap();
    let _ = iter.next();
}

#[test]
#[should_panic(expected = "after its transaction finished")]
fn seek_after_commit_panics() {
    let txn = Transaction::new(mem_store(&[("a", "1")]));
    let mut iter = txn.create_iterator();
    txn.commit().unwrap();
    let _ = iter.seek(b"a");
}

#[test]
fn store_errors_invalidate() {
    init_logging();
    let store = TestStore::new(&[("a", "1"), ("b", "2")]);
    let txn = Transaction::new(store.clone());
    let mut iter = txn.create_iterator();
    iter.seek_to_first().unwrap();

    store.fail_iterators(true);
    let err = iter.next().unwrap_err();
    assert_eq!(err.to_string(), "io error");
    assert!(!iter.valid());
    assert!(iter.seek_to_last().is_err());
    assert!(!iter.valid());

    store.fail_iterators(false);
    iter.seek_to_last().unwrap();
    assert_eq!(iter.key(), b"b");
    drop(iter);
    txn.rollback();
}

#[test]
fn custom_order() {
    let store = MemStore::<Reverse<Bytewise>>::from_entries([("a", "1"), ("c", "3")]);
    let txn = Transaction::new(Arc::new(store));
    txn.put(b"b", b"2");
    txn.put(b"d", b"4");
    txn.delete(b"a");

    let mut iter = txn.create_iterator();
    assert_eq!(
        collect_forward(&mut iter),
        pairs(&[("d", "4"), ("c", "3"), ("b", "2")])
    );
    iter.seek(b"c").unwrap();
    assert_eq!(iter.key(), b"c");
    iter.next().unwrap();
    assert_eq!(iter.key(), b"b");
    iter.next().unwrap();
    assert!(!iter.valid());
    drop(iter);
    txn.rollback();
}
