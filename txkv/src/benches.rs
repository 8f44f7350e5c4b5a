#![cfg(feature = "benchmarks")]

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion};
use rand::Rng;

use crate::{Bytewise, MemStore, Transaction};

const STORE_KEYS: u32 = 10_000;

pub fn merge_benchmark(c: &mut Criterion) {
    scan_benchmark(c);
    seek_benchmark(c);
}

fn key(i: u32) -> [u8; 4] {
    i.to_be_bytes()
}

// a store with `STORE_KEYS` keys and a transaction that touched every `stride`-th of them,
// deleting half of those.
fn setup(stride: u32) -> Transaction<MemStore<Bytewise>> {
    let store = MemStore::from_entries((0..STORE_KEYS).map(|i| (key(i * 2), key(i))));
    let txn = Transaction::new(Arc::new(store));
    for i in (0..STORE_KEYS * 2).step_by(stride as usize) {
        if i % (stride * 2) == 0 {
            txn.delete(&key(i));
        } else {
            txn.put(&key(i), &key(i));
        }
    }
    txn
}

fn scan_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("merged_scan");

    for stride in [1, 7, 64, 1024] {
        let txn = setup(stride);
        group.bench_function(BenchmarkId::new("overlay_stride", stride), |b| {
            b.iter(|| {
                let mut iter = txn.create_iterator();
                let mut visited = 0usize;
                // UNWRAP: the in-memory store does not fail.
                iter.seek_to_first().unwrap();
                while iter.valid() {
                    visited += iter.value().len();
                    iter.next().unwrap();
                }
                visited
            });
        });
        txn.rollback();
    }

    group.finish();
}

fn seek_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("merged_seek");
    let mut rand = rand::thread_rng();

    for stride in [1, 64] {
        let txn = setup(stride);
        let mut iter = txn.create_iterator();
        group.bench_function(BenchmarkId::new("overlay_stride", stride), |b| {
            b.iter_batched(
                || key(rand.gen_range(0..STORE_KEYS * 2)),
                |target| iter.seek(&target).unwrap(),
                criterion::BatchSize::SmallInput,
            )
        });
        drop(iter);
        txn.rollback();
    }

    group.finish();
}
