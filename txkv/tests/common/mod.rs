use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Once,
};

use parking_lot::Mutex;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use txkv::{
    Bytewise, MemIterator, MemSnapshot, MemStore, MergingIterator, OrderedStore, StoreIterator,
    Value, WriteBatch,
};

const ENV_NAME: &str = "TXKV_LOG";

/// Install a subscriber printing through the test harness. Filtered by `TXKV_LOG`, silent by
/// default.
#[allow(dead_code)]
pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::builder()
            .with_default_directive(LevelFilter::OFF.into())
            .with_env_var(ENV_NAME)
            .from_env_lossy();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

#[allow(dead_code)]
pub fn mem_store(entries: &[(&str, &str)]) -> Arc<MemStore<Bytewise>> {
    Arc::new(MemStore::from_entries(entries.iter().copied()))
}

#[allow(dead_code)]
pub fn pairs(entries: &[(&str, &str)]) -> Vec<(Vec<u8>, Vec<u8>)> {
    entries
        .iter()
        .map(|(k, v)| (k.as_bytes().to_vec(), v.as_bytes().to_vec()))
        .collect()
}

/// Walk the whole merged view from the first key.
#[allow(dead_code)]
pub fn collect_forward<S: OrderedStore>(
    iter: &mut MergingIterator<'_, S>,
) -> Vec<(Vec<u8>, Value)> {
    let mut items = Vec::new();
    iter.seek_to_first().unwrap();
    while iter.valid() {
        let key = iter.key().to_vec();
        items.push((key, iter.value().to_vec()));
        iter.next().unwrap();
    }
    items
}

/// Walk the whole merged view from the last key. Items are returned in visiting order.
#[allow(dead_code)]
pub fn collect_reverse<S: OrderedStore>(
    iter: &mut MergingIterator<'_, S>,
) -> Vec<(Vec<u8>, Value)> {
    let mut items = Vec::new();
    iter.seek_to_last().unwrap();
    while iter.valid() {
        let key = iter.key().to_vec();
        items.push((key, iter.value().to_vec()));
        iter.prev().unwrap();
    }
    items
}

/// A [`MemStore`] that records the batches written to it and can be told to fail.
#[allow(dead_code)]
#[derive(Default)]
pub struct TestStore {
    inner: MemStore<Bytewise>,
    writes: Mutex<Vec<WriteBatch>>,
    fail_writes: AtomicBool,
    fail_iterators: Arc<AtomicBool>,
}

#[allow(dead_code)]
impl TestStore {
    pub fn new(entries: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(TestStore {
            inner: MemStore::from_entries(entries.iter().copied()),
            ..Default::default()
        })
    }

    /// The batches that were applied, in order.
    pub fn writes(&self) -> Vec<WriteBatch> {
        self.writes.lock().clone()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    /// Make every cursor movement of every iterator fail, including existing ones.
    pub fn fail_iterators(&self, fail: bool) {
        self.fail_iterators.store(fail, Ordering::Relaxed);
    }

    pub fn dump(&self) -> Vec<(Vec<u8>, Value)> {
        self.inner.dump()
    }
}

impl OrderedStore for TestStore {
    type Comparator = Bytewise;
    type Snapshot = MemSnapshot<Bytewise>;
    type Iter = TestIterator;

    fn snapshot(&self) -> Self::Snapshot {
        self.inner.snapshot()
    }

    fn get(&self, key: &[u8], snapshot: &Self::Snapshot) -> anyhow::Result<Option<Value>> {
        self.inner.get(key, snapshot)
    }

    fn new_iterator(&self, snapshot: &Self::Snapshot) -> TestIterator {
        TestIterator {
            inner: self.inner.new_iterator(snapshot),
            fail: self.fail_iterators.clone(),
        }
    }

    fn write(&self, batch: &WriteBatch) -> anyhow::Result<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            anyhow::bail!("disk full");
        }
        self.inner.write(batch)?;
        self.writes.lock().push(batch.clone());
        Ok(())
    }
}

pub struct TestIterator {
    inner: MemIterator<Bytewise>,
    fail: Arc<AtomicBool>,
}

impl TestIterator {
    fn check(&self) -> anyhow::Result<()> {
        if self.fail.load(Ordering::Relaxed) {
            anyhow::bail!("io error");
        }
        Ok(())
    }
}

impl StoreIterator for TestIterator {
    fn valid(&self) -> bool {
        self.inner.valid()
    }

    fn seek_to_first(&mut self) -> anyhow::Result<()> {
        self.check()?;
        self.inner.seek_to_first()
    }

    fn seek_to_last(&mut self) -> anyhow::Result<()> {
        self.check()?;
        self.inner.seek_to_last()
    }

    fn seek(&mut self, target: &[u8]) -> anyhow::Result<()> {
        self.check()?;
        self.inner.seek(target)
    }

    fn next(&mut self) -> anyhow::Result<()> {
        self.check()?;
        self.inner.next()
    }

    fn prev(&mut self) -> anyhow::Result<()> {
        self.check()?;
        self.inner.prev()
    }

    fn key(&self) -> &[u8] {
        self.inner.key()
    }

    fn value(&self) -> &[u8] {
        self.inner.value()
    }
}
