use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// Metrics collector, if active, it provides Counters and Timers
#[derive(Clone)]
pub struct Metrics {
    metrics: Option<Arc<ActiveMetrics>>,
}

/// Metrics that can be collected during execution
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub enum Metric {
    /// Counter of puts buffered by transactions, read-write or write-only
    BufferedWrites,
    /// Counter of deletes buffered by transactions, read-write or write-only
    BufferedDeletes,
    /// Counter of reads answered by the overlay without touching the store
    OverlayHits,
    /// Counter of reads delegated to the store
    StoreReads,
    /// Counter of successful commits, including empty ones
    Commits,
    /// Counter of rollbacks
    Rollbacks,
    /// Counter of iterators re-synchronized after the overlay changed under them
    IteratorResyncs,
    /// Timer used to record average commit time. Commits rejected by the store are not timed
    CommitTime,
}

struct ActiveMetrics {
    buffered_writes: AtomicU64,
    buffered_deletes: AtomicU64,
    overlay_hits: AtomicU64,
    store_reads: AtomicU64,
    commits: AtomicU64,
    rollbacks: AtomicU64,
    iterator_resyncs: AtomicU64,
    commit_time: Timer,
}

/// A point-in-time copy of all collected metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsReport {
    pub buffered_writes: u64,
    pub buffered_deletes: u64,
    pub overlay_hits: u64,
    pub store_reads: u64,
    pub commits: u64,
    pub rollbacks: u64,
    pub iterator_resyncs: u64,
    /// Mean commit time in nanoseconds, if any commit was timed.
    pub commit_time_mean: Option<u64>,
    /// The number of commits timed.
    pub commit_time_samples: u64,
}

impl Metrics {
    /// Returns the Metrics object, active or not based on the specified input
    pub fn new(active: bool) -> Self {
        Self {
            metrics: if active {
                Some(Arc::new(ActiveMetrics {
                    buffered_writes: AtomicU64::new(0),
                    buffered_deletes: AtomicU64::new(0),
                    overlay_hits: AtomicU64::new(0),
                    store_reads: AtomicU64::new(0),
                    commits: AtomicU64::new(0),
                    rollbacks: AtomicU64::new(0),
                    iterator_resyncs: AtomicU64::new(0),
                    commit_time: Timer::new(),
                }))
            } else {
                None
            },
        }
    }

    /// Whether metrics are being collected.
    pub fn is_active(&self) -> bool {
        self.metrics.is_some()
    }

    /// Increase the Counter specified by the input
    ///
    /// panics if the specified [`Metric`] is not a Counter
    pub fn count(&self, metric: Metric) {
        if let Some(ref metrics) = self.metrics {
            let counter = match metric {
                Metric::BufferedWrites => &metrics.buffered_writes,
                Metric::BufferedDeletes => &metrics.buffered_deletes,
                Metric::OverlayHits => &metrics.overlay_hits,
                Metric::StoreReads => &metrics.store_reads,
                Metric::Commits => &metrics.commits,
                Metric::Rollbacks => &metrics.rollbacks,
                Metric::IteratorResyncs => &metrics.iterator_resyncs,
                _ => panic!("Specified metric is not a Counter"),
            };

            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Returns a guard that, when dropped, will record the time passed since creation.
    /// [`TimerGuard::discard`] drops it without recording.
    ///
    /// panics if the specified [`Metric`] is not a Timer
    pub fn record<'a>(&'a self, metric: Metric) -> Option<TimerGuard<'a>> {
        self.metrics.as_ref().map(|metrics| {
            let timer = match metric {
                Metric::CommitTime => &metrics.commit_time,
                _ => panic!("Specified metric is not a Timer"),
            };

            timer.record()
        })
    }

    /// Take a snapshot of the collected metrics. `None` if collection is not active.
    pub fn report(&self) -> Option<MetricsReport> {
        self.metrics.as_ref().map(|metrics| MetricsReport {
            buffered_writes: metrics.buffered_writes.load(Ordering::Relaxed),
            buffered_deletes: metrics.buffered_deletes.load(Ordering::Relaxed),
            overlay_hits: metrics.overlay_hits.load(Ordering::Relaxed),
            store_reads: metrics.store_reads.load(Ordering::Relaxed),
            commits: metrics.commits.load(Ordering::Relaxed),
            rollbacks: metrics.rollbacks.load(Ordering::Relaxed),
            iterator_resyncs: metrics.iterator_resyncs.load(Ordering::Relaxed),
            commit_time_mean: metrics.commit_time.mean(),
            commit_time_samples: metrics.commit_time.number_of_records.load(Ordering::Relaxed),
        })
    }

    /// Log the collected metrics.
    pub fn print(&self) {
        let Some(report) = self.report() else {
            tracing::info!("metrics collection was not activated");
            return;
        };

        let reads = report.overlay_hits + report.store_reads;
        let overlay_hit_rate = if reads != 0 {
            (report.overlay_hits as f64 / reads as f64) * 100.0
        } else {
            0.0
        };

        tracing::info!(
            writes = report.buffered_writes,
            deletes = report.buffered_deletes,
            reads,
            "overlay hits {:.2}% of reads",
            overlay_hit_rate
        );
        tracing::info!(
            commits = report.commits,
            rollbacks = report.rollbacks,
            resyncs = report.iterator_resyncs,
            "transactions"
        );
        if let Some(mean) = report.commit_time_mean {
            tracing::info!(
                samples = report.commit_time_samples,
                "commit mean {}",
                pretty_display_ns(mean)
            );
        }
    }
}

fn pretty_display_ns(ns: u64) -> String {
    // preserve 3 sig figs at minimum.
    let (val, unit) = if ns > 100 * 1_000_000_000 {
        (ns / 1_000_000_000, "s")
    } else if ns > 100 * 1_000_000 {
        (ns / 1_000_000, "ms")
    } else if ns > 100 * 1_000 {
        (ns / 1_000, "us")
    } else {
        (ns, "ns")
    };

    format!("{val} {unit}")
}

struct Timer {
    number_of_records: AtomicU64,
    sum: AtomicU64,
}

impl Timer {
    fn new() -> Self {
        Timer {
            number_of_records: AtomicU64::new(0),
            sum: AtomicU64::new(0),
        }
    }

    fn mean(&self) -> Option<u64> {
        let n = self.number_of_records.load(Ordering::Relaxed);
        let sum = self.sum.load(Ordering::Relaxed);
        sum.checked_div(n)
    }

    fn record(&self) -> TimerGuard<'_> {
        TimerGuard {
            start: std::time::Instant::now(),
            timer: self,
            armed: true,
        }
    }

    fn add(&self, elapsed: u64) {
        self.number_of_records.fetch_add(1, Ordering::Relaxed);
        self.sum.fetch_add(elapsed, Ordering::Relaxed);
    }
}

/// Records the time since its creation into a timer when dropped.
pub struct TimerGuard<'a> {
    start: std::time::Instant,
    timer: &'a Timer,
    armed: bool,
}

impl TimerGuard<'_> {
    /// Drop the guard without recording anything.
    pub fn discard(mut self) {
        self.armed = false;
    }
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.timer.add(self.start.elapsed().as_nanos() as u64);
        }
    }
}
