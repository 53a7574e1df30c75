//! Pipeline metrics
//!
//! Relaxed atomic counters updated by the consumer task, readable from
//! anywhere through a shared `Arc`.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the whole pipeline.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    /// Records dequeued by the consumer
    pub records_received: AtomicU64,

    /// Records committed to the store
    pub records_written: AtomicU64,

    /// Batches committed to the store
    pub batches_written: AtomicU64,

    /// Batch writes that failed
    pub flush_errors: AtomicU64,

    /// Records spilled to the overflow reserve
    pub records_reserved: AtomicU64,

    /// Segment files written by the overflow reserve
    pub segments_written: AtomicU64,

    /// Records lost (flush failed and the reserve was absent or failed too)
    pub records_dropped: AtomicU64,
}

impl PipelineMetrics {
    /// Create a zeroed metrics instance.
    pub const fn new() -> Self {
        Self {
            records_received: AtomicU64::new(0),
            records_written: AtomicU64::new(0),
            batches_written: AtomicU64::new(0),
            flush_errors: AtomicU64::new(0),
            records_reserved: AtomicU64::new(0),
            segments_written: AtomicU64::new(0),
            records_dropped: AtomicU64::new(0),
        }
    }

    /// Record one dequeued record.
    #[inline]
    pub fn record_received(&self) {
        self.records_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one committed batch.
    #[inline]
    pub fn record_batch_written(&self, records: u64) {
        self.batches_written.fetch_add(1, Ordering::Relaxed);
        self.records_written.fetch_add(records, Ordering::Relaxed);
    }

    /// Record one failed batch write.
    #[inline]
    pub fn record_flush_error(&self) {
        self.flush_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a batch spilled to disk.
    #[inline]
    pub fn record_reserved(&self, records: u64, segments: u64) {
        self.records_reserved.fetch_add(records, Ordering::Relaxed);
        self.segments_written.fetch_add(segments, Ordering::Relaxed);
    }

    /// Record lost records.
    #[inline]
    pub fn record_dropped(&self, records: u64) {
        self.records_dropped.fetch_add(records, Ordering::Relaxed);
    }

    /// Get a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_received: self.records_received.load(Ordering::Relaxed),
            records_written: self.records_written.load(Ordering::Relaxed),
            batches_written: self.batches_written.load(Ordering::Relaxed),
            flush_errors: self.flush_errors.load(Ordering::Relaxed),
            records_reserved: self.records_reserved.load(Ordering::Relaxed),
            segments_written: self.segments_written.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Immutable snapshot of [`PipelineMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Records dequeued by the consumer
    pub records_received: u64,
    /// Records committed to the store
    pub records_written: u64,
    /// Batches committed to the store
    pub batches_written: u64,
    /// Batch writes that failed
    pub flush_errors: u64,
    /// Records spilled to the overflow reserve
    pub records_reserved: u64,
    /// Segment files written by the overflow reserve
    pub segments_written: u64,
    /// Records lost entirely
    pub records_dropped: u64,
}
