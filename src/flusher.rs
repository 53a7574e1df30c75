//! Batch flusher - the single consumer task
//!
//! Accumulates dequeued records into a batch and flushes on whichever fires
//! first: the batch size threshold, the periodic interval, or queue close
//! (one final flush, then the task returns). A zero interval disables the
//! timer entirely; only size and close triggers remain.
//!
//! A failed flush hands the whole batch to the overflow reserve (or drops
//! it with an error log when no reserve is configured) and always clears the
//! in-memory batch afterwards, so a record is delivered to the store or the
//! disk - never both. Batch mutation is strictly single-task; there is no
//! concurrent flush and accumulate, and a write in flight runs to completion
//! before shutdown is re-evaluated.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Interval;

use crate::metrics::{MetricsSnapshot, PipelineMetrics};
use crate::queue::RecordReceiver;
use crate::record::AccessRecord;
use crate::reserve::Reserve;
use crate::store::Store;
use crate::writer::SinkWriter;

/// The consumer loop. Constructed by the pipeline and spawned as a task.
pub struct Flusher<S: Store> {
    receiver: RecordReceiver,
    writer: SinkWriter<S>,
    reserve: Option<Reserve>,
    batch_size: usize,
    flush_interval: Duration,
    metrics: Arc<PipelineMetrics>,
    batch: Vec<AccessRecord>,
}

/// Await the next tick, or forever when the timer is disabled.
async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

impl<S: Store> Flusher<S> {
    /// Create the flusher. `flush_interval` of zero disables periodic
    /// flushing.
    pub fn new(
        receiver: RecordReceiver,
        writer: SinkWriter<S>,
        reserve: Option<Reserve>,
        batch_size: usize,
        flush_interval: Duration,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            receiver,
            writer,
            reserve,
            batch_size,
            flush_interval,
            metrics,
            batch: Vec::with_capacity(batch_size),
        }
    }

    /// Run until the queue closes; returns the final metrics snapshot.
    pub async fn run(mut self) -> MetricsSnapshot {
        let mut ticker = (!self.flush_interval.is_zero())
            .then(|| tokio::time::interval(self.flush_interval));

        loop {
            tokio::select! {
                maybe = self.receiver.recv() => match maybe {
                    Some(record) => {
                        self.metrics.record_received();
                        self.batch.push(record);
                        if self.batch.len() >= self.batch_size {
                            self.flush("size").await;
                        }
                    }
                    None => break,
                },
                _ = next_tick(&mut ticker) => {
                    self.flush("interval").await;
                }
            }
        }

        // Queue closed: one final flush covers everything still buffered.
        self.flush("shutdown").await;

        let snapshot = self.metrics.snapshot();
        tracing::info!(
            records_received = snapshot.records_received,
            records_written = snapshot.records_written,
            batches_written = snapshot.batches_written,
            flush_errors = snapshot.flush_errors,
            records_reserved = snapshot.records_reserved,
            records_dropped = snapshot.records_dropped,
            "flusher drained"
        );
        snapshot
    }

    /// Flush the current batch; a flush of zero rows is a no-op.
    async fn flush(&mut self, trigger: &str) {
        if self.batch.is_empty() {
            return;
        }

        let records = self.batch.len() as u64;
        tracing::debug!(trigger, records, "flushing batch");

        match self.writer.write_batch(&self.batch).await {
            Ok(()) => {
                self.metrics.record_batch_written(records);
            }
            Err(err) => {
                tracing::error!(
                    error = %err,
                    class = err.class(),
                    records,
                    "batch write failed, diverting to overflow reserve"
                );
                self.metrics.record_flush_error();
                self.spill();
            }
        }
        self.batch.clear();
    }

    /// Hand the failed batch to the overflow reserve, or drop it when none
    /// is configured or the reserve itself fails.
    fn spill(&self) {
        let records = self.batch.len() as u64;
        match &self.reserve {
            Some(reserve) => match reserve.reserve(&self.batch) {
                Ok(receipt) => {
                    self.metrics.record_reserved(receipt.records, receipt.segments);
                }
                Err(err) => {
                    tracing::error!(error = %err, records, "overflow reserve failed, dropping batch");
                    self.metrics.record_dropped(records);
                }
            },
            None => {
                tracing::warn!(records, "overflow reserve not configured, dropping failed batch");
                self.metrics.record_dropped(records);
            }
        }
    }
}

#[cfg(test)]
#[path = "flusher_test.rs"]
mod flusher_test;
