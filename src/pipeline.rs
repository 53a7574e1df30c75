//! Pipeline wiring
//!
//! One explicit object owns the queue, schema projection, writer, and
//! reserve - no ambient global state. Producers hold cloneable
//! [`RecordSender`] handles; exactly one consumer task runs the flusher.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::flusher::Flusher;
use crate::metrics::{MetricsSnapshot, PipelineMetrics};
use crate::queue::{record_channel, RecordSender};
use crate::record::AccessRecord;
use crate::reserve::Reserve;
use crate::schema::SchemaProjection;
use crate::store::{ping_with_retry, Store};
use crate::writer::SinkWriter;

/// A running access-log pipeline.
#[derive(Debug)]
pub struct Pipeline {
    sender: RecordSender,
    metrics: Arc<PipelineMetrics>,
    consumer: JoinHandle<MetricsSnapshot>,
}

impl Pipeline {
    /// Validate the configuration, provision the store, and spawn the
    /// consumer task.
    ///
    /// Fatal (the pipeline does not start): invalid configuration, an empty
    /// schema projection, an unwritable reserve directory, or a store that
    /// stays unreachable through the configured ping attempts.
    pub async fn start<S: Store>(
        config: PipelineConfig,
        store: S,
    ) -> Result<Self, PipelineError> {
        config.validate()?;

        let projection = Arc::new(SchemaProjection::derive(&[])?);

        let reserve = match config.reserve {
            Some(ref reserve_config) => Some(Reserve::open(reserve_config)?),
            None => None,
        };

        ping_with_retry(
            &store,
            config.store.connect_attempts,
            config.store.connect_backoff,
        )
        .await?;

        let writer = SinkWriter::new(store, Arc::clone(&projection), &config.table);
        writer.provision().await?;

        let (sender, receiver) = record_channel(config.queue_capacity);
        let metrics = Arc::new(PipelineMetrics::new());
        let flusher = Flusher::new(
            receiver,
            writer,
            reserve,
            config.batch_size,
            config.flush_interval,
            Arc::clone(&metrics),
        );
        let consumer = tokio::spawn(flusher.run());

        tracing::info!(
            table = %config.table,
            queue_capacity = config.queue_capacity,
            batch_size = config.batch_size,
            flush_interval = ?config.flush_interval,
            reserve = config.reserve.is_some(),
            "pipeline started"
        );

        Ok(Self {
            sender,
            metrics,
            consumer,
        })
    }

    /// A cloneable producer handle. Every clone keeps the queue open.
    pub fn handle(&self) -> RecordSender {
        self.sender.clone()
    }

    /// Enqueue one record through the pipeline's own handle.
    pub async fn submit(&self, record: AccessRecord) -> Result<(), crate::queue::SubmitError> {
        self.sender.submit(record).await
    }

    /// Shared pipeline counters.
    pub fn metrics(&self) -> Arc<PipelineMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Close the queue and wait for the consumer's final flush.
    ///
    /// The pipeline's own sender is dropped here; the consumer terminates
    /// once every cloned handle is dropped as well and the buffered records
    /// have been flushed. Consuming `self` makes a second shutdown
    /// unrepresentable.
    pub async fn shutdown(self) -> MetricsSnapshot {
        drop(self.sender);
        match self.consumer.await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::error!(error = %err, "consumer task failed");
                MetricsSnapshot::default()
            }
        }
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod pipeline_test;
