//! Bounded ingestion queue
//!
//! Multi-producer, single-consumer queue of records with capacity fixed at
//! construction. A full queue blocks producers on `submit` - deliberate
//! backpressure so a slow or unreachable store throttles request handlers
//! instead of growing memory without bound. The queue closes when every
//! sender has been dropped; the consumer then drains what is buffered and
//! performs one final flush.

use thiserror::Error;
use tokio::sync::mpsc;

use crate::record::AccessRecord;

/// Receiving half of the ingestion queue, owned by the single consumer.
pub type RecordReceiver = mpsc::Receiver<AccessRecord>;

/// Create the bounded ingestion queue.
///
/// `capacity` must be non-zero (validated by the configuration layer).
pub fn record_channel(capacity: usize) -> (RecordSender, RecordReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (RecordSender { tx }, rx)
}

/// Errors from submitting a record. Both variants hand the record back so
/// the caller can decide what to do with it.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The pipeline has shut down; no further records are accepted
    #[error("pipeline is shut down")]
    Closed(Box<AccessRecord>),

    /// The queue is at capacity (only from [`RecordSender::try_submit`])
    #[error("ingestion queue is full")]
    Full(Box<AccessRecord>),
}

/// Cloneable producer handle for the ingestion queue.
///
/// This is the `submit(record)` boundary consumed by the request-handling
/// layer. Every clone keeps the queue open; the pipeline shuts down only
/// once all handles are dropped.
#[derive(Debug, Clone)]
pub struct RecordSender {
    tx: mpsc::Sender<AccessRecord>,
}

impl RecordSender {
    /// Enqueue a record, waiting while the queue is at capacity.
    ///
    /// Callers that cannot tolerate blocking should wrap this in a timeout
    /// or use [`try_submit`](Self::try_submit); delivery semantics are the
    /// same either way.
    pub async fn submit(&self, record: AccessRecord) -> Result<(), SubmitError> {
        self.tx
            .send(record)
            .await
            .map_err(|mpsc::error::SendError(record)| SubmitError::Closed(Box::new(record)))
    }

    /// Enqueue a record without waiting; fails when the queue is full.
    pub fn try_submit(&self, record: AccessRecord) -> Result<(), SubmitError> {
        self.tx.try_send(record).map_err(|e| match e {
            mpsc::error::TrySendError::Full(record) => SubmitError::Full(Box::new(record)),
            mpsc::error::TrySendError::Closed(record) => SubmitError::Closed(Box::new(record)),
        })
    }
}

#[cfg(test)]
#[path = "queue_test.rs"]
mod queue_test;
