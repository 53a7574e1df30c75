//! Store interface boundary
//!
//! The destination store is specified here only by its transactional
//! batch-insert contract; the wire dialect lives in the driver. Exactly one
//! driver ships with the crate ([`clickhouse::ClickHouseStore`]); tests use
//! an in-memory mock.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::record::AccessRecord;
use crate::schema::InsertStatement;

pub mod clickhouse;

#[cfg(test)]
pub(crate) mod mock;

/// Errors from the store, classified for logging. Both classes are
/// batch-level failures to the caller.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store is unreachable or timed out
    #[error("store unreachable: {0}")]
    Connectivity(String),

    /// The store rejected the data (schema mismatch, constraint violation)
    #[error("write rejected by store: {0}")]
    Data(String),
}

impl StoreError {
    /// Whether this failure is a connectivity problem (retryable at startup)
    /// rather than a data problem.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, StoreError::Connectivity(_))
    }

    /// Short class label for structured log fields.
    pub fn class(&self) -> &'static str {
        match self {
            StoreError::Connectivity(_) => "connectivity",
            StoreError::Data(_) => "data",
        }
    }
}

/// Transactional batch-insert contract of the destination store.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// One open transaction.
    type Tx: StoreTx;

    /// Connectivity check.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Execute an idempotent provisioning statement.
    async fn execute_ddl(&self, sql: &str) -> Result<(), StoreError>;

    /// Open a transaction for the given insert statement. Drivers verify
    /// their native binding order against `statement.columns()`.
    async fn begin(&self, statement: &InsertStatement) -> Result<Self::Tx, StoreError>;
}

/// One all-or-nothing insert transaction.
#[async_trait]
pub trait StoreTx: Send {
    /// Stage one row. A failure here aborts the whole batch.
    async fn write(&mut self, record: &AccessRecord) -> Result<(), StoreError>;

    /// Commit every staged row.
    async fn commit(self) -> Result<(), StoreError>;

    /// Discard every staged row.
    async fn rollback(self) -> Result<(), StoreError>;
}

/// Ping the store until it answers, with a linearly increasing delay between
/// attempts (attempt `i` waits `i * base_delay`). Exhausting the attempts is
/// fatal at startup. Data-class ping failures are returned immediately since
/// waiting will not fix them.
pub async fn ping_with_retry<S: Store>(
    store: &S,
    attempts: u32,
    base_delay: Duration,
) -> Result<(), StoreError> {
    let mut last = None;
    for attempt in 1..=attempts {
        match store.ping().await {
            Ok(()) => return Ok(()),
            Err(err) if err.is_connectivity() => {
                tracing::info!(attempt, error = %err, "store is not ready, waiting");
                last = Some(err);
                if attempt < attempts {
                    tokio::time::sleep(base_delay * attempt).await;
                }
            }
            Err(err) => return Err(err),
        }
    }
    Err(last.unwrap_or_else(|| StoreError::Connectivity("no ping attempts configured".into())))
}
