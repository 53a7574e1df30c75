//! Transactional sink writer
//!
//! Writes one batch as one all-or-nothing transaction: open, stage each row
//! in batch order, commit. Any per-row failure rolls the transaction back
//! and fails the whole batch. There is no per-record retry; the retry
//! granularity is the whole batch via the overflow reserve.

use std::sync::Arc;

use crate::record::AccessRecord;
use crate::schema::{InsertStatement, SchemaProjection};
use crate::store::{Store, StoreError, StoreTx};

/// Batch writer bound to one destination table.
pub struct SinkWriter<S: Store> {
    store: S,
    projection: Arc<SchemaProjection>,
    statement: InsertStatement,
}

impl<S: Store> SinkWriter<S> {
    /// Bind a writer to `table`, preparing the insert statement once from
    /// the projection's field order.
    pub fn new(store: S, projection: Arc<SchemaProjection>, table: &str) -> Self {
        let statement = projection.insert_statement(table);
        Self {
            store,
            projection,
            statement,
        }
    }

    /// The store this writer wraps.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Issue the idempotent provisioning DDL for the destination table.
    pub async fn provision(&self) -> Result<(), StoreError> {
        let ddl = self.projection.create_table_ddl(self.statement.table());
        tracing::debug!(table = self.statement.table(), "provisioning destination table");
        self.store.execute_ddl(&ddl).await
    }

    /// Write `batch` as one transaction. An empty batch is a no-op.
    pub async fn write_batch(&self, batch: &[AccessRecord]) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut tx = self.store.begin(&self.statement).await?;
        for record in batch {
            if let Err(err) = tx.write(record).await {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::debug!(error = %rollback_err, "rollback after failed write also failed");
                }
                return Err(err);
            }
        }
        tx.commit().await
    }
}

#[cfg(test)]
#[path = "writer_test.rs"]
mod writer_test;
