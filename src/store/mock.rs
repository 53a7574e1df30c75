//! In-memory store double for unit tests
//!
//! Records every committed transaction and DDL statement, and can inject
//! ping or write failures.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::record::AccessRecord;
use crate::schema::InsertStatement;
use crate::store::{Store, StoreError, StoreTx};

#[derive(Default)]
struct MockState {
    committed: Vec<Vec<AccessRecord>>,
    ddl: Vec<String>,
    rollbacks: u32,
}

/// Shared, cloneable mock store.
#[derive(Clone, Default)]
pub(crate) struct MockStore {
    state: Arc<Mutex<MockState>>,
    /// Remaining pings that fail with a connectivity error
    failing_pings: Arc<AtomicU32>,
    /// Remaining transactions whose first write fails
    failing_writes: Arc<AtomicU32>,
    /// When true, injected write failures are data-class instead of
    /// connectivity-class
    fail_with_data_error: Arc<AtomicU32>,
}

impl MockStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` pings fail with a connectivity error.
    pub(crate) fn fail_pings(&self, n: u32) {
        self.failing_pings.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` transactions fail on their first write.
    pub(crate) fn fail_writes(&self, n: u32) {
        self.failing_writes.store(n, Ordering::SeqCst);
    }

    /// Switch injected write failures to the data class.
    pub(crate) fn fail_with_data_errors(&self) {
        self.fail_with_data_error.store(1, Ordering::SeqCst);
    }

    /// All committed transactions, in commit order.
    pub(crate) fn committed(&self) -> Vec<Vec<AccessRecord>> {
        self.state.lock().unwrap().committed.clone()
    }

    /// All DDL statements executed, in order.
    pub(crate) fn ddl(&self) -> Vec<String> {
        self.state.lock().unwrap().ddl.clone()
    }

    /// Number of rolled-back transactions.
    pub(crate) fn rollbacks(&self) -> u32 {
        self.state.lock().unwrap().rollbacks
    }
}

#[async_trait]
impl Store for MockStore {
    type Tx = MockTx;

    async fn ping(&self) -> Result<(), StoreError> {
        let remaining = self.failing_pings.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_pings.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Connectivity("mock store down".into()));
        }
        Ok(())
    }

    async fn execute_ddl(&self, sql: &str) -> Result<(), StoreError> {
        self.state.lock().unwrap().ddl.push(sql.to_string());
        Ok(())
    }

    async fn begin(&self, _statement: &InsertStatement) -> Result<Self::Tx, StoreError> {
        let remaining = self.failing_writes.load(Ordering::SeqCst);
        let fail_first_write = remaining > 0;
        if fail_first_write {
            self.failing_writes.store(remaining - 1, Ordering::SeqCst);
        }
        Ok(MockTx {
            state: Arc::clone(&self.state),
            staged: Vec::new(),
            fail_first_write,
            data_class: self.fail_with_data_error.load(Ordering::SeqCst) > 0,
        })
    }
}

pub(crate) struct MockTx {
    state: Arc<Mutex<MockState>>,
    staged: Vec<AccessRecord>,
    fail_first_write: bool,
    data_class: bool,
}

#[async_trait]
impl StoreTx for MockTx {
    async fn write(&mut self, record: &AccessRecord) -> Result<(), StoreError> {
        if self.fail_first_write {
            return Err(if self.data_class {
                StoreError::Data("mock constraint violation".into())
            } else {
                StoreError::Connectivity("mock connection lost".into())
            });
        }
        self.staged.push(record.clone());
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.state.lock().unwrap().committed.push(self.staged);
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.state.lock().unwrap().rollbacks += 1;
        Ok(())
    }
}
