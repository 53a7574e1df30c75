//! logship - access-log shipping pipeline
//!
//! Accepts structured access records from request-handling code, batches them,
//! and delivers each batch as one transaction to a columnar analytics store.
//! When a batch cannot be written, it is spilled to newline-delimited JSON
//! segment files on disk for offline recovery.
//!
//! # Architecture
//!
//! ```text
//! [Producers] --submit--> [Bounded Queue] --> [Flusher Task] --> [Store]
//!                                                   |
//!                                          on write failure
//!                                                   v
//!                                          [Overflow Reserve]
//!                                          (rotated .log segments)
//! ```
//!
//! The bounded queue is the only synchronization point: producers block on
//! `submit` when it is full (deliberate backpressure), and exactly one
//! background consumer drains it. The consumer flushes on whichever fires
//! first - batch size threshold or periodic interval - and performs one final
//! flush when the queue closes.
//!
//! # Example
//!
//! ```ignore
//! use logship::{AccessRecord, Pipeline, PipelineConfig, ClickHouseStore};
//!
//! let config: PipelineConfig = "table = \"access_log\"".parse()?;
//! let store = ClickHouseStore::new(&config.store);
//! let pipeline = Pipeline::start(config, store).await?;
//!
//! let handle = pipeline.handle();
//! handle.submit(AccessRecord::default()).await?;
//!
//! let snapshot = pipeline.shutdown().await;
//! ```

/// Configuration surface (TOML) with validation
pub mod config;

/// Top-level error aggregation
pub mod error;

/// Consumer loop: accumulates records, flushes on size/time/close
pub mod flusher;

/// Pipeline counters and snapshots
pub mod metrics;

/// Pipeline wiring: queue + schema + writer + reserve, one consumer task
pub mod pipeline;

/// Bounded ingestion queue and producer handle
pub mod queue;

/// The access record value type
pub mod record;

/// Disk overflow reserve with segment rotation
pub mod reserve;

/// Declarative record schema and projection (DDL + insert statement)
pub mod schema;

/// Store interface boundary and the ClickHouse driver
pub mod store;

/// Transactional batch writer
pub mod writer;

pub use config::{ConfigError, PipelineConfig, ReserveConfig, StoreConfig};
pub use error::PipelineError;
pub use flusher::Flusher;
pub use metrics::{MetricsSnapshot, PipelineMetrics};
pub use pipeline::Pipeline;
pub use queue::{RecordSender, SubmitError};
pub use record::AccessRecord;
pub use reserve::{Reserve, ReserveError, ReserveReceipt};
pub use schema::{InsertStatement, SchemaError, SchemaProjection};
pub use store::clickhouse::ClickHouseStore;
pub use store::{Store, StoreError, StoreTx};
pub use writer::SinkWriter;
