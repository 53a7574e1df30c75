//! Top-level errors
//!
//! Startup failures surface from [`crate::pipeline::Pipeline::start`];
//! runtime delivery failures never reach producers - delivery is
//! fire-and-forget once a record is enqueued.

use thiserror::Error;

use crate::config::ConfigError;
use crate::reserve::ReserveError;
use crate::schema::SchemaError;
use crate::store::StoreError;

/// Any fatal pipeline error.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Schema derivation failed
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// The store could not be reached or provisioned at startup
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The overflow reserve could not be opened
    #[error("overflow reserve error: {0}")]
    Reserve(#[from] ReserveError),
}
