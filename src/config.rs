//! Pipeline configuration
//!
//! TOML-based, every field optional except the table name. Durations use
//! humantime syntax (`"5s"`, `"250ms"`); sizes accept plain bytes or a
//! base-1024 suffix (`"512k"`, `"10m"`, `"1g"`).
//!
//! # Example
//!
//! ```toml
//! table = "access_log"
//! queue_capacity = 10000
//! batch_size = 1000
//! flush_interval = "5s"
//!
//! [store]
//! url = "http://clickhouse:8123"
//! database = "telemetry"
//!
//! [reserve]
//! dir = "/var/spool/logship"
//! max_segment_size = "10m"
//! max_files = 10
//! ```

use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors from loading or validating configuration. All of them are fatal:
/// the process must not start on an invalid configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("failed to read config file '{path}': {source}")]
    Io {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    Parse(#[from] Box<toml::de::Error>),

    /// The destination table has no name
    #[error("destination table name must not be empty")]
    EmptyTable,

    /// A size or count that must be positive is zero
    #[error("{field} must be greater than zero")]
    ZeroValue {
        /// The offending field
        field: &'static str,
    },

    /// The reserve directory is empty
    #[error("reserve dir must not be empty")]
    EmptyReserveDir,
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Destination table name (required)
    pub table: String,

    /// Ingestion queue capacity; producers block past this many buffered
    /// records
    pub queue_capacity: usize,

    /// Batch size threshold (records per flush)
    pub batch_size: usize,

    /// Periodic flush interval; zero disables periodic flushing
    #[serde(with = "humantime_serde")]
    pub flush_interval: Duration,

    /// Store connection parameters
    pub store: StoreConfig,

    /// Disk overflow reserve; absent means failed batches are dropped
    pub reserve: Option<ReserveConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            table: String::new(),
            queue_capacity: 10_000,
            batch_size: 1_000,
            flush_interval: Duration::from_secs(5),
            store: StoreConfig::default(),
            reserve: None,
        }
    }
}

/// Store connection parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Store HTTP URL
    pub url: String,

    /// Database name
    pub database: String,

    /// Username (optional)
    pub username: Option<String>,

    /// Password (optional)
    pub password: Option<String>,

    /// Startup ping attempts before giving up
    pub connect_attempts: u32,

    /// Base delay between ping attempts; attempt `i` waits `i` times this
    #[serde(with = "humantime_serde")]
    pub connect_backoff: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8123".into(),
            database: "default".into(),
            username: None,
            password: None,
            connect_attempts: 9,
            connect_backoff: Duration::from_secs(1),
        }
    }
}

/// Overflow reserve parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReserveConfig {
    /// Directory for segment files
    pub dir: PathBuf,

    /// Maximum serialized size of one segment file
    #[serde(deserialize_with = "deserialize_size")]
    pub max_segment_size: u64,

    /// Retained generations; a segment is evicted once its age reaches this
    pub max_files: u32,
}

impl Default for ReserveConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::new(),
            max_segment_size: 10 * 1024 * 1024,
            max_files: 10,
        }
    }
}

impl PipelineConfig {
    /// Load and validate configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        contents.parse()
    }

    /// Validate invariants that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.table.is_empty() {
            return Err(ConfigError::EmptyTable);
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroValue {
                field: "queue_capacity",
            });
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroValue { field: "batch_size" });
        }
        if self.store.connect_attempts == 0 {
            return Err(ConfigError::ZeroValue {
                field: "store.connect_attempts",
            });
        }
        if let Some(ref reserve) = self.reserve {
            if reserve.dir.as_os_str().is_empty() {
                return Err(ConfigError::EmptyReserveDir);
            }
            if reserve.max_segment_size == 0 {
                return Err(ConfigError::ZeroValue {
                    field: "reserve.max_segment_size",
                });
            }
            if reserve.max_files == 0 {
                return Err(ConfigError::ZeroValue {
                    field: "reserve.max_files",
                });
            }
        }
        Ok(())
    }
}

impl FromStr for PipelineConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(s).map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }
}

/// Parse a size with an optional base-1024 suffix: `b`, `k`, `m`, `g`
/// (case-insensitive). A bare number is bytes.
pub fn parse_size(s: &str) -> Option<u64> {
    let s = s.trim().to_ascii_lowercase();
    if s.is_empty() {
        return None;
    }
    let (digits, multiplier) = match s.as_bytes()[s.len() - 1] {
        b'b' => (&s[..s.len() - 1], 1),
        b'k' => (&s[..s.len() - 1], 1024),
        b'm' => (&s[..s.len() - 1], 1024 * 1024),
        b'g' => (&s[..s.len() - 1], 1024 * 1024 * 1024),
        b'0'..=b'9' => (&s[..], 1),
        _ => return None,
    };
    let value: u64 = digits.parse().ok()?;
    value.checked_mul(multiplier)
}

/// Accept either a TOML integer (bytes) or a suffixed string.
fn deserialize_size<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum SizeSpec {
        Bytes(u64),
        Human(String),
    }

    match SizeSpec::deserialize(deserializer)? {
        SizeSpec::Bytes(n) => Ok(n),
        SizeSpec::Human(s) => parse_size(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid size '{s}'"))),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
