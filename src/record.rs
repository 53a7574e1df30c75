//! Access record - one structured telemetry event per handled request
//!
//! The field set is fixed for the process lifetime and mirrors the storage
//! table column-for-column; the declared order here is the canonical column
//! order (see [`crate::schema::FIELDS`]). Absent data is represented by the
//! field's zero value, never by omitting the field. Free-text response fields
//! that have no meaningful zero value are `Option<String>` and map to
//! nullable columns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One access-log event.
///
/// Constructed by a producer at event time, enqueued once, immutable
/// thereafter. Serialized as one JSON object per line in the overflow
/// reserve; field names equal storage column names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessRecord {
    /// Server-side request timestamp
    pub time: DateTime<Utc>,
    /// Client-reported timestamp
    pub client_time: DateTime<Utc>,
    /// Deployment region label
    pub region: String,
    /// Deployment location label
    pub location: String,
    /// Request Host header
    pub host: String,
    /// HTTP method
    pub method: String,
    /// Request URI
    pub request_uri: String,
    /// HTTP protocol version
    pub version: String,
    /// Remote peer address
    pub remote_addr: String,
    /// Request body length in bytes
    pub content_length: i64,
    /// Client operating system (parsed from headers; empty if unparsable)
    pub os: String,
    /// Client browser (parsed from headers; empty if unparsable)
    pub browser: String,
    /// GeoIP country name
    pub country: String,
    /// GeoIP city name
    pub city: String,
    /// GeoIP latitude
    pub latitude: f64,
    /// GeoIP longitude
    pub longitude: f64,
    /// GeoIP EU membership flag
    pub eu_member: bool,
    /// Total request duration in microseconds
    pub duration_us: u64,
    /// Database time within the request, microseconds
    pub db_duration_us: u64,
    /// Authenticated user name (empty for anonymous)
    pub user: String,
    /// Raw User-Agent header
    pub user_agent: String,
    /// Request source entity
    pub source: Option<String>,
    /// Request target entity
    pub target: Option<String>,
    /// URL parameters, JSON-encoded
    pub params: Option<String>,
    /// HTTP response status code
    pub status: u16,
    /// Response body excerpt
    pub response: Option<String>,
    /// Response body length in bytes
    pub response_length: u64,
    /// Error message, if the handler failed
    pub error: Option<String>,
}

#[cfg(test)]
#[path = "record_test.rs"]
mod record_test;
