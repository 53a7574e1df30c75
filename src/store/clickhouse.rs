//! ClickHouse driver for the store contract
//!
//! Maps the transactional contract onto the ClickHouse HTTP insert protocol:
//! `begin` opens a native batch insert, `write` stages one row, `commit`
//! terminates the batch, and rollback drops the insert without terminating
//! it - the server discards an unterminated batch, so staged rows never
//! become visible.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clickhouse::error::Error;
use clickhouse::insert::Insert;
use clickhouse::{Client, Row};
use serde::Serialize;

use crate::config::StoreConfig;
use crate::record::AccessRecord;
use crate::schema::InsertStatement;
use crate::store::{Store, StoreError, StoreTx};

/// Driver-side row. Field order matches [`crate::schema::FIELDS`]; a test
/// asserts the derived column names stay in lockstep with the projection.
#[derive(Debug, Row, Serialize)]
pub(crate) struct AccessRow {
    #[serde(with = "clickhouse::serde::chrono::datetime")]
    time: DateTime<Utc>,
    #[serde(with = "clickhouse::serde::chrono::datetime")]
    client_time: DateTime<Utc>,
    region: String,
    location: String,
    host: String,
    method: String,
    request_uri: String,
    version: String,
    remote_addr: String,
    content_length: i64,
    os: String,
    browser: String,
    country: String,
    city: String,
    latitude: f64,
    longitude: f64,
    eu_member: u8,
    duration_us: u64,
    db_duration_us: u64,
    user: String,
    user_agent: String,
    source: Option<String>,
    target: Option<String>,
    params: Option<String>,
    status: u16,
    response: Option<String>,
    response_length: u64,
    error: Option<String>,
}

impl From<&AccessRecord> for AccessRow {
    fn from(r: &AccessRecord) -> Self {
        Self {
            time: r.time,
            client_time: r.client_time,
            region: r.region.clone(),
            location: r.location.clone(),
            host: r.host.clone(),
            method: r.method.clone(),
            request_uri: r.request_uri.clone(),
            version: r.version.clone(),
            remote_addr: r.remote_addr.clone(),
            content_length: r.content_length,
            os: r.os.clone(),
            browser: r.browser.clone(),
            country: r.country.clone(),
            city: r.city.clone(),
            latitude: r.latitude,
            longitude: r.longitude,
            eu_member: r.eu_member as u8,
            duration_us: r.duration_us,
            db_duration_us: r.db_duration_us,
            user: r.user.clone(),
            user_agent: r.user_agent.clone(),
            source: r.source.clone(),
            target: r.target.clone(),
            params: r.params.clone(),
            status: r.status,
            response: r.response.clone(),
            response_length: r.response_length,
            error: r.error.clone(),
        }
    }
}

fn classify(err: Error) -> StoreError {
    match &err {
        Error::Network(_) | Error::TimedOut => StoreError::Connectivity(err.to_string()),
        _ => StoreError::Data(err.to_string()),
    }
}

/// Store driver backed by the ClickHouse HTTP interface.
///
/// The underlying client manages its own connection pool; concurrency is
/// naturally bounded because only the single consumer task issues writes.
pub struct ClickHouseStore {
    client: Client,
}

impl ClickHouseStore {
    /// Build the driver from connection parameters.
    pub fn new(config: &StoreConfig) -> Self {
        let mut client = Client::default()
            .with_url(&config.url)
            .with_database(&config.database);

        if let Some(ref username) = config.username {
            client = client.with_user(username);
        }
        if let Some(ref password) = config.password {
            client = client.with_password(password);
        }

        Self { client }
    }
}

#[async_trait]
impl Store for ClickHouseStore {
    type Tx = ClickHouseTx;

    async fn ping(&self) -> Result<(), StoreError> {
        self.client
            .query("SELECT 1")
            .execute()
            .await
            .map_err(classify)
    }

    async fn execute_ddl(&self, sql: &str) -> Result<(), StoreError> {
        self.client.query(sql).execute().await.map_err(classify)
    }

    async fn begin(&self, statement: &InsertStatement) -> Result<Self::Tx, StoreError> {
        if statement.columns() != <AccessRow as Row>::COLUMN_NAMES {
            return Err(StoreError::Data(format!(
                "schema projection does not match driver row layout for table '{}'",
                statement.table()
            )));
        }
        let insert = self
            .client
            .insert::<AccessRow>(statement.table())
            .map_err(classify)?;
        Ok(ClickHouseTx { insert })
    }
}

/// One in-flight batch insert.
pub struct ClickHouseTx {
    insert: Insert<AccessRow>,
}

#[async_trait]
impl StoreTx for ClickHouseTx {
    async fn write(&mut self, record: &AccessRecord) -> Result<(), StoreError> {
        let row = AccessRow::from(record);
        self.insert.write(&row).await.map_err(classify)
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.insert.end().await.map_err(classify)
    }

    async fn rollback(self) -> Result<(), StoreError> {
        // Dropping the insert without end() leaves the batch unterminated;
        // the server discards it.
        Ok(())
    }
}
