//! Blocking database access.
//!
//! The reader needs only two things from a database: metadata to decide
//! whether a dialect fits, and a forward-only cursor of raw string rows.
//! Row values stay as driver strings; the value-type layer parses them.

pub mod clickhouse_client;
#[cfg(any(test, feature = "testing"))]
pub mod memory;

use thiserror::Error;

pub use clickhouse_client::ClickHouseConnection;
#[cfg(any(test, feature = "testing"))]
pub use memory::InMemoryConnection;

/// One result row; `None` is SQL `NULL`.
pub type Row = Vec<Option<String>>;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("ClickHouse error: {0}")]
    ClickHouse(#[from] clickhouse::error::Error),
    #[error("I/O error while reading results: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed result row '{line}': {source}")]
    MalformedRow {
        line: String,
        source: serde_json::Error,
    },
    #[error("Statement failed: {0}")]
    Statement(String),
    #[error("Connection is not configured: {0}")]
    NotConfigured(String),
}

/// What a live connection says about the database behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionMetadata {
    pub product_name: String,
    pub product_major_version: u32,
    pub driver_name: String,
    pub driver_major_version: u32,
}

impl ConnectionMetadata {
    pub fn new(
        product_name: impl Into<String>,
        product_major_version: u32,
        driver_name: impl Into<String>,
        driver_major_version: u32,
    ) -> Self {
        ConnectionMetadata {
            product_name: product_name.into(),
            product_major_version,
            driver_name: driver_name.into(),
            driver_major_version,
        }
    }
}

/// Forward-only result cursor.
pub trait RowCursor {
    fn next_row(&mut self) -> Result<Option<Row>, ConnectionError>;
}

pub trait Connection {
    fn metadata(&mut self) -> Result<ConnectionMetadata, ConnectionError>;

    /// Run a statement; rows are pulled lazily through the returned cursor.
    fn execute(&mut self, sql: &str) -> Result<Box<dyn RowCursor + '_>, ConnectionError>;
}

impl<C: Connection + ?Sized> Connection for &mut C {
    fn metadata(&mut self) -> Result<ConnectionMetadata, ConnectionError> {
        (**self).metadata()
    }

    fn execute(&mut self, sql: &str) -> Result<Box<dyn RowCursor + '_>, ConnectionError> {
        (**self).execute(sql)
    }
}

/// Leading integer of a dotted version string (`"24.3.1.2672"` -> 24).
pub fn major_version(version: &str) -> Option<u32> {
    version
        .trim()
        .split(|c: char| !c.is_ascii_digit())
        .find(|part| !part.is_empty())
        .and_then(|part| part.parse().ok())
}
