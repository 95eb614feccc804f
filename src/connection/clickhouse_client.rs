use std::env;

use clickhouse::Client;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::runtime::{Builder, Runtime};

use super::{major_version, Connection, ConnectionError, ConnectionMetadata, Row, RowCursor};

const DRIVER_NAME: &str = "clickhouse-rs";
const DRIVER_MAJOR_VERSION: u32 = 0;

fn read_env_var(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Builds a client from `CLICKHOUSE_URL`, `CLICKHOUSE_USER`,
/// `CLICKHOUSE_PASSWORD` and `CLICKHOUSE_DATABASE`.
pub fn try_get_client() -> Option<Client> {
    let url = read_env_var("CLICKHOUSE_URL")?;
    let user = read_env_var("CLICKHOUSE_USER")?;
    let password = read_env_var("CLICKHOUSE_PASSWORD")?;
    let database = read_env_var("CLICKHOUSE_DATABASE")?;

    log::info!("Connecting to ClickHouse at {}", url);
    Some(
        Client::default()
            .with_url(url)
            .with_user(user)
            .with_password(password)
            .with_database(database)
            .with_option("join_use_nulls", "1"), // NULL for unmatched LEFT JOIN columns
    )
}

/// Blocking [`Connection`] over the async ClickHouse HTTP client.
///
/// Rows are fetched as `JSONCompactEachRow`, one JSON array per line, and
/// decoded lazily as the reader pulls them. The connection owns a private
/// current-thread runtime, so it must not be used from inside another
/// tokio runtime.
pub struct ClickHouseConnection {
    client: Client,
    runtime: Runtime,
}

impl ClickHouseConnection {
    pub fn new(client: Client) -> Result<Self, ConnectionError> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(ClickHouseConnection { client, runtime })
    }

    pub fn from_env() -> Result<Self, ConnectionError> {
        let client = try_get_client().ok_or_else(|| {
            ConnectionError::NotConfigured(
                "CLICKHOUSE_URL, CLICKHOUSE_USER, CLICKHOUSE_PASSWORD and CLICKHOUSE_DATABASE must be set"
                    .to_string(),
            )
        })?;
        Self::new(client)
    }
}

impl Connection for ClickHouseConnection {
    fn metadata(&mut self) -> Result<ConnectionMetadata, ConnectionError> {
        let version = {
            let mut cursor = self.execute("SELECT version()")?;
            cursor.next_row()?.and_then(|row| row.into_iter().next().flatten())
        };
        let version = version.ok_or_else(|| {
            ConnectionError::Statement("SELECT version() returned no rows".to_string())
        })?;
        Ok(ConnectionMetadata::new(
            "ClickHouse",
            major_version(&version).unwrap_or(0),
            DRIVER_NAME,
            DRIVER_MAJOR_VERSION,
        ))
    }

    fn execute(&mut self, sql: &str) -> Result<Box<dyn RowCursor + '_>, ConnectionError> {
        let _guard = self.runtime.enter();
        let lines = self
            .client
            .query(sql)
            .fetch_bytes("JSONCompactEachRow")?
            .lines();
        Ok(Box::new(ClickHouseCursor {
            runtime: &self.runtime,
            lines,
        }))
    }
}

struct ClickHouseCursor<'a, R> {
    runtime: &'a Runtime,
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin> RowCursor for ClickHouseCursor<'_, R> {
    fn next_row(&mut self) -> Result<Option<Row>, ConnectionError> {
        loop {
            let Some(line) = self.runtime.block_on(self.lines.next_line())? else {
                return Ok(None);
            };
            if line.trim().is_empty() {
                continue;
            }
            return decode_compact_row(&line).map(Some);
        }
    }
}

/// Decodes one `JSONCompactEachRow` line into raw column strings.
///
/// Strings are taken verbatim; numbers and booleans keep their JSON text.
fn decode_compact_row(line: &str) -> Result<Row, ConnectionError> {
    let values: Vec<serde_json::Value> =
        serde_json::from_str(line).map_err(|source| ConnectionError::MalformedRow {
            line: line.to_string(),
            source,
        })?;
    Ok(values
        .into_iter()
        .map(|value| match value {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Bool(b) => Some(if b { "1" } else { "0" }.to_string()),
            other => Some(other.to_string()),
        })
        .collect())
}
