//! Per-database SQL emission.
//!
//! The clause generators never write vendor syntax themselves; every column
//! reference, join, literal, IN list and the final statement shape go
//! through a [`SqlDialect`]. Reading requires a [`VerifiedDialect`], which
//! only exists once the driver preload and the compatibility check passed
//! against a live connection.

pub mod clickhouse;
pub mod mysql;
pub mod oracle;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::connection::ConnectionMetadata;
use crate::filters::SortDirection;
use crate::mapping_catalog::JoinKind;
use crate::values::SqlLiteral;

pub use self::clickhouse::ClickHouseDialect;
pub use self::mysql::MySqlDialect;
pub use self::oracle::OracleDialect;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DialectError {
    #[error("Driver '{driver}' for dialect '{dialect}' is not available: {message}")]
    DriverUnavailable {
        dialect: String,
        driver: String,
        message: String,
    },
    #[error("Unknown dialect '{0}' (expected mysql, oracle or clickhouse)")]
    UnknownDialect(String),
}

/// Clause fragments of one statement, before vendor assembly.
///
/// `where_clause` holds the `and`-joined predicates without the keyword;
/// `order_clause` starts at `order by`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClauseSet {
    pub select_clause: String,
    pub from_clause: String,
    pub where_clause: Option<String>,
    pub order_clause: Option<String>,
}

pub trait SqlDialect: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn driver_name(&self) -> &'static str;

    /// Makes the driver usable; must run before [`check_compatibility`](Self::check_compatibility).
    fn load_driver_if_needed(&self) -> Result<(), DialectError> {
        Ok(())
    }

    fn check_compatibility(&self, metadata: &ConnectionMetadata) -> bool;

    /// Largest number of values one `IN (...)` list may hold.
    fn max_in_list_size(&self) -> Option<usize> {
        None
    }

    fn table_ref(&self, schema: Option<&str>, table: &str) -> String {
        match schema {
            Some(schema) => format!("{}.{}", schema, table),
            None => table.to_string(),
        }
    }

    fn column_ref(&self, alias: usize, column: &str) -> String {
        format!("a{}.{}", alias, column)
    }

    fn select_column(&self, alias: usize, column: &str, name: &str) -> String {
        format!("{} as {}", self.column_ref(alias, column), name)
    }

    fn from_table(&self, schema: Option<&str>, table: &str, alias: usize) -> String {
        format!("{} a{}", self.table_ref(schema, table), alias)
    }

    fn join_keyword(&self, kind: JoinKind) -> &'static str {
        match kind {
            JoinKind::Inner => "join",
            JoinKind::LeftOuter => "left outer join",
        }
    }

    fn on_clause(&self, from_alias: usize, from_key: &str, to_alias: usize, to_key: &str) -> String {
        format!(
            "on ({} = {})",
            self.column_ref(from_alias, from_key),
            self.column_ref(to_alias, to_key)
        )
    }

    fn quote_literal(&self, literal: &SqlLiteral) -> String;

    /// `column IN (...)`, split into `OR`-joined lists (`AND`-joined when
    /// negated) once the vendor limit is exceeded.
    fn in_clause(&self, column: &str, values: &[String], negated: bool) -> String {
        let (keyword, joiner) = if negated {
            ("NOT IN", " AND ")
        } else {
            ("IN", " OR ")
        };
        split_in_lists(values, self.max_in_list_size())
            .map(|chunk| format!("{} {} ({})", column, keyword, chunk.join(",")))
            .collect::<Vec<_>>()
            .join(joiner)
    }

    /// Key-id restriction, written `alias.col in ('k1','k2')`.
    fn key_in_clause(&self, column: &str, values: &[String]) -> String {
        let lists: Vec<String> = split_in_lists(values, self.max_in_list_size())
            .map(|chunk| format!("{} in ({})", column, chunk.join(",")))
            .collect();
        if lists.len() == 1 {
            lists.join("")
        } else {
            format!("({})", lists.join(" or "))
        }
    }

    /// `CASE WHEN column LIKE pattern THEN 'id' ... ELSE 'OTHER' END as name`.
    fn case_when(&self, column: &str, arms: &[(String, String)], name: &str) -> String {
        let whens: String = arms
            .iter()
            .map(|(pattern, id)| {
                format!(
                    " WHEN {} LIKE {} THEN {}",
                    column,
                    pattern,
                    self.quote_literal(&SqlLiteral::text(id.as_str()))
                )
            })
            .collect();
        format!("CASE{} ELSE 'OTHER' END as {}", whens, name)
    }

    /// The direction follows every column so a descending read is
    /// descending on start time first.
    fn order_by(&self, columns: &[String], direction: SortDirection) -> String {
        let keys: Vec<String> = columns
            .iter()
            .map(|column| format!("{} {}", column, direction.keyword()))
            .collect();
        format!("order by {}", keys.join(", "))
    }

    /// Statement shape with `{select_clause}`, `{from_clause}`,
    /// `{where_clause}` and `{order_clause}` tokens.
    fn select_template(&self) -> &'static str {
        "select {select_clause} from {from_clause}{where_clause}{order_clause}"
    }

    fn paginate(&self, statement: String, limit: u64) -> String;

    fn assemble(&self, clauses: &ClauseSet, limit: Option<u64>) -> String {
        let where_clause = clauses
            .where_clause
            .as_ref()
            .map(|w| format!(" where {}", w))
            .unwrap_or_default();
        let order_clause = clauses
            .order_clause
            .as_ref()
            .map(|o| format!(" {}", o))
            .unwrap_or_default();
        let statement = self
            .select_template()
            .replace("{select_clause}", &clauses.select_clause)
            .replace("{from_clause}", &clauses.from_clause)
            .replace("{where_clause}", &where_clause)
            .replace("{order_clause}", &order_clause);
        match limit {
            Some(limit) => self.paginate(statement, limit),
            None => statement,
        }
    }
}

fn split_in_lists(values: &[String], limit: Option<usize>) -> std::slice::Chunks<'_, String> {
    let size = limit.filter(|n| *n > 0).unwrap_or(values.len().max(1));
    values.chunks(size)
}

/// Single-quoted string with embedded quotes doubled.
pub(crate) fn quote_text(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

pub fn for_name(name: &str) -> Result<Arc<dyn SqlDialect>, DialectError> {
    match name.to_ascii_lowercase().as_str() {
        "mysql" => Ok(Arc::new(MySqlDialect)),
        "oracle" => Ok(Arc::new(OracleDialect)),
        "clickhouse" => Ok(Arc::new(ClickHouseDialect)),
        other => Err(DialectError::UnknownDialect(other.to_string())),
    }
}

/// A dialect whose driver loaded and which accepted the connection it will
/// be used with.
#[derive(Debug, Clone)]
pub struct VerifiedDialect {
    dialect: Arc<dyn SqlDialect>,
    metadata: ConnectionMetadata,
}

impl VerifiedDialect {
    /// `Ok(None)` when the dialect does not fit the connection; callers
    /// should move on to another dialect rather than retry.
    pub fn verify(
        dialect: Arc<dyn SqlDialect>,
        metadata: &ConnectionMetadata,
    ) -> Result<Option<Self>, DialectError> {
        dialect.load_driver_if_needed()?;
        if !dialect.check_compatibility(metadata) {
            log::debug!(
                "Dialect {} is not compatible with {} {} (driver {} {})",
                dialect.name(),
                metadata.product_name,
                metadata.product_major_version,
                metadata.driver_name,
                metadata.driver_major_version
            );
            return Ok(None);
        }
        Ok(Some(VerifiedDialect {
            dialect,
            metadata: metadata.clone(),
        }))
    }

    /// First candidate that verifies; failing drivers are logged and skipped.
    pub fn first_compatible(
        candidates: impl IntoIterator<Item = Arc<dyn SqlDialect>>,
        metadata: &ConnectionMetadata,
    ) -> Option<Self> {
        candidates
            .into_iter()
            .find_map(|dialect| match Self::verify(dialect, metadata) {
                Ok(verified) => verified,
                Err(e) => {
                    log::warn!("Skipping dialect: {}", e);
                    None
                }
            })
    }

    pub fn dialect(&self) -> &dyn SqlDialect {
        self.dialect.as_ref()
    }

    pub fn metadata(&self) -> &ConnectionMetadata {
        &self.metadata
    }
}
