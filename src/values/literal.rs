use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A typed literal as it appears in generated SQL.
///
/// Literals stay typed until a dialect renders them, because quoting rules
/// differ: Oracle writes booleans as `1`/`0`, ClickHouse wraps timestamps in
/// `toDateTime64(...)`, and numeric codes must never be quoted.
///
/// In mapping files a literal is written as a plain YAML scalar:
/// `code: 42` is an integer, `code: "42"` is text, `code: true` is a boolean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlLiteral {
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl SqlLiteral {
    pub fn text(value: impl Into<String>) -> Self {
        SqlLiteral::Text(value.into())
    }

    /// The value as a database driver hands it back in a result row.
    ///
    /// Used to match stored codes read from a cursor against the code table.
    pub fn raw(&self) -> String {
        match self {
            SqlLiteral::Boolean(b) => if *b { "1" } else { "0" }.to_string(),
            SqlLiteral::Integer(i) => i.to_string(),
            SqlLiteral::Decimal(d) => d.to_string(),
            SqlLiteral::Text(s) => s.clone(),
            SqlLiteral::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
        }
    }
}

impl fmt::Display for SqlLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw())
    }
}
