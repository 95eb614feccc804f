//! Typed proposition values
//!
//! Column strings read from a cursor are turned into [`Value`]s by the
//! [`ValueType`] declared for that column in the mapping. Parsing is lenient:
//! an unparsable string yields `None` and the caller decides whether that is
//! worth a log line.

use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use super::literal::SqlLiteral;
use super::time::parse_timestamp;

static INEQUALITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(<=|>=|<|>)\s*([-+]?\d+(?:\.\d+)?)\s*$").expect("static regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Nominal,
    Number,
    Boolean,
    Date,
    Ordinal,
    Inequality,
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InequalityComparator {
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
}

impl InequalityComparator {
    fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "<" => Some(InequalityComparator::LessThan),
            "<=" => Some(InequalityComparator::LessThanOrEqualTo),
            ">" => Some(InequalityComparator::GreaterThan),
            ">=" => Some(InequalityComparator::GreaterThanOrEqualTo),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Nominal(String),
    Number(f64),
    Boolean(bool),
    Date(NaiveDateTime),
    Ordinal(String),
    Inequality {
        comparator: InequalityComparator,
        number: f64,
    },
    List(Vec<Value>),
}

impl ValueType {
    /// Parse a raw column string into a value of this type.
    pub fn parse(&self, raw: &str) -> Option<Value> {
        let trimmed = raw.trim();
        match self {
            ValueType::Nominal => Some(Value::Nominal(raw.to_string())),
            ValueType::Ordinal => Some(Value::Ordinal(raw.to_string())),
            ValueType::Number => trimmed.parse::<f64>().ok().map(Value::Number),
            ValueType::Boolean => parse_boolean(trimmed).map(Value::Boolean),
            ValueType::Date => parse_timestamp(trimmed).map(Value::Date),
            ValueType::Inequality => {
                let caps = INEQUALITY.captures(trimmed)?;
                let comparator = InequalityComparator::from_symbol(&caps[1])?;
                let number = caps[2].parse::<f64>().ok()?;
                Some(Value::Inequality { comparator, number })
            }
            ValueType::List => {
                let inner = trimmed
                    .strip_prefix('[')
                    .and_then(|s| s.strip_suffix(']'))
                    .unwrap_or(trimmed);
                Some(Value::List(
                    inner
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(|s| Value::Nominal(s.to_string()))
                        .collect(),
                ))
            }
        }
    }
}

fn parse_boolean(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Some(true),
        "false" | "f" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}

impl Value {
    /// The literal to compare a column against, or `None` for lists.
    pub fn to_sql_literal(&self) -> Option<SqlLiteral> {
        match self {
            Value::Nominal(s) | Value::Ordinal(s) => Some(SqlLiteral::Text(s.clone())),
            Value::Number(n) => Some(number_literal(*n)),
            Value::Boolean(b) => Some(SqlLiteral::Boolean(*b)),
            Value::Date(d) => Some(SqlLiteral::Timestamp(*d)),
            Value::Inequality { number, .. } => Some(number_literal(*number)),
            Value::List(_) => None,
        }
    }

    /// Every literal this value stands for; lists expand to their members.
    pub fn to_sql_literals(&self) -> Vec<SqlLiteral> {
        match self {
            Value::List(items) => items.iter().flat_map(Value::to_sql_literals).collect(),
            other => other.to_sql_literal().into_iter().collect(),
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }
}

fn number_literal(n: f64) -> SqlLiteral {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        SqlLiteral::Integer(n as i64)
    } else {
        SqlLiteral::Decimal(n)
    }
}
