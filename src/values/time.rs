//! Positions, granularities and intervals.
//!
//! A position is a millisecond offset from the Unix epoch (UTC). Each entity
//! mapping declares how its raw start/finish strings become positions through
//! a [`PositionParser`], and the granularity its timestamps are recorded at.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::literal::SqlLiteral;

#[derive(Debug, Clone, Error, PartialEq)]
#[error("Cannot parse '{raw}' as a {parser} position")]
pub struct PositionParseError {
    pub raw: String,
    pub parser: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    #[default]
    Millisecond,
    Second,
    Minute,
    Hour,
    Day,
    Month,
    Year,
}

/// Strategy for turning a stored time column into a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionParser {
    /// Column holds an integer number of milliseconds since the epoch.
    EpochMillis,
    /// Column holds a date or timestamp string.
    #[default]
    Timestamp,
}

impl PositionParser {
    pub fn name(&self) -> &'static str {
        match self {
            PositionParser::EpochMillis => "epoch_millis",
            PositionParser::Timestamp => "timestamp",
        }
    }

    pub fn parse(&self, raw: &str) -> Result<i64, PositionParseError> {
        let parsed = match self {
            PositionParser::EpochMillis => raw.trim().parse::<i64>().ok(),
            PositionParser::Timestamp => {
                parse_timestamp(raw.trim()).map(|ts| ts.and_utc().timestamp_millis())
            }
        };
        parsed.ok_or_else(|| PositionParseError {
            raw: raw.to_string(),
            parser: self.name(),
        })
    }

    /// Render a position back into a literal comparable with the stored column.
    pub fn to_literal(&self, position: i64) -> SqlLiteral {
        match self {
            PositionParser::EpochMillis => SqlLiteral::Integer(position),
            PositionParser::Timestamp => match DateTime::<Utc>::from_timestamp_millis(position) {
                Some(ts) => SqlLiteral::Timestamp(ts.naive_utc()),
                None => SqlLiteral::Integer(position),
            },
        }
    }
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS[.fff]` (space or `T`) and RFC 3339.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_utc());
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Temporal extent of a proposition, in positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: i64,
    pub finish: i64,
    pub granularity: Granularity,
}

impl Interval {
    pub fn point(position: i64, granularity: Granularity) -> Self {
        Interval {
            start: position,
            finish: position,
            granularity,
        }
    }

    pub fn span(start: i64, finish: i64, granularity: Granularity) -> Self {
        Interval {
            start,
            finish,
            granularity,
        }
    }

    pub fn is_point(&self) -> bool {
        self.start == self.finish
    }
}
