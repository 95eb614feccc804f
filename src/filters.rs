//! Query filters.
//!
//! Each filter names the proposition ids it applies to. A filter whose ids do
//! not intersect the ids an entity is being queried for is ignored for that
//! entity rather than treated as an error.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::values::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn keyword(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Filter {
    Position(PositionFilter),
    PropertyValue(PropertyValueFilter),
}

impl Filter {
    pub fn proposition_ids(&self) -> &BTreeSet<String> {
        match self {
            Filter::Position(f) => &f.proposition_ids,
            Filter::PropertyValue(f) => &f.proposition_ids,
        }
    }

    pub fn applies_to<'a>(&self, mut proposition_ids: impl Iterator<Item = &'a String>) -> bool {
        let own = self.proposition_ids();
        proposition_ids.any(|id| own.contains(id))
    }
}

/// Keeps propositions whose interval lies within `[start, finish]`.
///
/// Bounds are positions (milliseconds since the epoch); either may be open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionFilter {
    pub proposition_ids: BTreeSet<String>,
    pub start: Option<i64>,
    pub finish: Option<i64>,
}

impl PositionFilter {
    pub fn new(
        proposition_ids: impl IntoIterator<Item = impl Into<String>>,
        start: Option<i64>,
        finish: Option<i64>,
    ) -> Self {
        PositionFilter {
            proposition_ids: proposition_ids.into_iter().map(Into::into).collect(),
            start,
            finish,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueComparator {
    EqualTo,
    NotEqualTo,
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    In,
    NotIn,
}

/// Keeps propositions whose named property compares true against `values`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyValueFilter {
    pub proposition_ids: BTreeSet<String>,
    pub property: String,
    pub comparator: ValueComparator,
    pub values: Vec<Value>,
}

impl PropertyValueFilter {
    pub fn new(
        proposition_ids: impl IntoIterator<Item = impl Into<String>>,
        property: impl Into<String>,
        comparator: ValueComparator,
        values: Vec<Value>,
    ) -> Self {
        PropertyValueFilter {
            proposition_ids: proposition_ids.into_iter().map(Into::into).collect(),
            property: property.into(),
            comparator,
            values,
        }
    }
}
