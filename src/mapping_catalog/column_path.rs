//! Column paths: chains of table hops connected by joins.
//!
//! A path such as `PATIENT.PATIENT_ID -> ENCOUNTER.TS_START` is a `ColumnPath`
//! for `PATIENT` whose [`JoinSpec`] points at a second `ColumnPath` for
//! `ENCOUNTER`. Paths are immutable once built and shared behind `Arc`; the
//! SQL generator tells occurrences apart by pointer identity, not by value.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::errors::MappingError;
use crate::values::SqlLiteral;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
    #[default]
    Inner,
    LeftOuter,
}

/// Comparison a terminal hop applies between its column and the stored codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    EqualTo,
    NotEqualTo,
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    Like,
}

impl Constraint {
    pub fn sql_operator(&self) -> &'static str {
        match self {
            Constraint::EqualTo => "=",
            Constraint::NotEqualTo => "<>",
            Constraint::LessThan => "<",
            Constraint::LessThanOrEqualTo => "<=",
            Constraint::GreaterThan => ">",
            Constraint::GreaterThanOrEqualTo => ">=",
            Constraint::Like => "LIKE",
        }
    }
}

/// One row of a code table: the proposition id a stored code stands for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeEntry {
    pub proposition_id: String,
    pub code: SqlLiteral,
}

impl CodeEntry {
    pub fn new(proposition_id: impl Into<String>, code: SqlLiteral) -> Self {
        CodeEntry {
            proposition_id: proposition_id.into(),
            code,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinSpec {
    pub from_key: String,
    pub to_key: String,
    pub kind: JoinKind,
    pub next: Arc<ColumnPath>,
}

impl JoinSpec {
    pub fn new(from_key: impl Into<String>, to_key: impl Into<String>, next: Arc<ColumnPath>) -> Self {
        JoinSpec {
            from_key: from_key.into(),
            to_key: to_key.into(),
            kind: JoinKind::Inner,
            next,
        }
    }

    pub fn left_outer(mut self) -> Self {
        self.kind = JoinKind::LeftOuter;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnPath {
    schema: Option<String>,
    table: String,
    column: Option<String>,
    join: Option<JoinSpec>,
    constraint: Option<Constraint>,
    codes: Vec<CodeEntry>,
    // Hops reachable through `join`, computed at build time.
    tail: Vec<Arc<ColumnPath>>,
}

impl ColumnPath {
    pub fn builder(table: impl Into<String>) -> ColumnPathBuilder {
        ColumnPathBuilder {
            schema: None,
            table: table.into(),
            column: None,
            join: None,
            constraint: None,
            codes: Vec::new(),
        }
    }

    /// Shorthand for a single-hop path ending in `column`.
    pub fn column(
        schema: Option<&str>,
        table: &str,
        column: &str,
    ) -> Result<Arc<ColumnPath>, MappingError> {
        let mut builder = ColumnPath::builder(table).column(column);
        if let Some(schema) = schema {
            builder = builder.schema(schema);
        }
        builder.build()
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn column_name(&self) -> Option<&str> {
        self.column.as_deref()
    }

    pub fn join(&self) -> Option<&JoinSpec> {
        self.join.as_ref()
    }

    pub fn constraint(&self) -> Option<Constraint> {
        self.constraint
    }

    pub fn codes(&self) -> &[CodeEntry] {
        &self.codes
    }

    /// This hop followed by every hop reachable through its joins.
    pub fn flatten(self: &Arc<Self>) -> Vec<Arc<ColumnPath>> {
        let mut hops = Vec::with_capacity(self.tail.len() + 1);
        hops.push(Arc::clone(self));
        hops.extend(self.tail.iter().cloned());
        hops
    }

    /// Position, within [`flatten`](Self::flatten), of the last hop carrying a column.
    pub fn column_hop(self: &Arc<Self>) -> Option<usize> {
        self.flatten()
            .iter()
            .rposition(|hop| hop.column.is_some())
    }

    /// The last hop of the path, where its column and constraint live.
    pub fn terminal(self: &Arc<Self>) -> Arc<ColumnPath> {
        self.tail.last().cloned().unwrap_or_else(|| Arc::clone(self))
    }

    /// Stable identity of a shared path object.
    pub fn identity(path: &Arc<ColumnPath>) -> usize {
        Arc::as_ptr(path) as usize
    }
}

#[derive(Debug, Clone)]
pub struct ColumnPathBuilder {
    schema: Option<String>,
    table: String,
    column: Option<String>,
    join: Option<JoinSpec>,
    constraint: Option<Constraint>,
    codes: Vec<CodeEntry>,
}

impl ColumnPathBuilder {
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn join(mut self, join: JoinSpec) -> Self {
        self.join = Some(join);
        self
    }

    pub fn constraint(mut self, constraint: Constraint, codes: Vec<CodeEntry>) -> Self {
        self.constraint = Some(constraint);
        self.codes = codes;
        self
    }

    pub fn build(self) -> Result<Arc<ColumnPath>, MappingError> {
        if self.table.trim().is_empty() {
            return Err(MappingError::EmptyTable);
        }
        if self.constraint.is_some() {
            let Some(column) = self.column.as_ref() else {
                return Err(MappingError::ConstraintWithoutColumn { table: self.table });
            };
            if self.codes.is_empty() {
                return Err(MappingError::ConstraintWithoutCodes {
                    table: self.table.clone(),
                    column: column.clone(),
                });
            }
            if self.join.is_some() {
                return Err(MappingError::ConstraintOnJoinedHop { table: self.table });
            }
        }
        let tail = match &self.join {
            Some(join) => join.next.flatten(),
            None => Vec::new(),
        };
        Ok(Arc::new(ColumnPath {
            schema: self.schema,
            table: self.table,
            column: self.column,
            join: self.join,
            constraint: self.constraint,
            codes: self.codes,
            tail,
        }))
    }
}
