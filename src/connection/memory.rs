//! In-memory [`Connection`] that replays canned result sets.
//!
//! Result sets are matched to statements by substring, in registration
//! order; a statement that matches nothing yields an empty cursor. Every
//! executed statement is recorded for assertions. Built for tests and
//! behind the `testing` feature only.

use std::collections::VecDeque;

use super::{Connection, ConnectionError, ConnectionMetadata, Row, RowCursor};

#[derive(Debug, Clone)]
pub struct InMemoryConnection {
    metadata: ConnectionMetadata,
    results: Vec<(String, Vec<Row>)>,
    failures: Vec<(String, String)>,
    executed: Vec<String>,
}

impl InMemoryConnection {
    pub fn new(metadata: ConnectionMetadata) -> Self {
        InMemoryConnection {
            metadata,
            results: Vec::new(),
            failures: Vec::new(),
            executed: Vec::new(),
        }
    }

    /// Rows returned for any statement containing `fragment`.
    pub fn with_rows(mut self, fragment: impl Into<String>, rows: Vec<Row>) -> Self {
        self.results.push((fragment.into(), rows));
        self
    }

    /// Statements containing `fragment` fail with `message`.
    pub fn with_failure(mut self, fragment: impl Into<String>, message: impl Into<String>) -> Self {
        self.failures.push((fragment.into(), message.into()));
        self
    }

    pub fn executed(&self) -> &[String] {
        &self.executed
    }
}

impl Connection for InMemoryConnection {
    fn metadata(&mut self) -> Result<ConnectionMetadata, ConnectionError> {
        Ok(self.metadata.clone())
    }

    fn execute(&mut self, sql: &str) -> Result<Box<dyn RowCursor + '_>, ConnectionError> {
        self.executed.push(sql.to_string());
        if let Some((_, message)) = self.failures.iter().find(|(f, _)| sql.contains(f.as_str())) {
            return Err(ConnectionError::Statement(message.clone()));
        }
        let rows = self
            .results
            .iter()
            .find(|(fragment, _)| sql.contains(fragment.as_str()))
            .map(|(_, rows)| rows.iter().cloned().collect())
            .unwrap_or_default();
        Ok(Box::new(ReplayCursor { rows }))
    }
}

struct ReplayCursor {
    rows: VecDeque<Row>,
}

impl RowCursor for ReplayCursor {
    fn next_row(&mut self) -> Result<Option<Row>, ConnectionError> {
        Ok(self.rows.pop_front())
    }
}

/// Shorthand for building canned rows in tests.
pub fn row(values: &[Option<&str>]) -> Row {
    values.iter().map(|v| v.map(str::to_string)).collect()
}
