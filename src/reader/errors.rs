use thiserror::Error;

use crate::connection::ConnectionError;
use crate::dialect::DialectError;
use crate::proposition::UniqueId;
use crate::sql_generator::SqlGenerationError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CacheError {
    #[error("Reference '{reference}' from {source_id} cannot be linked: source proposition was never read")]
    MissingReferenceSource { source_id: UniqueId, reference: String },
}

/// A failed read, always naming the entity whose statement failed.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Cannot compile query for entity '{entity}': {source}")]
    Compilation {
        entity: String,
        source: SqlGenerationError,
    },
    #[error("Query for entity '{entity}' failed: {source}")]
    Execution {
        entity: String,
        source: ConnectionError,
    },
    #[error("Reference '{reference}' of entity '{entity}' read before its sources: {source}")]
    ReferenceOrdering {
        entity: String,
        reference: String,
        source: CacheError,
    },
    #[error("Entity '{entity}': result row has no value for identity column '{column}'")]
    InvalidIdentity { entity: String, column: String },
    #[error("Entity '{entity}': result row has {found} columns, expected {expected}")]
    RowShape {
        entity: String,
        expected: usize,
        found: usize,
    },
    #[error("Cannot read connection metadata: {0}")]
    Metadata(ConnectionError),
    #[error("Dialect error: {0}")]
    Dialect(#[from] DialectError),
    #[error("No dialect is compatible with {product} {version}")]
    IncompatibleDialect { product: String, version: u32 },
}

impl ReadError {
    pub fn entity(&self) -> Option<&str> {
        match self {
            ReadError::Compilation { entity, .. }
            | ReadError::Execution { entity, .. }
            | ReadError::ReferenceOrdering { entity, .. }
            | ReadError::InvalidIdentity { entity, .. }
            | ReadError::RowShape { entity, .. } => Some(entity),
            ReadError::Metadata(_) | ReadError::Dialect(_) | ReadError::IncompatibleDialect { .. } => {
                None
            }
        }
    }
}
