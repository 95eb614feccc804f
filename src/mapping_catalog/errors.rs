use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum MappingError {
    #[error("Column path has an empty table name")]
    EmptyTable,
    #[error("Constraint on table '{table}' has no column to constrain")]
    ConstraintWithoutColumn { table: String },
    #[error("Constraint on '{table}.{column}' has an empty code table")]
    ConstraintWithoutCodes { table: String, column: String },
    #[error("Constraint on table '{table}' is not on the terminal hop of its path")]
    ConstraintOnJoinedHop { table: String },
    #[error("Entity '{entity}': {message}")]
    InvalidEntity { entity: String, message: String },
    #[error("Entity '{entity}' declares reference '{reference}' to unknown entity '{target}'")]
    UnknownReferenceTarget {
        entity: String,
        reference: String,
        target: String,
    },
    #[error("Entity name '{0}' is declared more than once")]
    DuplicateEntity(String),
    #[error("Failed to read mapping file: {error}")]
    ConfigReadError { error: String },
    #[error("Failed to parse mapping file: {error}")]
    ConfigParseError { error: String },
}

impl MappingError {
    pub fn invalid_entity(entity: impl Into<String>, message: impl Into<String>) -> Self {
        MappingError::InvalidEntity {
            entity: entity.into(),
            message: message.into(),
        }
    }
}
