use thiserror::Error;

/// Compilation failures. Each one means the mapping and the query scope
/// disagree; none of them is worth retrying.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SqlGenerationError {
    #[error("No table alias allocated for '{table}' (path is not part of this statement)")]
    MissingAlias { table: String },
    #[error("Entity '{entity}' has no {role} column to emit")]
    MissingColumn { entity: String, role: String },
    #[error("Entity '{entity}' references unknown entity '{target}' through '{reference}'")]
    UnknownEntity {
        entity: String,
        reference: String,
        target: String,
    },
    #[error("Entity '{entity}' declares no reference named '{reference}'")]
    UnknownReference { entity: String, reference: String },
    #[error(
        "Reference '{reference}' of entity '{entity}' reads {found} id columns but '{target}' has {expected}"
    )]
    ReferenceArity {
        entity: String,
        reference: String,
        target: String,
        expected: usize,
        found: usize,
    },
    #[error("Entity '{entity}' has no property '{property}' to filter on")]
    UnknownProperty { entity: String, property: String },
    #[error("Table '{table}' is not joined to the rest of the statement")]
    DisconnectedTable { table: String },
}
