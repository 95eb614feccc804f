use std::collections::BTreeSet;
use std::sync::Arc;

use super::column_path::{ColumnPath, Constraint};
use super::errors::MappingError;
use crate::proposition::PropositionKind;
use crate::values::{Granularity, PositionParser, ValueType};

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyMapping {
    pub name: String,
    pub path: Arc<ColumnPath>,
    pub value_type: ValueType,
}

/// A named 1:N relation from one entity to another.
///
/// `paths` are read from the referencing entity's tables and yield the
/// target entity's unique-id columns, in the target's declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceMapping {
    pub name: String,
    pub entity: String,
    pub paths: Vec<Arc<ColumnPath>>,
}

/// How one proposition shape is stored relationally.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityMapping {
    pub name: String,
    pub description: Option<String>,
    pub kind: PropositionKind,
    pub proposition_ids: Vec<String>,
    /// Rows are already unique per identity, so no `DISTINCT` is needed.
    pub unique: bool,
    /// Defines the owning key; its column is the key id.
    pub base_path: Arc<ColumnPath>,
    pub unique_id_paths: Vec<Arc<ColumnPath>>,
    pub start_time_path: Option<Arc<ColumnPath>>,
    pub finish_time_path: Option<Arc<ColumnPath>>,
    pub code_path: Option<Arc<ColumnPath>>,
    pub value_path: Option<Arc<ColumnPath>>,
    pub value_type: Option<ValueType>,
    pub properties: Vec<PropertyMapping>,
    pub constraint_paths: Vec<Arc<ColumnPath>>,
    pub references: Vec<ReferenceMapping>,
    pub granularity: Granularity,
    pub position_parser: PositionParser,
}

impl EntityMapping {
    pub fn validate(&self) -> Result<(), MappingError> {
        if self.proposition_ids.is_empty() {
            return Err(MappingError::invalid_entity(
                &self.name,
                "no proposition ids declared",
            ));
        }
        if self.base_path.column_hop().is_none() {
            return Err(MappingError::invalid_entity(
                &self.name,
                "base path has no key column",
            ));
        }
        if self.unique_id_paths.is_empty() {
            return Err(MappingError::invalid_entity(
                &self.name,
                "at least one unique id path is required",
            ));
        }
        let mut columned: Vec<(&str, &Arc<ColumnPath>)> = self
            .unique_id_paths
            .iter()
            .map(|p| ("unique id", p))
            .collect();
        columned.extend(self.start_time_path.iter().map(|p| ("start time", p)));
        columned.extend(self.finish_time_path.iter().map(|p| ("finish time", p)));
        columned.extend(self.code_path.iter().map(|p| ("code", p)));
        columned.extend(self.value_path.iter().map(|p| ("value", p)));
        columned.extend(self.properties.iter().map(|p| ("property", &p.path)));
        for (role, path) in columned {
            if path.column_hop().is_none() {
                return Err(MappingError::invalid_entity(
                    &self.name,
                    format!("{} path on table '{}' has no column", role, path.table()),
                ));
            }
        }
        if self.code_path.is_none() && self.proposition_ids.len() != 1 {
            return Err(MappingError::invalid_entity(
                &self.name,
                "entities without a code path must produce exactly one proposition id",
            ));
        }
        match self.kind {
            PropositionKind::Event | PropositionKind::PrimitiveParameter => {
                if self.start_time_path.is_none() {
                    return Err(MappingError::invalid_entity(
                        &self.name,
                        format!("a {} mapping needs a start time path", self.kind),
                    ));
                }
            }
            PropositionKind::Constant => {}
        }
        if self.value_path.is_some() != self.value_type.is_some() {
            return Err(MappingError::invalid_entity(
                &self.name,
                "value path and value type must be declared together",
            ));
        }
        for reference in &self.references {
            if reference.paths.is_empty() {
                return Err(MappingError::invalid_entity(
                    &self.name,
                    format!("reference '{}' has no id paths", reference.name),
                ));
            }
        }
        Ok(())
    }

    pub fn produces(&self, proposition_id: &str) -> bool {
        self.proposition_ids.iter().any(|id| id == proposition_id)
    }

    /// The requested ids this entity can produce.
    pub fn requested_ids(&self, requested: &BTreeSet<String>) -> BTreeSet<String> {
        self.proposition_ids
            .iter()
            .filter(|id| requested.contains(*id))
            .cloned()
            .collect()
    }

    pub fn reference(&self, name: &str) -> Option<&ReferenceMapping> {
        self.references.iter().find(|r| r.name == name)
    }

    pub fn property_index(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|p| p.name == name)
    }

    /// Whether the code column is classified by `LIKE` patterns.
    pub fn has_pattern_code(&self) -> bool {
        self.code_path
            .as_ref()
            .is_some_and(|p| p.terminal().constraint() == Some(Constraint::Like))
    }
}
