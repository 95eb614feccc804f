//! Flattens an entity's column paths into one ordered hop list.
//!
//! Walk order: key path, unique ids, start time, finish time, value,
//! properties, free-standing constraints, then the code path. A reference
//! query appends the reference's id paths after all of these. For every role
//! the position of the hop carrying its column is recorded; clause builders
//! find "their" column only through these positions.

use std::sync::Arc;

use super::errors::SqlGenerationError;
use crate::mapping_catalog::{ColumnPath, EntityMapping, MappingCatalog, ReferenceMapping};

/// Positions, within [`FlattenedPaths::hops`], of each role's column hop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleIndices {
    pub key: Option<usize>,
    pub unique_ids: Vec<usize>,
    pub start: Option<usize>,
    pub finish: Option<usize>,
    pub value: Option<usize>,
    pub properties: Vec<usize>,
    pub constraints: Vec<usize>,
    pub code: Option<usize>,
    pub reference_ids: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct FlattenedPaths {
    hops: Vec<Arc<ColumnPath>>,
    indices: RoleIndices,
}

impl FlattenedPaths {
    pub fn for_entity(entity: &EntityMapping) -> Self {
        let mut flattener = Flattener::default();
        flattener.walk_entity(entity);
        flattener.finish()
    }

    /// The entity's paths followed by the id paths of `reference`.
    ///
    /// The target entity is resolved through `catalog`; the reference must
    /// yield exactly as many id columns as the target declares.
    pub fn for_reference(
        entity: &EntityMapping,
        reference: &ReferenceMapping,
        catalog: &MappingCatalog,
    ) -> Result<Self, SqlGenerationError> {
        let target = catalog
            .get(&reference.entity)
            .ok_or_else(|| SqlGenerationError::UnknownEntity {
                entity: entity.name.clone(),
                reference: reference.name.clone(),
                target: reference.entity.clone(),
            })?;
        if target.unique_id_paths.len() != reference.paths.len() {
            return Err(SqlGenerationError::ReferenceArity {
                entity: entity.name.clone(),
                reference: reference.name.clone(),
                target: target.name.clone(),
                expected: target.unique_id_paths.len(),
                found: reference.paths.len(),
            });
        }
        let mut flattener = Flattener::default();
        flattener.walk_entity(entity);
        for path in &reference.paths {
            let index = flattener.append(path);
            flattener.indices.reference_ids.extend(index);
        }
        Ok(flattener.finish())
    }

    pub fn hops(&self) -> &[Arc<ColumnPath>] {
        &self.hops
    }

    pub fn indices(&self) -> &RoleIndices {
        &self.indices
    }

    pub fn hop(&self, index: usize) -> Option<&Arc<ColumnPath>> {
        self.hops.get(index)
    }
}

#[derive(Default)]
struct Flattener {
    hops: Vec<Arc<ColumnPath>>,
    indices: RoleIndices,
}

impl Flattener {
    fn walk_entity(&mut self, entity: &EntityMapping) {
        self.indices.key = self.append(&entity.base_path);
        for path in &entity.unique_id_paths {
            let index = self.append(path);
            self.indices.unique_ids.extend(index);
        }
        self.indices.start = self.append_opt(entity.start_time_path.as_ref());
        self.indices.finish = self.append_opt(entity.finish_time_path.as_ref());
        self.indices.value = self.append_opt(entity.value_path.as_ref());
        for property in &entity.properties {
            let index = self.append(&property.path);
            self.indices.properties.extend(index);
        }
        for path in &entity.constraint_paths {
            let index = self.append(path);
            self.indices.constraints.extend(index);
        }
        self.indices.code = self.append_opt(entity.code_path.as_ref());
    }

    /// Appends every hop of `path`; returns the position of its column hop.
    fn append(&mut self, path: &Arc<ColumnPath>) -> Option<usize> {
        let offset = self.hops.len();
        self.hops.extend(path.flatten());
        path.column_hop().map(|hop| offset + hop)
    }

    fn append_opt(&mut self, path: Option<&Arc<ColumnPath>>) -> Option<usize> {
        path.and_then(|p| self.append(p))
    }

    fn finish(self) -> FlattenedPaths {
        FlattenedPaths {
            hops: self.hops,
            indices: self.indices,
        }
    }
}
