//! Declarative description of how propositions are stored relationally.
//!
//! - [`ColumnPath`] / [`JoinSpec`]: chains of table hops
//! - [`EntityMapping`]: one proposition shape (key, ids, times, code, properties)
//! - [`ReferenceMapping`]: a 1:N link to another entity
//! - [`MappingCatalog`]: every entity known to a reader, loaded from YAML

pub mod column_path;
pub mod config;
pub mod entity_mapping;
pub mod errors;

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

pub use column_path::{CodeEntry, ColumnPath, ColumnPathBuilder, Constraint, JoinKind, JoinSpec};
pub use config::MappingCatalogConfig;
pub use entity_mapping::{EntityMapping, PropertyMapping, ReferenceMapping};
pub use errors::MappingError;

use crate::proposition::PropositionKind;

#[derive(Debug, Clone, Default)]
pub struct MappingCatalog {
    entities: Vec<Arc<EntityMapping>>,
}

impl MappingCatalog {
    /// Validates every entity and every reference target.
    pub fn new(entities: Vec<EntityMapping>) -> Result<Self, MappingError> {
        let mut names = HashSet::new();
        for entity in &entities {
            entity.validate()?;
            if !names.insert(entity.name.as_str()) {
                return Err(MappingError::DuplicateEntity(entity.name.clone()));
            }
        }
        for entity in &entities {
            for reference in &entity.references {
                if !names.contains(reference.entity.as_str()) {
                    return Err(MappingError::UnknownReferenceTarget {
                        entity: entity.name.clone(),
                        reference: reference.name.clone(),
                        target: reference.entity.clone(),
                    });
                }
            }
        }
        Ok(MappingCatalog {
            entities: entities.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn entities(&self) -> &[Arc<EntityMapping>] {
        &self.entities
    }

    pub fn get(&self, name: &str) -> Option<&Arc<EntityMapping>> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn of_kind(&self, kind: PropositionKind) -> impl Iterator<Item = &Arc<EntityMapping>> {
        self.entities.iter().filter(move |e| e.kind == kind)
    }

    /// Groups the requested ids by the entities of `kind` that produce them.
    ///
    /// Entities producing none of the ids are left out. Order follows the
    /// catalog's declaration order.
    pub fn group_by_entity(
        &self,
        kind: PropositionKind,
        proposition_ids: &BTreeSet<String>,
    ) -> Vec<(Arc<EntityMapping>, BTreeSet<String>)> {
        self.of_kind(kind)
            .filter_map(|entity| {
                let ids = entity.requested_ids(proposition_ids);
                (!ids.is_empty()).then(|| (Arc::clone(entity), ids))
            })
            .collect()
    }

    /// `entity` plus every entity it references or that references it.
    pub fn connected_entities(&self, entity: &EntityMapping) -> Vec<Arc<EntityMapping>> {
        self.entities
            .iter()
            .filter(|other| {
                other.name == entity.name
                    || entity.references.iter().any(|r| r.entity == other.name)
                    || other.references.iter().any(|r| r.entity == entity.name)
            })
            .cloned()
            .collect()
    }

    /// Entities holding a reference whose target is `entity`.
    pub fn inbound_referrers(&self, entity: &EntityMapping) -> Vec<Arc<EntityMapping>> {
        self.entities
            .iter()
            .filter(|other| other.references.iter().any(|r| r.entity == entity.name))
            .cloned()
            .collect()
    }
}
