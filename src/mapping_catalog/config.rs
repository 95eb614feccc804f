//! Mapping file loading.
//!
//! Entity mappings are declared in YAML, one list per proposition kind:
//!
//! ```yaml
//! name: clinical
//! schema: CDM                      # default schema for every table
//! events:
//!   - name: Encounter
//!     proposition_ids: [Encounter]
//!     unique: true
//!     base:
//!       table: PATIENT
//!       column: PATIENT_ID
//!       join:
//!         from_key: PATIENT_ID
//!         to_key: PATIENT_ID
//!         next: { table: ENCOUNTER }
//!     unique_ids:
//!       - { table: ENCOUNTER, column: ENCOUNTER_ID }
//!     start_time: { table: ENCOUNTER, column: TS_START }
//!     finish_time: { table: ENCOUNTER, column: TS_END }
//!     granularity: minute
//!     position_parser: timestamp
//! ```
//!
//! Column paths nest hop by hop through `join.next`. A terminal hop may carry
//! `constraint` plus a `codes` table of `{ proposition_id, code }` rows.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use super::column_path::{CodeEntry, ColumnPath, Constraint, JoinKind, JoinSpec};
use super::entity_mapping::{EntityMapping, PropertyMapping, ReferenceMapping};
use super::errors::MappingError;
use super::MappingCatalog;
use crate::proposition::PropositionKind;
use crate::values::{Granularity, PositionParser, ValueType};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingCatalogConfig {
    #[serde(default)]
    pub name: Option<String>,
    /// Schema applied to every hop that does not name its own.
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub constants: Vec<EntityDefinition>,
    #[serde(default)]
    pub primitive_parameters: Vec<EntityDefinition>,
    #[serde(default)]
    pub events: Vec<EntityDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub proposition_ids: Vec<String>,
    #[serde(default)]
    pub unique: bool,
    pub base: ColumnPathDefinition,
    pub unique_ids: Vec<ColumnPathDefinition>,
    #[serde(default)]
    pub start_time: Option<ColumnPathDefinition>,
    #[serde(default)]
    pub finish_time: Option<ColumnPathDefinition>,
    #[serde(default)]
    pub code: Option<ColumnPathDefinition>,
    #[serde(default)]
    pub value: Option<ColumnPathDefinition>,
    #[serde(default)]
    pub value_type: Option<ValueType>,
    #[serde(default)]
    pub properties: Vec<PropertyDefinition>,
    #[serde(default)]
    pub constraints: Vec<ColumnPathDefinition>,
    #[serde(default)]
    pub references: Vec<ReferenceDefinition>,
    #[serde(default)]
    pub granularity: Granularity,
    #[serde(default)]
    pub position_parser: PositionParser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnPathDefinition {
    #[serde(default)]
    pub schema: Option<String>,
    pub table: String,
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub join: Option<Box<JoinDefinition>>,
    #[serde(default)]
    pub constraint: Option<Constraint>,
    #[serde(default)]
    pub codes: Vec<CodeEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinDefinition {
    pub from_key: String,
    pub to_key: String,
    #[serde(default)]
    pub kind: JoinKind,
    pub next: ColumnPathDefinition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub name: String,
    pub value_type: ValueType,
    pub path: ColumnPathDefinition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceDefinition {
    pub name: String,
    pub entity: String,
    pub paths: Vec<ColumnPathDefinition>,
}

impl MappingCatalogConfig {
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, MappingError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|e| MappingError::ConfigReadError {
                error: format!("{}: {}", path.as_ref().display(), e),
            })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, MappingError> {
        serde_yaml::from_str(content).map_err(|e| MappingError::ConfigParseError {
            error: e.to_string(),
        })
    }

    pub fn to_catalog(&self) -> Result<MappingCatalog, MappingError> {
        let groups = [
            (PropositionKind::Constant, &self.constants),
            (PropositionKind::PrimitiveParameter, &self.primitive_parameters),
            (PropositionKind::Event, &self.events),
        ];
        let mut entities = Vec::new();
        for (kind, definitions) in groups {
            for definition in definitions {
                entities.push(definition.to_entity(kind, self.schema.as_deref())?);
            }
        }
        log::info!(
            "Loaded {} entity mappings from catalog '{}'",
            entities.len(),
            self.name.as_deref().unwrap_or("unnamed")
        );
        MappingCatalog::new(entities)
    }
}

impl EntityDefinition {
    fn to_entity(
        &self,
        kind: PropositionKind,
        default_schema: Option<&str>,
    ) -> Result<EntityMapping, MappingError> {
        let build = |def: &ColumnPathDefinition| def.build(default_schema);
        let build_opt = |def: &Option<ColumnPathDefinition>| {
            def.as_ref().map(|d| d.build(default_schema)).transpose()
        };
        let build_all = |defs: &Vec<ColumnPathDefinition>| {
            defs.iter()
                .map(|d| d.build(default_schema))
                .collect::<Result<Vec<_>, _>>()
        };

        let properties = self
            .properties
            .iter()
            .map(|p| {
                Ok(PropertyMapping {
                    name: p.name.clone(),
                    path: build(&p.path)?,
                    value_type: p.value_type,
                })
            })
            .collect::<Result<Vec<_>, MappingError>>()?;
        let references = self
            .references
            .iter()
            .map(|r| {
                Ok(ReferenceMapping {
                    name: r.name.clone(),
                    entity: r.entity.clone(),
                    paths: build_all(&r.paths)?,
                })
            })
            .collect::<Result<Vec<_>, MappingError>>()?;

        Ok(EntityMapping {
            name: self.name.clone(),
            description: self.description.clone(),
            kind,
            proposition_ids: self.proposition_ids.clone(),
            unique: self.unique,
            base_path: build(&self.base)?,
            unique_id_paths: build_all(&self.unique_ids)?,
            start_time_path: build_opt(&self.start_time)?,
            finish_time_path: build_opt(&self.finish_time)?,
            code_path: build_opt(&self.code)?,
            value_path: build_opt(&self.value)?,
            value_type: self.value_type,
            properties,
            constraint_paths: build_all(&self.constraints)?,
            references,
            granularity: self.granularity,
            position_parser: self.position_parser,
        })
    }
}

impl ColumnPathDefinition {
    fn build(&self, default_schema: Option<&str>) -> Result<Arc<ColumnPath>, MappingError> {
        let mut builder = ColumnPath::builder(&self.table);
        if let Some(schema) = self.schema.as_deref().or(default_schema) {
            builder = builder.schema(schema);
        }
        if let Some(column) = &self.column {
            builder = builder.column(column);
        }
        if let Some(join) = &self.join {
            let next = join.next.build(default_schema)?;
            let mut spec = JoinSpec::new(&join.from_key, &join.to_key, next);
            spec.kind = join.kind;
            builder = builder.join(spec);
        }
        if let Some(constraint) = self.constraint {
            builder = builder.constraint(constraint, self.codes.clone());
        }
        builder.build()
    }
}
