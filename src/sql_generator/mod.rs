//! Compiles entity mappings into SQL.
//!
//! Pipeline per statement:
//! 1. [`FlattenedPaths`]: one ordered hop list with role positions
//! 2. [`ReferenceIndexTable`]: table aliases over that list
//! 3. clause builders: SELECT / FROM / WHERE / ORDER BY fragments
//! 4. [`SqlDialect::assemble`]: vendor statement template
//!
//! Compilation is pure; nothing here touches a connection.

pub mod errors;
pub mod filter_builder;
pub mod from_builder;
pub mod generation_context;
pub mod path_flattener;
pub mod reference_index;
pub mod select_builder;

use std::collections::BTreeSet;

pub use errors::SqlGenerationError;
pub use generation_context::GenerationContext;
pub use path_flattener::{FlattenedPaths, RoleIndices};
pub use reference_index::ReferenceIndexTable;
pub use select_builder::{CodeColumn, ResultLayout};

use crate::dialect::{ClauseSet, SqlDialect};
use crate::filters::{Filter, SortDirection};
use crate::mapping_catalog::{EntityMapping, MappingCatalog};

/// Which columns a statement reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// Full propositions.
    Primary,
    /// Source identity plus the target identity of one reference.
    Reference,
}

/// What to read from one entity.
#[derive(Debug, Clone, Copy)]
pub struct QueryRequest<'a> {
    pub entity: &'a EntityMapping,
    /// Requested ids this entity produces.
    pub proposition_ids: &'a BTreeSet<String>,
    /// Owning keys to restrict to; empty reads every key.
    pub key_ids: &'a [String],
    pub filters: &'a [Filter],
    pub order: Option<SortDirection>,
    pub row_limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedQuery {
    pub sql: String,
    pub clauses: ClauseSet,
    pub layout: ResultLayout,
}

pub struct QueryBuilder<'a> {
    dialect: &'a dyn SqlDialect,
    catalog: &'a MappingCatalog,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(dialect: &'a dyn SqlDialect, catalog: &'a MappingCatalog) -> Self {
        QueryBuilder { dialect, catalog }
    }

    pub fn build_primary(&self, request: &QueryRequest<'_>) -> Result<GeneratedQuery, SqlGenerationError> {
        let paths = FlattenedPaths::for_entity(request.entity);
        self.build(request, paths, QueryMode::Primary, request.order)
    }

    /// Statement for one of the entity's references. Carries the same
    /// predicates as the primary statement so it covers the same source rows.
    pub fn build_reference(
        &self,
        request: &QueryRequest<'_>,
        reference_name: &str,
    ) -> Result<GeneratedQuery, SqlGenerationError> {
        let entity = request.entity;
        let reference =
            entity
                .reference(reference_name)
                .ok_or_else(|| SqlGenerationError::UnknownReference {
                    entity: entity.name.clone(),
                    reference: reference_name.to_string(),
                })?;
        let paths = FlattenedPaths::for_reference(entity, reference, self.catalog)?;
        self.build(request, paths, QueryMode::Reference, None)
    }

    fn build(
        &self,
        request: &QueryRequest<'_>,
        paths: FlattenedPaths,
        mode: QueryMode,
        order: Option<SortDirection>,
    ) -> Result<GeneratedQuery, SqlGenerationError> {
        let context =
            GenerationContext::new(request.entity, request.proposition_ids, self.dialect, paths);
        let (select_clause, layout) = select_builder::build_select(&context, mode)?;
        let clauses = ClauseSet {
            select_clause,
            from_clause: from_builder::build_from(&context)?,
            where_clause: filter_builder::build_where(&context, request.filters, request.key_ids)?,
            order_clause: filter_builder::build_order(&context, order)?,
        };
        let sql = self.dialect.assemble(&clauses, request.row_limit);
        Ok(GeneratedQuery {
            sql,
            clauses,
            layout,
        })
    }
}
