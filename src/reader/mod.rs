//! Query orchestration: compile, execute, decode, link.
//!
//! One [`PropositionReader`] call reads every entity producing the
//! requested ids. For each entity the primary statement runs first, then
//! one narrower statement per declared reference; all of them feed a single
//! [`ResultCache`] that is drained into the key-id map at the end.

pub mod errors;
pub mod result_cache;
pub mod row_decoder;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

pub use errors::{CacheError, ReadError};
pub use result_cache::ResultCache;
pub use row_decoder::{DecodeStats, PrimaryDecoder, ReferenceDecoder, RowDecoder};

use crate::config::ReaderConfig;
use crate::connection::Connection;
use crate::dialect::{SqlDialect, VerifiedDialect};
use crate::filters::{Filter, SortDirection};
use crate::mapping_catalog::{EntityMapping, MappingCatalog};
use crate::proposition::{Proposition, PropositionKind};
use crate::sql_generator::{QueryBuilder, QueryRequest, SqlGenerationError};

/// Decoded propositions grouped by owning key id.
pub type PropositionsByKey = HashMap<String, Vec<Proposition>>;

pub struct PropositionReader<C: Connection> {
    catalog: Arc<MappingCatalog>,
    dialect: VerifiedDialect,
    connection: C,
    config: ReaderConfig,
}

impl<C: Connection> PropositionReader<C> {
    pub fn new(
        catalog: Arc<MappingCatalog>,
        dialect: VerifiedDialect,
        connection: C,
        config: ReaderConfig,
    ) -> Self {
        PropositionReader {
            catalog,
            dialect,
            connection,
            config,
        }
    }

    /// Reads the connection's metadata and settles on the first candidate
    /// dialect compatible with it.
    pub fn connect(
        catalog: Arc<MappingCatalog>,
        mut connection: C,
        candidates: impl IntoIterator<Item = Arc<dyn SqlDialect>>,
        config: ReaderConfig,
    ) -> Result<Self, ReadError> {
        let metadata = connection.metadata().map_err(ReadError::Metadata)?;
        let dialect = VerifiedDialect::first_compatible(candidates, &metadata).ok_or_else(|| {
            ReadError::IncompatibleDialect {
                product: metadata.product_name.clone(),
                version: metadata.product_major_version,
            }
        })?;
        log::info!(
            "Using {} dialect for {} {}",
            dialect.dialect().name(),
            metadata.product_name,
            metadata.product_major_version
        );
        Ok(Self::new(catalog, dialect, connection, config))
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn read_constants(
        &mut self,
        key_ids: &[String],
        proposition_ids: &BTreeSet<String>,
        filters: &[Filter],
    ) -> Result<PropositionsByKey, ReadError> {
        self.read(PropositionKind::Constant, key_ids, proposition_ids, filters, None)
    }

    pub fn read_primitive_parameters(
        &mut self,
        key_ids: &[String],
        proposition_ids: &BTreeSet<String>,
        filters: &[Filter],
        order: Option<SortDirection>,
    ) -> Result<PropositionsByKey, ReadError> {
        self.read(
            PropositionKind::PrimitiveParameter,
            key_ids,
            proposition_ids,
            filters,
            order,
        )
    }

    pub fn read_events(
        &mut self,
        key_ids: &[String],
        proposition_ids: &BTreeSet<String>,
        filters: &[Filter],
        order: Option<SortDirection>,
    ) -> Result<PropositionsByKey, ReadError> {
        self.read(PropositionKind::Event, key_ids, proposition_ids, filters, order)
    }

    /// Stops at the first entity that fails; propositions read for earlier
    /// entities are discarded with the cache.
    pub fn read(
        &mut self,
        kind: PropositionKind,
        key_ids: &[String],
        proposition_ids: &BTreeSet<String>,
        filters: &[Filter],
        order: Option<SortDirection>,
    ) -> Result<PropositionsByKey, ReadError> {
        let catalog = Arc::clone(&self.catalog);
        let config = &self.config;
        let connection = &mut self.connection;
        let builder = QueryBuilder::new(self.dialect.dialect(), &catalog);
        let mut cache = ResultCache::new();

        let groups = catalog.group_by_entity(kind, proposition_ids);
        if groups.is_empty() {
            log::debug!("No {} entity produces {:?}", kind, proposition_ids);
        }
        for (entity, ids) in groups {
            let scoped = scope_filters(&catalog, &entity, filters);
            let request = QueryRequest {
                entity: &entity,
                proposition_ids: &ids,
                key_ids,
                filters: &scoped,
                order,
                row_limit: config.row_limit,
            };

            let query = builder
                .build_primary(&request)
                .map_err(|source| compilation_error(&entity, source))?;
            let mut decoder = RowDecoder::Primary(PrimaryDecoder::new(
                &entity,
                &query.layout,
                &ids,
                config.primary_flush_rows,
            ));
            run(connection, config, &entity, &query.sql, &mut decoder, &mut cache)?;

            if config.row_limit.is_some() {
                if !entity.references.is_empty() {
                    log::info!(
                        "{}: row limit set, references are not linked",
                        entity.name
                    );
                }
                continue;
            }
            let reference_request = QueryRequest {
                order: None,
                row_limit: None,
                ..request
            };
            for reference in &entity.references {
                let query = builder
                    .build_reference(&reference_request, &reference.name)
                    .map_err(|source| compilation_error(&entity, source))?;
                let mut decoder = RowDecoder::Reference(ReferenceDecoder::new(
                    &entity,
                    &query.layout,
                    &reference.name,
                    &reference.entity,
                    config.reference_flush_rows,
                ));
                run(connection, config, &entity, &query.sql, &mut decoder, &mut cache)?;
            }
        }

        cache.flush_references_full().map_err(|source| {
            let CacheError::MissingReferenceSource {
                source_id,
                reference,
            } = &source;
            ReadError::ReferenceOrdering {
                entity: source_id.entity().to_string(),
                reference: reference.clone(),
                source,
            }
        })
    }
}

fn compilation_error(entity: &EntityMapping, source: SqlGenerationError) -> ReadError {
    log::error!("Cannot compile query for {}: {}", entity.name, source);
    ReadError::Compilation {
        entity: entity.name.clone(),
        source,
    }
}

fn run<C: Connection>(
    connection: &mut C,
    config: &ReaderConfig,
    entity: &EntityMapping,
    sql: &str,
    decoder: &mut RowDecoder<'_>,
    cache: &mut ResultCache,
) -> Result<(), ReadError> {
    log::debug!("Query for {}: {}", entity.name, sql);
    if config.skip_execution {
        log::info!("Execution skipped for {}: {}", entity.name, sql);
        return Ok(());
    }
    let mut cursor = connection.execute(sql).map_err(|source| {
        log::error!("Query for {} failed: {}. SQL: {}", entity.name, source, sql);
        ReadError::Execution {
            entity: entity.name.clone(),
            source,
        }
    })?;
    decoder.read(cursor.as_mut(), cache)?;
    Ok(())
}

/// Filters touching `entity`, the entities connected to it by a reference,
/// or any entity referencing one of those.
pub fn scope_filters(catalog: &MappingCatalog, entity: &EntityMapping, filters: &[Filter]) -> Vec<Filter> {
    let mut scope = catalog.connected_entities(entity);
    let referrers: Vec<_> = scope
        .iter()
        .flat_map(|e| catalog.inbound_referrers(e))
        .collect();
    scope.extend(referrers);

    let scoped: Vec<Filter> = filters
        .iter()
        .filter(|f| scope.iter().any(|e| f.applies_to(e.proposition_ids.iter())))
        .cloned()
        .collect();
    if scoped.len() < filters.len() {
        log::debug!(
            "{}: {} of {} filters out of scope",
            entity.name,
            filters.len() - scoped.len(),
            filters.len()
        );
    }
    scoped
}
