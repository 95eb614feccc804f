//! Streaming result decoders.
//!
//! Both shapes share one loop: pull rows until the cursor is exhausted,
//! flush into the cache every `flush_every` rows and once more at the end.
//! A row whose time cannot be parsed is logged and skipped; a row missing
//! an identity column aborts the read. Skipped identities are handed to the
//! cache so reference rows pointing at them are dropped rather than treated
//! as out of order.

use std::collections::{BTreeSet, HashMap};

use super::errors::ReadError;
use super::result_cache::ResultCache;
use crate::connection::{Row, RowCursor};
use crate::mapping_catalog::EntityMapping;
use crate::proposition::{Proposition, PropositionKind, UniqueId};
use crate::sql_generator::{CodeColumn, ResultLayout};
use crate::values::Interval;

/// Value a `CASE` code column yields for rows matching no pattern.
const UNCLASSIFIED_CODE: &str = "OTHER";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    pub rows: usize,
    pub decoded: usize,
    pub skipped: usize,
    pub flushes: usize,
}

pub enum RowDecoder<'a> {
    Primary(PrimaryDecoder<'a>),
    Reference(ReferenceDecoder<'a>),
}

impl RowDecoder<'_> {
    pub fn read(
        &mut self,
        cursor: &mut dyn RowCursor,
        cache: &mut ResultCache,
    ) -> Result<DecodeStats, ReadError> {
        let mut stats = DecodeStats::default();
        let flush_every = self.flush_every().max(1);
        let mut since_flush = 0;
        while let Some(row) = cursor.next_row().map_err(|source| {
            log::error!("Reading rows for {} failed: {}", self.entity().name, source);
            ReadError::Execution {
                entity: self.entity().name.clone(),
                source,
            }
        })? {
            stats.rows += 1;
            if self.decode(row)? {
                stats.decoded += 1;
            } else {
                stats.skipped += 1;
            }
            since_flush += 1;
            if since_flush == flush_every {
                self.flush(cache)?;
                stats.flushes += 1;
                since_flush = 0;
            }
        }
        self.flush(cache)?;
        stats.flushes += 1;
        log::debug!(
            "{}: {} rows, {} decoded, {} skipped",
            self.entity().name,
            stats.rows,
            stats.decoded,
            stats.skipped
        );
        Ok(stats)
    }

    fn entity(&self) -> &EntityMapping {
        match self {
            RowDecoder::Primary(d) => d.entity,
            RowDecoder::Reference(d) => d.entity,
        }
    }

    fn flush_every(&self) -> usize {
        match self {
            RowDecoder::Primary(d) => d.flush_every,
            RowDecoder::Reference(d) => d.flush_every,
        }
    }

    /// `Ok(false)` when the row was skipped.
    fn decode(&mut self, row: Row) -> Result<bool, ReadError> {
        match self {
            RowDecoder::Primary(d) => d.decode(row),
            RowDecoder::Reference(d) => d.decode(row),
        }
    }

    fn flush(&mut self, cache: &mut ResultCache) -> Result<(), ReadError> {
        match self {
            RowDecoder::Primary(d) => {
                d.flush(cache);
                Ok(())
            }
            RowDecoder::Reference(d) => d.flush(cache),
        }
    }
}

fn check_width(entity: &EntityMapping, layout: &ResultLayout, row: &Row) -> Result<(), ReadError> {
    if row.len() < layout.width {
        return Err(ReadError::RowShape {
            entity: entity.name.clone(),
            expected: layout.width,
            found: row.len(),
        });
    }
    Ok(())
}

fn read_identity(
    entity: &EntityMapping,
    row: &mut Row,
    positions: &[usize],
    column_prefix: &str,
) -> Result<Vec<String>, ReadError> {
    positions
        .iter()
        .enumerate()
        .map(|(i, position)| {
            row[*position]
                .take()
                .ok_or_else(|| ReadError::InvalidIdentity {
                    entity: entity.name.clone(),
                    column: format!("{}{}", column_prefix, i),
                })
        })
        .collect()
}

pub struct PrimaryDecoder<'a> {
    entity: &'a EntityMapping,
    layout: &'a ResultLayout,
    codes: HashMap<String, String>,
    flush_every: usize,
    pending: Vec<(String, Proposition)>,
    skipped: Vec<UniqueId>,
}

impl<'a> PrimaryDecoder<'a> {
    /// Codes of the requested ids win when two ids share a stored code.
    pub fn new(
        entity: &'a EntityMapping,
        layout: &'a ResultLayout,
        requested: &BTreeSet<String>,
        flush_every: usize,
    ) -> Self {
        let mut codes = HashMap::new();
        if let Some(path) = &entity.code_path {
            let terminal = path.terminal();
            let (preferred, rest): (Vec<_>, Vec<_>) = terminal
                .codes()
                .iter()
                .partition(|entry| requested.contains(&entry.proposition_id));
            for entry in preferred.into_iter().chain(rest) {
                codes
                    .entry(entry.code.raw())
                    .or_insert_with(|| entry.proposition_id.clone());
            }
        }
        PrimaryDecoder {
            entity,
            layout,
            codes,
            flush_every,
            pending: Vec::new(),
            skipped: Vec::new(),
        }
    }

    fn decode(&mut self, mut row: Row) -> Result<bool, ReadError> {
        let entity = self.entity;
        let layout = self.layout;
        check_width(entity, layout, &row)?;
        let key = row[layout.key]
            .take()
            .ok_or_else(|| ReadError::InvalidIdentity {
                entity: entity.name.clone(),
                column: "keyid".to_string(),
            })?;
        let ids = read_identity(entity, &mut row, &layout.unique_ids, "uniqueid")?;
        let unique_id = UniqueId::new(entity.name.clone(), ids);

        let Some(proposition_id) = self.proposition_id(&row) else {
            self.skipped.push(unique_id);
            return Ok(false);
        };
        let mut proposition = Proposition::new(proposition_id, entity.kind, unique_id);

        if entity.kind != PropositionKind::Constant {
            let Some(interval) = self.interval(&row) else {
                self.skipped.push(proposition.unique_id().clone());
                return Ok(false);
            };
            proposition = proposition.with_interval(interval);
        }
        if let (Some(position), Some(value_type)) = (layout.value, entity.value_type) {
            proposition =
                proposition.with_value(row[position].as_deref().and_then(|raw| value_type.parse(raw)));
        }
        for (property, position) in entity.properties.iter().zip(&layout.properties) {
            let value = row[*position]
                .as_deref()
                .and_then(|raw| property.value_type.parse(raw));
            proposition = proposition.with_property(property.name.clone(), value);
        }

        self.pending.push((key, proposition));
        Ok(true)
    }

    fn proposition_id(&self, row: &Row) -> Option<String> {
        let entity = self.entity;
        match self.layout.code {
            None => entity.proposition_ids.first().cloned(),
            Some(CodeColumn::Classified(position)) => match row[position].as_deref() {
                Some(UNCLASSIFIED_CODE) | None => None,
                Some(id) => Some(id.to_string()),
            },
            Some(CodeColumn::Stored(position)) => {
                let Some(raw) = row[position].as_deref() else {
                    log::warn!("{}: row with NULL code skipped", entity.name);
                    return None;
                };
                if self.codes.is_empty() {
                    return Some(raw.to_string());
                }
                let id = self.codes.get(raw).cloned();
                if id.is_none() {
                    log::debug!("{}: code '{}' is not mapped; row skipped", entity.name, raw);
                }
                id
            }
        }
    }

    fn interval(&self, row: &Row) -> Option<Interval> {
        let entity = self.entity;
        let start = self.position(row, self.layout.start, "start time")?;
        match entity.kind {
            PropositionKind::Event => {
                let finish = match self.layout.finish {
                    Some(position) if row[position].is_some() => {
                        self.position(row, Some(position), "finish time")?
                    }
                    _ => start,
                };
                Some(Interval::span(start, finish, entity.granularity))
            }
            _ => Some(Interval::point(start, entity.granularity)),
        }
    }

    fn position(&self, row: &Row, position: Option<usize>, role: &str) -> Option<i64> {
        let entity = self.entity;
        let raw = position.and_then(|p| row[p].as_deref());
        let Some(raw) = raw else {
            log::warn!("{}: NULL {}; row skipped", entity.name, role);
            return None;
        };
        match entity.position_parser.parse(raw) {
            Ok(position) => Some(position),
            Err(e) => {
                log::warn!("{}: bad {} ({}); row skipped", entity.name, role, e);
                None
            }
        }
    }

    fn flush(&mut self, cache: &mut ResultCache) {
        for uid in self.skipped.drain(..) {
            cache.mark_skipped(uid);
        }
        let mut batches: Vec<(String, Vec<Proposition>)> = Vec::new();
        for (key, proposition) in self.pending.drain(..) {
            match batches.last_mut() {
                Some((last, props)) if *last == key => props.push(proposition),
                _ => batches.push((key, vec![proposition])),
            }
        }
        for (key, propositions) in batches {
            cache.put_all(&key, propositions);
        }
    }
}

pub struct ReferenceDecoder<'a> {
    entity: &'a EntityMapping,
    layout: &'a ResultLayout,
    reference: &'a str,
    target: &'a str,
    flush_every: usize,
    pending: Vec<(UniqueId, UniqueId)>,
}

impl<'a> ReferenceDecoder<'a> {
    pub fn new(
        entity: &'a EntityMapping,
        layout: &'a ResultLayout,
        reference: &'a str,
        target: &'a str,
        flush_every: usize,
    ) -> Self {
        ReferenceDecoder {
            entity,
            layout,
            reference,
            target,
            flush_every,
            pending: Vec::new(),
        }
    }

    /// Targets come back NULL when an outer join found no referenced row;
    /// such rows carry no edge. A partially NULL target is malformed.
    fn decode(&mut self, mut row: Row) -> Result<bool, ReadError> {
        let entity = self.entity;
        let layout = self.layout;
        check_width(entity, layout, &row)?;
        let ids = read_identity(entity, &mut row, &layout.unique_ids, "uniqueid")?;
        if layout.reference_ids.iter().all(|p| row[*p].is_none()) {
            return Ok(false);
        }
        let target_ids = read_identity(entity, &mut row, &layout.reference_ids, "refuniqueid")?;
        self.pending.push((
            UniqueId::new(entity.name.clone(), ids),
            UniqueId::new(self.target, target_ids),
        ));
        Ok(true)
    }

    fn flush(&mut self, cache: &mut ResultCache) -> Result<(), ReadError> {
        for (source, target) in self.pending.drain(..) {
            if cache.was_skipped(&source) {
                log::debug!(
                    "{}: '{}' edge from skipped {} dropped",
                    self.entity.name,
                    self.reference,
                    source
                );
                continue;
            }
            cache.add_reference(source, self.reference, target);
        }
        cache
            .flush_references()
            .map_err(|source| ReadError::ReferenceOrdering {
                entity: self.entity.name.clone(),
                reference: self.reference.to_string(),
                source,
            })?;
        Ok(())
    }
}
