use std::collections::BTreeSet;

use super::errors::SqlGenerationError;
use super::path_flattener::FlattenedPaths;
use super::reference_index::ReferenceIndexTable;
use crate::dialect::SqlDialect;
use crate::mapping_catalog::{CodeEntry, ColumnPath, EntityMapping};

/// Everything one statement is generated from. Built once per statement
/// and only read by the clause builders.
pub struct GenerationContext<'a> {
    pub entity: &'a EntityMapping,
    pub proposition_ids: &'a BTreeSet<String>,
    pub dialect: &'a dyn SqlDialect,
    pub paths: FlattenedPaths,
    pub aliases: ReferenceIndexTable,
}

impl<'a> GenerationContext<'a> {
    pub fn new(
        entity: &'a EntityMapping,
        proposition_ids: &'a BTreeSet<String>,
        dialect: &'a dyn SqlDialect,
        paths: FlattenedPaths,
    ) -> Self {
        let aliases = ReferenceIndexTable::allocate(paths.hops());
        GenerationContext {
            entity,
            proposition_ids,
            dialect,
            paths,
            aliases,
        }
    }

    /// Alias and column name of the hop at `index`, which `role` claims.
    pub fn column_parts(
        &self,
        index: Option<usize>,
        role: &str,
    ) -> Result<(usize, &str), SqlGenerationError> {
        let missing = || SqlGenerationError::MissingColumn {
            entity: self.entity.name.clone(),
            role: role.to_string(),
        };
        let index = index.ok_or_else(missing)?;
        let hop = self.paths.hop(index).ok_or_else(missing)?;
        let column = hop.column_name().ok_or_else(missing)?;
        let alias = self
            .aliases
            .alias_at(index)
            .ok_or_else(|| SqlGenerationError::MissingAlias {
                table: hop.table().to_string(),
            })?;
        Ok((alias, column))
    }

    /// `aN.COLUMN` for the hop at `index`.
    pub fn column_ref(&self, index: Option<usize>, role: &str) -> Result<String, SqlGenerationError> {
        let (alias, column) = self.column_parts(index, role)?;
        Ok(self.dialect.column_ref(alias, column))
    }

    /// Code-table rows of `path` relevant to the requested ids, falling back
    /// to the whole table when none are requested. Repeated codes are kept
    /// once, first entry wins.
    pub fn applicable_codes<'p>(&self, path: &'p ColumnPath) -> Vec<&'p CodeEntry> {
        let requested: Vec<&CodeEntry> = path
            .codes()
            .iter()
            .filter(|entry| self.proposition_ids.contains(&entry.proposition_id))
            .collect();
        let candidates = if requested.is_empty() {
            path.codes().iter().collect()
        } else {
            requested
        };
        let mut unique: Vec<&CodeEntry> = Vec::with_capacity(candidates.len());
        for entry in candidates {
            if !unique.iter().any(|kept| kept.code == entry.code) {
                unique.push(entry);
            }
        }
        unique
    }
}
