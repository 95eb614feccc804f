//! Table alias allocation.
//!
//! One left-to-right pass over the flattened hops. A hop takes a fresh
//! alias when it is the target of a join opened by the hop before it;
//! otherwise it reuses the alias of the nearest earlier hop on the same
//! (schema, table), or takes a fresh alias if there is none. A hop that was
//! already placed (same shared path object) keeps its alias. Aliases start
//! at 1.
//!
//! The FROM builder replays the same walk through [`walk`], so placement
//! and aliases cannot drift apart.

use std::collections::HashMap;
use std::sync::Arc;

use super::errors::SqlGenerationError;
use crate::mapping_catalog::ColumnPath;

/// How a hop entered the statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Starts a new table reference.
    Fresh,
    /// Joined from the hop at `from`, whose join spec describes the `ON`.
    Joined { from: usize },
    /// Shares an alias with an earlier hop.
    Reused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkStep {
    pub alias: usize,
    pub placement: Placement,
}

pub fn walk(hops: &[Arc<ColumnPath>]) -> Vec<WalkStep> {
    let mut steps: Vec<WalkStep> = Vec::with_capacity(hops.len());
    let mut placed: HashMap<usize, usize> = HashMap::new();
    let mut last_on_table: HashMap<(Option<&str>, &str), usize> = HashMap::new();
    let mut open_join: Option<usize> = None;
    let mut next_alias = 1;
    let mut allocate = || {
        let alias = next_alias;
        next_alias += 1;
        alias
    };

    for (i, hop) in hops.iter().enumerate() {
        let identity = ColumnPath::identity(hop);
        let step = if let Some(&alias) = placed.get(&identity) {
            WalkStep {
                alias,
                placement: Placement::Reused,
            }
        } else if let Some(from) = open_join {
            WalkStep {
                alias: allocate(),
                placement: Placement::Joined { from },
            }
        } else if let Some(&alias) = last_on_table.get(&(hop.schema(), hop.table())) {
            WalkStep {
                alias,
                placement: Placement::Reused,
            }
        } else {
            WalkStep {
                alias: allocate(),
                placement: Placement::Fresh,
            }
        };
        placed.entry(identity).or_insert(step.alias);
        last_on_table.insert((hop.schema(), hop.table()), step.alias);
        open_join = match hop.join() {
            Some(join) if !placed.contains_key(&ColumnPath::identity(&join.next)) => Some(i),
            _ => None,
        };
        steps.push(step);
    }
    steps
}

/// Alias of every hop in one statement's flattened list.
///
/// Only valid for the exact hop list it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceIndexTable {
    by_position: Vec<usize>,
    by_identity: HashMap<usize, usize>,
}

impl ReferenceIndexTable {
    pub fn allocate(hops: &[Arc<ColumnPath>]) -> Self {
        let steps = walk(hops);
        let mut by_identity = HashMap::with_capacity(hops.len());
        for (hop, step) in hops.iter().zip(&steps) {
            by_identity
                .entry(ColumnPath::identity(hop))
                .or_insert(step.alias);
        }
        ReferenceIndexTable {
            by_position: steps.iter().map(|s| s.alias).collect(),
            by_identity,
        }
    }

    pub fn alias_at(&self, index: usize) -> Option<usize> {
        self.by_position.get(index).copied()
    }

    pub fn alias_of(&self, path: &Arc<ColumnPath>) -> Result<usize, SqlGenerationError> {
        self.by_identity
            .get(&ColumnPath::identity(path))
            .copied()
            .ok_or_else(|| SqlGenerationError::MissingAlias {
                table: path.table().to_string(),
            })
    }

    pub fn aliases(&self) -> &[usize] {
        &self.by_position
    }

    pub fn table_count(&self) -> usize {
        self.by_position.iter().max().copied().unwrap_or(0)
    }
}
