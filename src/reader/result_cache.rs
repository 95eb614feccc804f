//! Dual-indexed store for one read.
//!
//! Propositions live in per-key sequences. `locations` finds any of them
//! by identity in O(1); propositions stored by identity before their key is
//! known wait in `unlocated` until a keyed put claims them. Reference edges
//! are buffered and applied in batches. Identities whose rows were skipped
//! during decoding are remembered so their edges can be told apart from
//! edges read out of order.

use std::collections::{HashMap, HashSet};

use super::errors::CacheError;
use crate::proposition::{Proposition, UniqueId};

#[derive(Debug, Clone)]
struct PendingReference {
    source: UniqueId,
    name: String,
    target: UniqueId,
}

#[derive(Debug, Default)]
pub struct ResultCache {
    by_key: HashMap<String, Vec<Proposition>>,
    locations: HashMap<UniqueId, (String, usize)>,
    unlocated: HashMap<UniqueId, Proposition>,
    pending: Vec<PendingReference>,
    skipped: HashSet<UniqueId>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `propositions` under `key`.
    ///
    /// A proposition whose identity is already located overwrites that slot;
    /// references gathered by either copy are kept.
    pub fn put_all(&mut self, key: &str, propositions: Vec<Proposition>) {
        for mut proposition in propositions {
            let uid = proposition.unique_id().clone();
            if let Some(earlier) = self.unlocated.remove(&uid) {
                proposition.merge_references(&earlier);
            }
            if let Some(slot) = self.slot_mut(&uid) {
                proposition.merge_references(slot);
                *slot = proposition;
                continue;
            }
            let sequence = self.by_key.entry(key.to_string()).or_default();
            sequence.push(proposition);
            self.locations
                .insert(uid, (key.to_string(), sequence.len() - 1));
        }
    }

    /// Upserts by identity, writing through to the keyed sequence when the
    /// proposition is already located there.
    pub fn put(&mut self, uid: UniqueId, mut proposition: Proposition) {
        if let Some(slot) = self.slot_mut(&uid) {
            proposition.merge_references(slot);
            *slot = proposition;
            return;
        }
        if let Some(earlier) = self.unlocated.get(&uid) {
            proposition.merge_references(earlier);
        }
        self.unlocated.insert(uid, proposition);
    }

    pub fn get(&self, uid: &UniqueId) -> Option<&Proposition> {
        match self.locations.get(uid) {
            Some((key, index)) => self.by_key.get(key).and_then(|seq| seq.get(*index)),
            None => self.unlocated.get(uid),
        }
    }

    pub fn get_by_key(&self, key: &str) -> &[Proposition] {
        self.by_key.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.locations.len() + self.unlocated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records an identity whose row was read but not decoded.
    pub fn mark_skipped(&mut self, uid: UniqueId) {
        self.skipped.insert(uid);
    }

    /// True when `uid` was only ever seen on skipped rows.
    pub fn was_skipped(&self, uid: &UniqueId) -> bool {
        self.skipped.contains(uid) && self.get(uid).is_none()
    }

    pub fn add_reference(&mut self, source: UniqueId, name: &str, target: UniqueId) {
        self.pending.push(PendingReference {
            source,
            name: name.to_string(),
            target,
        });
    }

    pub fn pending_references(&self) -> usize {
        self.pending.len()
    }

    /// Applies buffered edges to their sources. A source that was never
    /// stored is an ordering error; the remaining edges are discarded.
    pub fn flush_references(&mut self) -> Result<usize, CacheError> {
        let pending = std::mem::take(&mut self.pending);
        let count = pending.len();
        for edge in pending {
            let source = match self.locations.get(&edge.source) {
                Some((key, index)) => self
                    .by_key
                    .get_mut(key)
                    .and_then(|seq| seq.get_mut(*index)),
                None => self.unlocated.get_mut(&edge.source),
            };
            match source {
                Some(proposition) => proposition.add_reference(&edge.name, edge.target),
                None => {
                    return Err(CacheError::MissingReferenceSource {
                        source_id: edge.source,
                        reference: edge.name,
                    })
                }
            }
        }
        Ok(count)
    }

    /// Final pass: applies remaining edges and hands back the keyed sequences.
    pub fn flush_references_full(mut self) -> Result<HashMap<String, Vec<Proposition>>, CacheError> {
        self.flush_references()?;
        if !self.unlocated.is_empty() {
            log::debug!(
                "{} propositions stored by identity were never claimed by a key",
                self.unlocated.len()
            );
        }
        Ok(self.by_key)
    }

    fn slot_mut(&mut self, uid: &UniqueId) -> Option<&mut Proposition> {
        let (key, index) = self.locations.get(uid)?;
        self.by_key.get_mut(key)?.get_mut(*index)
    }
}
