//! Materialized propositions and their identities.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::values::{Interval, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropositionKind {
    Constant,
    PrimitiveParameter,
    Event,
}

impl fmt::Display for PropositionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PropositionKind::Constant => "constant",
            PropositionKind::PrimitiveParameter => "primitive parameter",
            PropositionKind::Event => "event",
        };
        write!(f, "{}", name)
    }
}

/// Composite identity of a decoded row: the owning entity plus the raw
/// values of its unique-id columns, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UniqueId {
    entity: String,
    ids: Vec<String>,
}

impl UniqueId {
    pub fn new(entity: impl Into<String>, ids: Vec<String>) -> Self {
        UniqueId {
            entity: entity.into(),
            ids,
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }
}

impl fmt::Display for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}^{}", self.entity, self.ids.join("^"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposition {
    id: String,
    kind: PropositionKind,
    unique_id: UniqueId,
    interval: Option<Interval>,
    value: Option<Value>,
    properties: Vec<(String, Option<Value>)>,
    references: BTreeMap<String, Vec<UniqueId>>,
}

impl Proposition {
    pub fn new(id: impl Into<String>, kind: PropositionKind, unique_id: UniqueId) -> Self {
        Proposition {
            id: id.into(),
            kind,
            unique_id,
            interval: None,
            value: None,
            properties: Vec::new(),
            references: BTreeMap::new(),
        }
    }

    pub fn with_interval(mut self, interval: Interval) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn with_value(mut self, value: Option<Value>) -> Self {
        self.value = value;
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: Option<Value>) -> Self {
        self.properties.push((name.into(), value));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> PropositionKind {
        self.kind
    }

    pub fn unique_id(&self) -> &UniqueId {
        &self.unique_id
    }

    pub fn interval(&self) -> Option<&Interval> {
        self.interval.as_ref()
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_ref())
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|(n, _)| n.as_str())
    }

    pub fn references(&self, name: &str) -> &[UniqueId] {
        self.references.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn reference_names(&self) -> impl Iterator<Item = &str> {
        self.references.keys().map(String::as_str)
    }

    /// Links `target` under `name`; a target already linked is not repeated.
    pub fn add_reference(&mut self, name: &str, target: UniqueId) {
        let targets = self.references.entry(name.to_string()).or_default();
        if !targets.contains(&target) {
            targets.push(target);
        }
    }

    /// Carries over references another copy of this proposition already collected.
    pub fn merge_references(&mut self, other: &Proposition) {
        for (name, targets) in &other.references {
            for target in targets {
                self.add_reference(name, target.clone());
            }
        }
    }
}
