//! relmap - relational mapping layer for clinical temporal propositions
//!
//! This crate reads propositions (events, primitive parameters, constants)
//! out of relational databases through:
//! - Declarative entity mappings loaded from YAML
//! - SQL generation with table aliasing and self-join collapsing
//! - Vendor dialects (MySQL, Oracle, ClickHouse)
//! - Streaming row decoding and reference linking

pub mod config;
pub mod connection;
pub mod dialect;
pub mod filters;
pub mod mapping_catalog;
pub mod proposition;
pub mod reader;
pub mod sql_generator;
pub mod values;

pub use config::ReaderConfig;
pub use mapping_catalog::MappingCatalog;
pub use proposition::{Proposition, PropositionKind, UniqueId};
pub use reader::{PropositionReader, ReadError};
