//! Integration tests - mapping file to SQL to decoded propositions
//!
//! These load the YAML fixture and drive the reader end to end against the
//! in-memory connection, so they run without a database.

mod query_generation_tests;
mod reader_tests;
