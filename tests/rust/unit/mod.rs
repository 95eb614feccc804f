//! Unit tests - Tests that don't require a database
//!
//! These exercise the public compilation API with hand-built mappings.

mod alias_allocation_tests;
mod in_list_splitting_tests;
mod mapping_file_tests;
