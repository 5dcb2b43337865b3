//! Test helpers for reinhardt-fixtures integration tests.
//!
//! - [`mock_database`] records statements instead of talking to a database
//! - [`test_fixtures`] provides small fixtures with declared relations

#![allow(dead_code)]

#[path = "helpers/mock_database.rs"]
pub mod mock_database;

#[path = "helpers/test_fixtures.rs"]
pub mod test_fixtures;
