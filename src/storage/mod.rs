//! Storage layer for packmind
//!
//! SQLite holds packages and deployment history, a JSON catalog holds the
//! artefacts and targets, and git2 writes into consumer repositories.

pub mod catalog;
pub mod git;
pub mod migrations;
pub mod sqlite;

pub use catalog::{Catalog, CatalogData};
pub use git::GitArchive;
pub use sqlite::Database;
