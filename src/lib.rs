//! packmind - review change proposals and publish packages of engineering
//! playbook artefacts (standards, commands, skills) to git repositories.
//!
//! The library is organized by layer:
//! - [`core`]: domain types
//! - [`proposals`]: staleness, conflict detection and the review pool
//! - [`deployments`]: package use cases, publishing and rendering
//! - [`storage`]: `SQLite`, JSON catalog and local git adapters
//! - [`cli`]: the `packmind` command line

pub mod app;
pub mod cli;
pub mod config;
pub mod core;
pub mod deployments;
pub mod error;
pub mod events;
pub mod proposals;
pub mod storage;
pub mod test_utils;

pub use error::{PackmindError, Result};
