#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Read-only highway project dataset backed by a `DuckDB` snapshot.
//!
//! The snapshot is loaded once per session and then answers three
//! filter-driven queries: awarded vs current counts, counts by plan year,
//! and the table row set. Each query prefers a pre-aggregated view and
//! falls back to the base tables when the view is missing. Query
//! failures never escape the store; they degrade to empty results.

pub mod canonical;
pub mod queries;
pub mod snapshot;
mod store;

pub use store::{DatasetStore, QuerySource, Queried};

use thiserror::Error;

/// Errors that can occur while loading a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The bytes are not a usable snapshot.
    #[error("Invalid snapshot: {message}")]
    InvalidSnapshot {
        /// What was wrong with it.
        message: String,
    },

    /// Writing the snapshot to local storage failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The database engine rejected the snapshot.
    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),
}
