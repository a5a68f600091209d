#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Highway plan dashboard core.
//!
//! A [`DashboardSession`] holds the single active filter, the loaded
//! dataset and map layers, and the views. Every filter transition runs
//! the same sequence: titles, map pan, aggregation refresh, then the
//! push of fresh results to the charts, table and map styling.

pub mod config;
pub mod dispatcher;
pub mod export;
pub mod filter;
pub mod loader;
pub mod presentation;
mod session;
pub mod titles;
pub mod views;

pub use config::{ConfigError, DashboardConfig};
pub use export::{ExportError, ExportFormat};
pub use loader::{AssetBundle, AssetSource, LoadStatus};
pub use session::DashboardSession;
pub use views::{ChartView, MapView, RecordedViews, TableView, ViewState};

use highway_plan_dataset::SnapshotError;
use highway_plan_project_models::{FilterKind, InvalidDistrictError};
use highway_plan_spatial::SpatialError;
use thiserror::Error;

/// Errors from loading the dashboard's assets.
#[derive(Debug, Error)]
pub enum LoadError {
    /// An asset could not be read or downloaded.
    #[error("Failed to fetch {asset}: {message}")]
    Fetch {
        /// Asset file name.
        asset: String,
        /// What went wrong.
        message: String,
    },

    /// The dataset snapshot is unusable.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// A map layer is not valid `GeoJSON`.
    #[error("Invalid {asset} layer: {source}")]
    Layer {
        /// Which layer.
        asset: String,
        /// Parse failure.
        source: SpatialError,
    },

    /// The configured asset location is not usable.
    #[error("Invalid asset source: {message}")]
    InvalidSource {
        /// What was wrong with it.
        message: String,
    },

    /// Another load is still running.
    #[error("A load is already in progress")]
    InFlight,

    /// A load was completed without being started.
    #[error("No load is in progress")]
    NotStarted,
}

/// Rejected filter input. The filter is never changed when one of these
/// is returned.
#[derive(Debug, Error)]
pub enum FilterError {
    /// District number outside 1-12.
    #[error(transparent)]
    InvalidDistrict(#[from] InvalidDistrictError),

    /// Blank county or project-type value.
    #[error("Empty {kind} value")]
    EmptyValue {
        /// Filter category the value was for.
        kind: FilterKind,
    },

    /// A value that could not be interpreted, such as a non-numeric
    /// district on a boundary feature.
    #[error("Invalid {kind} input '{input}'")]
    InvalidInput {
        /// Filter category the value was for.
        kind: FilterKind,
        /// The rejected value.
        input: String,
    },

    /// A map click that hit no boundary.
    #[error("No {kind} at ({lng}, {lat})")]
    NoFeatureAt {
        /// Layer that was searched.
        kind: FilterKind,
        /// Clicked longitude.
        lng: f64,
        /// Clicked latitude.
        lat: f64,
    },

    /// A map click arrived before the boundary layers were loaded.
    #[error("Map layers are not loaded")]
    NotLoaded,
}
