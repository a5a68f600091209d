#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the highway plan server.
//!
//! These types are serialized to JSON for the REST API. They are kept
//! apart from the dashboard's own types so the API contract can evolve
//! independently.

use highway_plan_project_models::{CountyRef, DistrictRef, FilterKind};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// Error body returned with non-success statuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Human-readable message.
    pub error: String,
}

impl ApiError {
    /// Wraps any displayable error.
    #[must_use]
    pub fn new(error: impl std::fmt::Display) -> Self {
        Self {
            error: error.to_string(),
        }
    }
}

/// Body for `POST /api/filter/county`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountyParams {
    /// County name.
    pub name: String,
}

/// Body for `POST /api/filter/district`. The number is validated by the
/// dashboard, so out-of-range values reach it intact.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictParams {
    /// District number, expected to be 1-12.
    pub district: i64,
}

/// Body for `POST /api/filter/project-type`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectTypeParams {
    /// Standardized category key.
    pub category: String,
}

/// Body for `POST /api/filter/clear`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearParams {
    /// Filter category whose clear control was used.
    pub kind: FilterKind,
}

/// A clicked map point.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointParams {
    /// Longitude in degrees.
    pub lng: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

/// A project-type choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiProjectType {
    /// Category key to filter by.
    pub key: String,
    /// Label to show.
    pub display_name: String,
}

/// Values for the three filter pickers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiFilterOptions {
    /// Counties with their districts.
    pub counties: Vec<CountyRef>,
    /// Districts with their names.
    pub districts: Vec<DistrictRef>,
    /// Project-type categories.
    pub project_types: Vec<ApiProjectType>,
}

/// Route lookup response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRouteInfo {
    /// Formatted summary of the first record, ready to display, copy or
    /// print.
    pub summary: String,
    /// Deduplicated bridge ids across all records.
    pub bridges: Vec<String>,
    /// Data license link.
    pub license: Option<String>,
    /// Raw records as returned by the service.
    pub records: Vec<serde_json::Map<String, serde_json::Value>>,
}
