#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Route segment information lookup.
//!
//! A single `GET` against the remote route information service, keyed by
//! a route's unique id and a milepoint range. The response lists one
//! record per segment plus an optional data-license link; the dashboard
//! shows a summary of the first record and every bridge on the range.

use std::fmt::Write as _;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Fields requested when the configuration does not name any.
pub const DEFAULT_RETURN_KEYS: &[&str] = &[
    "Route_Label",
    "Road_Name",
    "County_Name",
    "District_Number",
    "Functional_Class",
    "Begin_MP",
    "End_MP",
    "AADT",
    "Bridge_ID",
];

/// Field holding the bridge identifier(s) of a segment.
pub const BRIDGE_FIELD: &str = "Bridge_ID";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur during a route lookup.
#[derive(Debug, Error)]
pub enum RouteLookupError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("Route service returned status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The response body was not the expected JSON.
    #[error("Failed to parse route service response: {message}")]
    Parse {
        /// Description of what went wrong.
        message: String,
    },

    /// The service returned no segment records.
    #[error("No route records returned")]
    NoRecords,

    /// The milepoint range is inverted or not finite.
    #[error("Invalid milepoint range {begin_mp}-{end_mp}")]
    InvalidRange {
        /// Requested beginning milepoint.
        begin_mp: f64,
        /// Requested ending milepoint.
        end_mp: f64,
    },

    /// The configured base URL is not a valid URL.
    #[error("Invalid route service URL '{url}': {message}")]
    InvalidUrl {
        /// The configured URL.
        url: String,
        /// Parser message.
        message: String,
    },
}

/// Identifies a route segment by unique id and milepoint range.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSegmentQuery {
    /// Unique route identifier.
    pub unique_id: String,
    /// Beginning milepoint.
    pub begin_mp: f64,
    /// Ending milepoint.
    pub end_mp: f64,
}

impl RouteSegmentQuery {
    /// Checks the milepoint range.
    ///
    /// # Errors
    ///
    /// Returns [`RouteLookupError::InvalidRange`] if either bound is not
    /// finite or `begin_mp` exceeds `end_mp`.
    pub fn validate(&self) -> Result<(), RouteLookupError> {
        if !self.begin_mp.is_finite() || !self.end_mp.is_finite() || self.begin_mp > self.end_mp
        {
            return Err(RouteLookupError::InvalidRange {
                begin_mp: self.begin_mp,
                end_mp: self.end_mp,
            });
        }
        Ok(())
    }
}

/// Parsed route service response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RouteInfo {
    /// One record per returned segment.
    #[serde(default, alias = "Route_Info", alias = "routeInfo")]
    pub records: Vec<Map<String, Value>>,
    /// Data license link, when the service includes one.
    #[serde(default, alias = "License")]
    pub license: Option<String>,
}

impl RouteInfo {
    /// Bridge identifiers across every record, deduplicated in first-seen
    /// order. A record may carry several ids separated by commas.
    #[must_use]
    pub fn bridge_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for record in &self.records {
            let Some(value) = record.get(BRIDGE_FIELD).and_then(render_value) else {
                continue;
            };
            for id in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                if !ids.iter().any(|existing| existing == id) {
                    ids.push(id.to_string());
                }
            }
        }
        ids
    }

    /// Formats the first record's `fields`, the bridge list and the
    /// license link as plain text for display, copy, or print.
    ///
    /// # Errors
    ///
    /// Returns [`RouteLookupError::NoRecords`] if there are no records.
    pub fn summary(&self, fields: &[String]) -> Result<String, RouteLookupError> {
        let first = self.records.first().ok_or(RouteLookupError::NoRecords)?;

        let mut out = String::from("Route Information\n");
        for field in fields.iter().filter(|f| f.as_str() != BRIDGE_FIELD) {
            if let Some(value) = first.get(field).and_then(render_value) {
                writeln!(out, "{}: {value}", field.replace('_', " ")).ok();
            }
        }

        let bridges = self.bridge_ids();
        if bridges.is_empty() {
            out.push_str("Bridges: none\n");
        } else {
            writeln!(out, "Bridges: {}", bridges.join(", ")).ok();
        }

        if let Some(license) = self.license.as_deref().filter(|l| !l.is_empty()) {
            writeln!(out, "Data license: {license}").ok();
        }

        Ok(out)
    }
}

fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.trim().to_string()),
        other => Some(other.to_string()),
    }
}

/// Parses a route service response body.
///
/// # Errors
///
/// Returns [`RouteLookupError::Parse`] if the body is not JSON of the
/// expected shape.
pub fn parse_response(body: &str) -> Result<RouteInfo, RouteLookupError> {
    serde_json::from_str(body).map_err(|e| RouteLookupError::Parse {
        message: e.to_string(),
    })
}

/// Client for the route information service.
#[derive(Debug, Clone)]
pub struct RouteLookupClient {
    client: reqwest::Client,
    base_url: String,
    return_keys: Vec<String>,
}

impl RouteLookupClient {
    /// Creates a client for the service at `base_url` requesting
    /// `return_keys` (or [`DEFAULT_RETURN_KEYS`] when empty).
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        return_keys: &[String],
    ) -> Self {
        let return_keys = if return_keys.is_empty() {
            DEFAULT_RETURN_KEYS.iter().map(ToString::to_string).collect()
        } else {
            return_keys.to_vec()
        };
        Self {
            client,
            base_url: base_url.into(),
            return_keys,
        }
    }

    /// The fields requested from the service, in display order.
    #[must_use]
    pub fn return_keys(&self) -> &[String] {
        &self.return_keys
    }

    /// Builds the request URL for a segment.
    ///
    /// # Errors
    ///
    /// Returns [`RouteLookupError::InvalidRange`] for a bad milepoint
    /// range, or [`RouteLookupError::InvalidUrl`] if the base URL does not
    /// parse.
    pub fn request_url(
        &self,
        query: &RouteSegmentQuery,
    ) -> Result<reqwest::Url, RouteLookupError> {
        query.validate()?;

        let begin_mp = query.begin_mp.to_string();
        let end_mp = query.end_mp.to_string();
        let return_keys = self.return_keys.join(",");

        reqwest::Url::parse_with_params(
            &self.base_url,
            &[
                ("rt_unique", query.unique_id.as_str()),
                ("begin_mp", begin_mp.as_str()),
                ("end_mp", end_mp.as_str()),
                ("return_keys", return_keys.as_str()),
                ("return_format", "json"),
            ],
        )
        .map_err(|e| RouteLookupError::InvalidUrl {
            url: self.base_url.clone(),
            message: e.to_string(),
        })
    }

    /// Looks up a route segment.
    ///
    /// # Errors
    ///
    /// Returns [`RouteLookupError`] if the query is invalid, the request
    /// fails, the response cannot be parsed, or it contains no records.
    pub async fn lookup(&self, query: &RouteSegmentQuery) -> Result<RouteInfo, RouteLookupError> {
        let url = self.request_url(query)?;
        log::debug!("Route lookup: {url}");

        let resp = self
            .client
            .get(url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(RouteLookupError::Status {
                status: resp.status().as_u16(),
            });
        }
        let body = resp.text().await?;

        let info = parse_response(&body)?;
        if info.records.is_empty() {
            return Err(RouteLookupError::NoRecords);
        }

        log::info!(
            "Route lookup for {} returned {} records",
            query.unique_id,
            info.records.len()
        );
        Ok(info)
    }
}
