//! Dashboard configuration.
//!
//! The defaults live in `dashboard.toml`, baked into the binary with
//! [`include_str!`]. A few environment variables override them:
//!
//! * `HIGHWAY_PLAN_DATA_DIR`: directory holding the asset files
//! * `HIGHWAY_PLAN_ASSET_URL`: base URL to fetch the asset files from;
//!   takes precedence over the directory
//! * `HIGHWAY_PLAN_ROUTE_API_URL`: route-lookup service endpoint

use std::path::PathBuf;

use highway_plan_project_models::DEFAULT_ROW_LIMIT;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default configuration, embedded at compile time.
const DEFAULT_CONFIG: &str = include_str!("../dashboard.toml");

const DEFAULT_DATA_DIR: &str = "data";

/// Overrides the asset directory.
pub const DATA_DIR_ENV: &str = "HIGHWAY_PLAN_DATA_DIR";
/// Overrides the asset base URL.
pub const ASSET_URL_ENV: &str = "HIGHWAY_PLAN_ASSET_URL";
/// Sets the route lookup service endpoint.
pub const ROUTE_API_URL_ENV: &str = "HIGHWAY_PLAN_ROUTE_API_URL";

/// Errors from reading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML document is malformed or missing fields.
    #[error("Invalid dashboard config: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment override has an unusable value.
    #[error("Invalid value for {name}: {message}")]
    Env {
        /// Variable name.
        name: String,
        /// What was wrong with it.
        message: String,
    },

    /// `table.row_limit` is zero or above the maximum.
    #[error("Invalid table.row_limit {limit}: must be between 1 and {max}")]
    RowLimit {
        /// Configured value.
        limit: usize,
        /// Largest accepted value.
        max: usize,
    },
}

/// Top-level dashboard configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Asset file names and location.
    pub assets: AssetConfig,
    /// `GeoJSON` property names.
    #[serde(default)]
    pub layers: LayerProperties,
    /// Table loading.
    #[serde(default)]
    pub table: TableConfig,
    /// Route lookup service.
    #[serde(default)]
    pub route_lookup: RouteLookupConfig,
}

/// Where the static assets come from and what they are called.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Local directory holding the files.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// Base URL the files are served from. Wins over `directory`.
    #[serde(default)]
    pub base_url: Option<String>,
    /// `DuckDB` snapshot file name.
    pub snapshot: String,
    /// Current projects layer file name.
    pub current_projects: String,
    /// Awarded projects layer file name.
    pub awarded_projects: String,
    /// County boundaries file name.
    pub counties: String,
    /// District boundaries file name.
    pub districts: String,
}

/// Resolved asset location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetLocation {
    /// Files read from a local directory.
    Directory(PathBuf),
    /// Files fetched relative to a base URL.
    Url(String),
}

impl AssetConfig {
    /// The location assets are fetched from.
    #[must_use]
    pub fn location(&self) -> AssetLocation {
        match (&self.base_url, &self.directory) {
            (Some(url), _) => AssetLocation::Url(url.clone()),
            (None, Some(dir)) => AssetLocation::Directory(dir.clone()),
            (None, None) => AssetLocation::Directory(PathBuf::from(DEFAULT_DATA_DIR)),
        }
    }
}

/// Feature property names used to group boundaries and style projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerProperties {
    /// County boundary grouping property.
    pub county_key: String,
    /// District boundary grouping property.
    pub district_key: String,
    /// County property on project lines.
    pub project_county: String,
    /// District property on project lines.
    pub project_district: String,
    /// Raw work-type code property on project lines.
    pub project_work_type: String,
}

impl Default for LayerProperties {
    fn default() -> Self {
        Self {
            county_key: "NAME".to_string(),
            district_key: "DISTRICT".to_string(),
            project_county: "COUNTY".to_string(),
            project_district: "DISTRICT".to_string(),
            project_work_type: "TYPE_OF_WORK".to_string(),
        }
    }
}

/// Table loading settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Maximum rows loaded into the table per filter.
    pub row_limit: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            row_limit: DEFAULT_ROW_LIMIT,
        }
    }
}

/// Route lookup service settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteLookupConfig {
    /// Service endpoint. Route lookups are unavailable without one.
    pub base_url: Option<String>,
    /// Fields requested from the service, in summary order.
    pub return_keys: Vec<String>,
}

impl DashboardConfig {
    /// Loads the embedded defaults and applies environment overrides.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::Parse`] if the embedded document is invalid
    /// * [`ConfigError::Env`] if an override is not a valid URL
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_toml_str(DEFAULT_CONFIG)?.with_env_overrides(|name| std::env::var(name).ok())
    }

    /// Parses a configuration document.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::Parse`] if the document is invalid
    /// * [`ConfigError::RowLimit`] if `table.row_limit` is zero or above
    ///   [`DEFAULT_ROW_LIMIT`]
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml)?;
        let limit = config.table.row_limit;
        if limit == 0 || limit > DEFAULT_ROW_LIMIT {
            return Err(ConfigError::RowLimit {
                limit,
                max: DEFAULT_ROW_LIMIT,
            });
        }
        Ok(config)
    }

    /// The embedded defaults, without environment overrides.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::Parse`] if the embedded document is invalid
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::from_toml_str(DEFAULT_CONFIG)
    }

    /// Applies overrides read through `lookup`. Empty values are ignored.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::Env`] if a URL override does not parse
    pub fn with_env_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(dir) = read(DATA_DIR_ENV) {
            self.assets.directory = Some(PathBuf::from(dir));
        }
        if let Some(url) = read(ASSET_URL_ENV) {
            self.assets.base_url = Some(validate_url(ASSET_URL_ENV, url)?);
        }
        if let Some(url) = read(ROUTE_API_URL_ENV) {
            self.route_lookup.base_url = Some(validate_url(ROUTE_API_URL_ENV, url)?);
        }

        Ok(self)
    }
}

fn validate_url(name: &str, url: String) -> Result<String, ConfigError> {
    reqwest::Url::parse(&url).map_err(|e| ConfigError::Env {
        name: name.to_string(),
        message: e.to_string(),
    })?;
    Ok(url)
}
