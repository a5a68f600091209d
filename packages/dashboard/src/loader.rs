//! Asset fetching and the load lifecycle.
//!
//! A load fetches five files (the dataset snapshot and four `GeoJSON`
//! layers), parses all of them, and only then becomes visible to the
//! session. Any failure discards everything fetched so far.

use std::path::PathBuf;

use geojson::Feature;
use highway_plan_dataset::DatasetStore;
use highway_plan_spatial::{SpatialLayerIndex, parse_feature_collection};
use serde::{Deserialize, Serialize};

use crate::LoadError;
use crate::config::{AssetConfig, AssetLocation, LayerProperties};

/// Where the session's load is in its lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "kebab-case")]
pub enum LoadStatus {
    /// Nothing loaded yet.
    #[default]
    Idle,
    /// A load is in flight; the trigger is disabled.
    Loading,
    /// Assets are loaded and queryable.
    Ready,
    /// The last load failed; the trigger is enabled for a retry.
    Failed(String),
}

/// A place asset files can be read from.
#[derive(Debug, Clone)]
pub enum AssetSource {
    /// Files in a local directory.
    Directory(PathBuf),
    /// Files served under a base URL.
    Http {
        client: reqwest::Client,
        base_url: reqwest::Url,
    },
}

impl AssetSource {
    /// Creates a source for a configured location.
    ///
    /// # Errors
    ///
    /// * [`LoadError::InvalidSource`] if the URL does not parse
    pub fn from_location(location: &AssetLocation) -> Result<Self, LoadError> {
        match location {
            AssetLocation::Directory(dir) => Ok(Self::Directory(dir.clone())),
            AssetLocation::Url(url) => {
                let mut base_url =
                    reqwest::Url::parse(url).map_err(|e| LoadError::InvalidSource {
                        message: format!("{url}: {e}"),
                    })?;
                // Url::join replaces the last path segment unless the
                // base ends with a slash.
                if !base_url.path().ends_with('/') {
                    let path = format!("{}/", base_url.path());
                    base_url.set_path(&path);
                }
                Ok(Self::Http {
                    client: reqwest::Client::new(),
                    base_url,
                })
            }
        }
    }

    /// Reads one named asset.
    ///
    /// # Errors
    ///
    /// * [`LoadError::Fetch`] on any I/O, network or HTTP status failure
    pub async fn fetch(&self, name: &str) -> Result<Vec<u8>, LoadError> {
        let fetch_error = |message: String| LoadError::Fetch {
            asset: name.to_string(),
            message,
        };

        match self {
            Self::Directory(dir) => {
                let path = dir.join(name);
                log::debug!("Reading {}", path.display());
                tokio::fs::read(&path)
                    .await
                    .map_err(|e| fetch_error(format!("{}: {e}", path.display())))
            }
            Self::Http { client, base_url } => {
                let url = base_url
                    .join(name)
                    .map_err(|e| fetch_error(e.to_string()))?;
                log::debug!("Fetching {url}");

                let response = client
                    .get(url.clone())
                    .send()
                    .await
                    .map_err(|e| fetch_error(e.to_string()))?;
                if !response.status().is_success() {
                    return Err(fetch_error(format!("{url} returned {}", response.status())));
                }
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| fetch_error(e.to_string()))?;
                Ok(bytes.to_vec())
            }
        }
    }
}

/// Raw bytes of every asset a load needs.
#[derive(Debug, Clone)]
pub struct AssetBundle {
    /// `DuckDB` snapshot file.
    pub snapshot: Vec<u8>,
    /// `GeoJSON` of projects not yet awarded.
    pub current_projects: Vec<u8>,
    /// `GeoJSON` of awarded projects.
    pub awarded_projects: Vec<u8>,
    /// `GeoJSON` county boundaries.
    pub counties: Vec<u8>,
    /// `GeoJSON` district boundaries.
    pub districts: Vec<u8>,
}

impl AssetBundle {
    /// Fetches all five assets concurrently.
    ///
    /// # Errors
    ///
    /// * [`LoadError::Fetch`] for the first asset that fails
    pub async fn fetch(source: &AssetSource, names: &AssetConfig) -> Result<Self, LoadError> {
        let (snapshot, current_projects, awarded_projects, counties, districts) = tokio::try_join!(
            source.fetch(&names.snapshot),
            source.fetch(&names.current_projects),
            source.fetch(&names.awarded_projects),
            source.fetch(&names.counties),
            source.fetch(&names.districts),
        )?;

        log::info!(
            "Fetched assets: snapshot {} bytes, layers {} / {} / {} / {} bytes",
            snapshot.len(),
            current_projects.len(),
            awarded_projects.len(),
            counties.len(),
            districts.len(),
        );

        Ok(Self {
            snapshot,
            current_projects,
            awarded_projects,
            counties,
            districts,
        })
    }
}

/// Parsed assets, ready to be installed in a session.
#[derive(Debug)]
pub struct LoadedAssets {
    /// Queryable project dataset.
    pub store: DatasetStore,
    /// County boundaries keyed by county name.
    pub counties: SpatialLayerIndex,
    /// District boundaries keyed by district number.
    pub districts: SpatialLayerIndex,
    /// Features of the current projects layer.
    pub current_projects: Vec<Feature>,
    /// Features of the awarded projects layer.
    pub awarded_projects: Vec<Feature>,
}

impl LoadedAssets {
    /// Parses a fetched bundle. Nothing is returned unless every asset
    /// parses.
    ///
    /// # Errors
    ///
    /// * [`LoadError::Snapshot`] if the snapshot is unusable
    /// * [`LoadError::Layer`] if a `GeoJSON` layer does not parse
    pub fn parse(bundle: &AssetBundle, properties: &LayerProperties) -> Result<Self, LoadError> {
        let layer = |asset: &str, bytes: &[u8]| {
            parse_feature_collection(bytes).map_err(|source| LoadError::Layer {
                asset: asset.to_string(),
                source,
            })
        };

        let counties = layer("counties", &bundle.counties)?;
        let districts = layer("districts", &bundle.districts)?;
        let current_projects = layer("current projects", &bundle.current_projects)?;
        let awarded_projects = layer("awarded projects", &bundle.awarded_projects)?;
        let store = DatasetStore::load_snapshot(&bundle.snapshot)?;

        Ok(Self {
            store,
            counties: SpatialLayerIndex::build(&counties, &properties.county_key),
            districts: SpatialLayerIndex::build(&districts, &properties.district_key),
            current_projects: current_projects.features,
            awarded_projects: awarded_projects.features,
        })
    }

    /// Logs the size of each parsed asset.
    pub fn log_summary(&self) {
        log::info!(
            "Dashboard ready: {} counties, {} districts, {} current / {} awarded projects",
            self.counties.len(),
            self.districts.len(),
            self.current_projects.len(),
            self.awarded_projects.len(),
        );
    }
}
