#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Keyed feature groups for the dashboard's map layers.
//!
//! Groups the features of a `GeoJSON` layer (counties, districts, project
//! lines) by one property, computes a bounding box per group for
//! zoom-to, and resolves filter keys to groups. Boundary files and the
//! relational dataset do not spell names identically, so lookups fall
//! through exact, case-variant, and substring tiers before giving up.
//! Polygon groups are also indexed in an R-tree for point lookups.

use std::collections::BTreeMap;

use geo::{BoundingRect, Contains, MultiPolygon};
use geojson::{Feature, FeatureCollection, GeoJson, JsonValue};
use highway_plan_project_models::BoundingBox;
use rstar::{AABB, RTree, RTreeObject};
use thiserror::Error;

/// Errors from building or querying a layer index.
#[derive(Debug, Error)]
pub enum SpatialError {
    /// No group matched the key, even after case and substring fallbacks.
    #[error("No feature group matches '{key}'")]
    KeyNotFound {
        /// The key that was looked up.
        key: String,
    },

    /// The layer file could not be parsed.
    #[error("Invalid GeoJSON: {message}")]
    Parse {
        /// Description of what went wrong.
        message: String,
    },
}

/// Features sharing one value of the grouping property.
#[derive(Debug, Clone)]
pub struct FeatureGroup {
    key: String,
    features: Vec<Feature>,
    bounds: Option<BoundingBox>,
}

impl FeatureGroup {
    /// The grouping value.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Member features in file order.
    #[must_use]
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Bounding box of every member geometry. `None` when no member has
    /// a geometry.
    #[must_use]
    pub const fn bounds(&self) -> Option<BoundingBox> {
        self.bounds
    }
}

/// A group polygon stored in the R-tree.
struct PolygonEntry {
    key: String,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for PolygonEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Feature groups of one layer, keyed by a property value.
pub struct SpatialLayerIndex {
    attribute: String,
    groups: BTreeMap<String, FeatureGroup>,
    polygons: RTree<PolygonEntry>,
}

impl std::fmt::Debug for SpatialLayerIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialLayerIndex")
            .field("attribute", &self.attribute)
            .field("groups", &self.groups.len())
            .field("polygons", &self.polygons.size())
            .finish()
    }
}

impl SpatialLayerIndex {
    /// Groups the collection's features by the `group_by` property.
    ///
    /// Features without the property are skipped. Keys are stored as
    /// they appear in the file (integral numbers without a decimal point).
    #[must_use]
    pub fn build(collection: &FeatureCollection, group_by: &str) -> Self {
        let mut groups: BTreeMap<String, FeatureGroup> = BTreeMap::new();
        let mut polygons = Vec::new();
        let mut skipped = 0_usize;

        for feature in &collection.features {
            let Some(key) = property_value(feature, group_by) else {
                skipped += 1;
                continue;
            };

            let geometry = feature
                .geometry
                .clone()
                .and_then(|g| geo::Geometry::<f64>::try_from(g).ok());

            let feature_bounds = geometry
                .as_ref()
                .and_then(|g| g.bounding_rect())
                .map(|rect| {
                    BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
                });

            if let Some(polygon) = geometry.and_then(into_multipolygon) {
                polygons.push(PolygonEntry {
                    key: key.clone(),
                    envelope: compute_envelope(&polygon),
                    polygon,
                });
            }

            let group = groups.entry(key.clone()).or_insert_with(|| FeatureGroup {
                key,
                features: Vec::new(),
                bounds: None,
            });
            group.features.push(feature.clone());
            group.bounds = match (group.bounds, feature_bounds) {
                (Some(a), Some(b)) => Some(a.union(b)),
                (a, b) => a.or(b),
            };
        }

        if skipped > 0 {
            log::warn!("{skipped} features had no '{group_by}' property and were skipped");
        }
        log::info!(
            "Indexed {} '{group_by}' groups ({} polygons)",
            groups.len(),
            polygons.len()
        );

        Self {
            attribute: group_by.to_string(),
            groups,
            polygons: RTree::bulk_load(polygons),
        }
    }

    /// Parses a `GeoJSON` document and groups it.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::Parse`] if the bytes are not a `GeoJSON`
    /// feature or feature collection.
    pub fn from_geojson(bytes: &[u8], group_by: &str) -> Result<Self, SpatialError> {
        let collection = parse_feature_collection(bytes)?;
        Ok(Self::build(&collection, group_by))
    }

    /// The property features are grouped by.
    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// All stored keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Number of groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns `true` if the layer has no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Resolves a lookup key to a stored key.
    ///
    /// Tries, in order: the exact key; its upper-, lower-, and title-cased
    /// forms; then case-insensitive substring containment in either
    /// direction, taking the first stored key (in sorted order) that
    /// matches.
    #[must_use]
    pub fn resolve_key(&self, key: &str) -> Option<&str> {
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return None;
        }

        if let Some((stored, _)) = self.groups.get_key_value(trimmed) {
            return Some(stored);
        }

        for variant in [
            trimmed.to_uppercase(),
            trimmed.to_lowercase(),
            title_case(trimmed),
        ] {
            if let Some((stored, _)) = self.groups.get_key_value(variant.as_str()) {
                return Some(stored);
            }
        }

        let needle = trimmed.to_lowercase();
        let found = self.groups.keys().find(|stored| {
            let stored = stored.to_lowercase();
            !stored.is_empty() && (stored.contains(&needle) || needle.contains(&stored))
        });
        if let Some(stored) = found {
            log::debug!("'{key}' matched '{stored}' by substring");
        }
        found.map(String::as_str)
    }

    /// Looks up the group for a key using the tiers of
    /// [`Self::resolve_key`].
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::KeyNotFound`] if no tier matches.
    pub fn group(&self, key: &str) -> Result<&FeatureGroup, SpatialError> {
        self.resolve_key(key)
            .and_then(|stored| self.groups.get(stored))
            .ok_or_else(|| SpatialError::KeyNotFound {
                key: key.to_string(),
            })
    }

    /// Bounding box of the group matching `key`.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::KeyNotFound`] if no group matches or the
    /// matching group has no geometry.
    pub fn bounds_for(&self, key: &str) -> Result<BoundingBox, SpatialError> {
        self.group(key)?
            .bounds()
            .ok_or_else(|| SpatialError::KeyNotFound {
                key: key.to_string(),
            })
    }

    /// Key of the polygon group containing a point. When polygons
    /// overlap, the first hit wins.
    #[must_use]
    pub fn locate(&self, lng: f64, lat: f64) -> Option<&str> {
        let point = geo::Point::new(lng, lat);
        let query_env = AABB::from_point([lng, lat]);

        self.polygons
            .locate_in_envelope_intersecting(&query_env)
            .find(|entry| entry.polygon.contains(&point))
            .map(|entry| entry.key.as_str())
    }
}

/// Reads a feature property by name, ignoring the name's case.
///
/// Strings are returned as-is; integral numbers are rendered without a
/// decimal point so district `7.0` and `7` read the same.
#[must_use]
pub fn property_value(feature: &Feature, name: &str) -> Option<String> {
    let properties = feature.properties.as_ref()?;
    let value = properties.get(name).or_else(|| {
        properties
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    })?;

    match value {
        JsonValue::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        JsonValue::Number(n) => n.as_i64().map(|i| i.to_string()).or_else(|| {
            n.as_f64().map(|f| {
                if f.fract() == 0.0 {
                    format!("{f:.0}")
                } else {
                    f.to_string()
                }
            })
        }),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parses `GeoJSON` bytes into a feature collection. A lone feature
/// becomes a one-element collection.
///
/// # Errors
///
/// Returns [`SpatialError::Parse`] for invalid UTF-8, invalid `GeoJSON`,
/// or a bare geometry.
pub fn parse_feature_collection(bytes: &[u8]) -> Result<FeatureCollection, SpatialError> {
    let text = std::str::from_utf8(bytes).map_err(|e| SpatialError::Parse {
        message: format!("not UTF-8: {e}"),
    })?;
    let geojson: GeoJson = text.parse().map_err(|e| SpatialError::Parse {
        message: format!("{e}"),
    })?;

    match geojson {
        GeoJson::FeatureCollection(fc) => Ok(fc),
        GeoJson::Feature(feature) => Ok(FeatureCollection {
            bbox: None,
            features: vec![feature],
            foreign_members: None,
        }),
        GeoJson::Geometry(_) => Err(SpatialError::Parse {
            message: "expected a Feature or FeatureCollection, found a bare geometry".to_string(),
        }),
    }
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn into_multipolygon(geometry: geo::Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geometry {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    mp.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}
