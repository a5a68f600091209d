#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Highway project record types, the dashboard filter state, and the
//! aggregate results derived from it.
//!
//! These types are shared by the dataset store, the spatial layer index,
//! and the dashboard session. They carry no behavior beyond validation
//! and small derived accessors.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Maximum number of rows the table view is ever handed.
pub const DEFAULT_ROW_LIMIT: usize = 1000;

/// A highway district number, validated to the range 1-12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct District(u8);

impl District {
    /// Lowest valid district number.
    pub const MIN: u8 = 1;
    /// Highest valid district number.
    pub const MAX: u8 = 12;

    /// Creates a district from a raw number.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidDistrictError`] if the value is outside 1-12.
    pub fn new(value: i64) -> Result<Self, InvalidDistrictError> {
        match u8::try_from(value) {
            Ok(n) if (Self::MIN..=Self::MAX).contains(&n) => Ok(Self(n)),
            _ => Err(InvalidDistrictError { value }),
        }
    }

    /// Returns the district number.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Iterates over every valid district.
    pub fn all() -> impl Iterator<Item = Self> {
        (Self::MIN..=Self::MAX).map(Self)
    }
}

impl TryFrom<i64> for District {
    type Error = InvalidDistrictError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<District> for u8 {
    fn from(district: District) -> Self {
        district.0
    }
}

impl std::fmt::Display for District {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when a district number is outside 1-12.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidDistrictError {
    /// The rejected value.
    pub value: i64,
}

impl std::fmt::Display for InvalidDistrictError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid district {}: expected {}-{}",
            self.value,
            District::MIN,
            District::MAX
        )
    }
}

impl std::error::Error for InvalidDistrictError {}

/// The three mutually exclusive filter categories.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum FilterKind {
    /// Filter by county name.
    County,
    /// Filter by district number.
    District,
    /// Filter by standardized project-type category.
    ProjectType,
}

/// The single active dashboard filter.
///
/// At most one filter category is active at a time; selecting one
/// replaces whatever was active before.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum FilterState {
    /// No filter; every project is in scope.
    #[default]
    None,
    /// Projects in the named county.
    County(String),
    /// Projects in the given district.
    District(District),
    /// Projects whose work type maps to the given category key.
    ProjectType(String),
}

impl FilterState {
    /// Returns the category of the active filter, if any.
    #[must_use]
    pub const fn kind(&self) -> Option<FilterKind> {
        match self {
            Self::None => None,
            Self::County(_) => Some(FilterKind::County),
            Self::District(_) => Some(FilterKind::District),
            Self::ProjectType(_) => Some(FilterKind::ProjectType),
        }
    }

    /// Returns `true` when no filter is active.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// The key used to find the matching map feature group, for the
    /// filter kinds that pan the map.
    #[must_use]
    pub fn spatial_key(&self) -> Option<String> {
        match self {
            Self::County(name) => Some(name.clone()),
            Self::District(district) => Some(district.to_string()),
            Self::None | Self::ProjectType(_) => None,
        }
    }
}

/// One row of the highway plan dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    /// Plan item number.
    pub item_no: String,
    /// Highway district (1-12).
    pub district: i32,
    /// County name.
    pub county: String,
    /// Route label (e.g. "KY-4").
    pub route: String,
    /// Plan year the project is scheduled in.
    pub plan_year: i32,
    /// Raw work-type code as stored on the record.
    pub type_of_work: String,
    /// Whether the project has been awarded.
    pub awarded: bool,
    /// Free-text project description.
    pub description: String,
    /// Beginning milepoint.
    pub begin_mp: Option<f64>,
    /// Ending milepoint.
    pub end_mp: Option<f64>,
    /// Estimated cost in dollars.
    pub est_cost: Option<f64>,
}

impl ProjectRecord {
    /// Returns the value of a single table column.
    #[must_use]
    pub fn field_value(&self, field: ProjectField) -> FieldValue {
        match field {
            ProjectField::ItemNo => FieldValue::Text(self.item_no.clone()),
            ProjectField::District => FieldValue::Integer(i64::from(self.district)),
            ProjectField::County => FieldValue::Text(self.county.clone()),
            ProjectField::Route => FieldValue::Text(self.route.clone()),
            ProjectField::PlanYear => FieldValue::Integer(i64::from(self.plan_year)),
            ProjectField::TypeOfWork => FieldValue::Text(self.type_of_work.clone()),
            ProjectField::Awarded => FieldValue::Bool(self.awarded),
            ProjectField::Description => FieldValue::Text(self.description.clone()),
            ProjectField::BeginMp => self.begin_mp.map_or(FieldValue::Null, FieldValue::Number),
            ProjectField::EndMp => self.end_mp.map_or(FieldValue::Null, FieldValue::Number),
            ProjectField::EstCost => self.est_cost.map_or(FieldValue::Null, FieldValue::Number),
        }
    }
}

/// Columns of the project table.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProjectField {
    /// Plan item number.
    ItemNo,
    /// District number.
    District,
    /// County name.
    County,
    /// Route label.
    Route,
    /// Plan year.
    PlanYear,
    /// Raw work-type code.
    TypeOfWork,
    /// Awarded flag.
    Awarded,
    /// Description.
    Description,
    /// Beginning milepoint.
    BeginMp,
    /// Ending milepoint.
    EndMp,
    /// Estimated cost.
    EstCost,
}

impl ProjectField {
    /// Returns all columns in table order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::ItemNo,
            Self::District,
            Self::County,
            Self::Route,
            Self::PlanYear,
            Self::TypeOfWork,
            Self::Awarded,
            Self::Description,
            Self::BeginMp,
            Self::EndMp,
            Self::EstCost,
        ]
    }

    /// Default column header.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::ItemNo => "Item No",
            Self::District => "District",
            Self::County => "County",
            Self::Route => "Route",
            Self::PlanYear => "Year",
            Self::TypeOfWork => "Type of Work",
            Self::Awarded => "Awarded",
            Self::Description => "Description",
            Self::BeginMp => "Begin MP",
            Self::EndMp => "End MP",
            Self::EstCost => "Estimated Cost",
        }
    }
}

/// A single cell value in the project table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Missing value.
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Whole number.
    Integer(i64),
    /// Floating-point number.
    Number(f64),
    /// Text.
    Text(String),
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{}", if *b { "Yes" } else { "No" }),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// A visible table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableColumn {
    /// Record field shown in this column.
    pub field: ProjectField,
    /// Header text.
    pub title: String,
}

impl TableColumn {
    /// The default column set, every field with its default header.
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        ProjectField::all()
            .iter()
            .map(|field| Self {
                field: *field,
                title: field.title().to_string(),
            })
            .collect()
    }
}

/// Maps a raw work-type code to a standardized category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrosswalkEntry {
    /// Work-type code as stored on project records.
    pub raw_code: String,
    /// Standardized category key.
    pub category: String,
    /// Human-readable category name.
    pub display_name: String,
}

/// A county and the district it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountyRef {
    /// County name.
    pub county: String,
    /// District number.
    pub district: i32,
}

/// A district and its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictRef {
    /// District number.
    pub district: i32,
    /// District office name.
    pub district_name: String,
}

/// Awarded versus current project counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardStatusCounts {
    /// Projects already awarded.
    pub awarded: u64,
    /// Projects not yet awarded.
    pub current: u64,
}

impl AwardStatusCounts {
    /// Total project count.
    #[must_use]
    pub const fn total(self) -> u64 {
        self.awarded + self.current
    }
}

/// Project count for a single plan year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearCount {
    /// Plan year.
    pub year: i32,
    /// Number of projects.
    pub count: u64,
}

/// Everything the views need for one filter state.
///
/// Always recomputed from the dataset; never carried over between
/// filter changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    /// Awarded vs current counts.
    pub award_status: AwardStatusCounts,
    /// Project counts by plan year, ascending.
    pub year_counts: Vec<YearCount>,
    /// Table rows, at most [`DEFAULT_ROW_LIMIT`].
    pub rows: Vec<ProjectRecord>,
}

impl AggregateResult {
    /// Returns `true` if nothing matched the filter.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.award_status.total() == 0 && self.year_counts.is_empty() && self.rows.is_empty()
    }
}

/// A geographic bounding box in WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western longitude boundary.
    pub west: f64,
    /// Southern latitude boundary.
    pub south: f64,
    /// Eastern longitude boundary.
    pub east: f64,
    /// Northern latitude boundary.
    pub north: f64,
}

impl BoundingBox {
    /// Creates a new bounding box from the given coordinates.
    #[must_use]
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Smallest box covering both `self` and `other`.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            west: self.west.min(other.west),
            south: self.south.min(other.south),
            east: self.east.max(other.east),
            north: self.north.max(other.north),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn district_range() {
        assert!(District::new(0).is_err());
        assert!(District::new(13).is_err());
        assert!(District::new(-1).is_err());
        assert_eq!(District::new(1).unwrap().value(), 1);
        assert_eq!(District::new(12).unwrap().value(), 12);
        assert_eq!(District::all().count(), 12);
    }

    #[test]
    fn district_error_message() {
        let err = District::new(13).unwrap_err();
        assert_eq!(err.to_string(), "invalid district 13: expected 1-12");
    }

    #[test]
    fn district_deserialize_rejects_out_of_range() {
        assert!(serde_json::from_str::<District>("7").is_ok());
        assert!(serde_json::from_str::<District>("0").is_err());
    }

    #[test]
    fn filter_kind_parse() {
        assert_eq!("county".parse::<FilterKind>().unwrap(), FilterKind::County);
        assert_eq!(
            "project-type".parse::<FilterKind>().unwrap(),
            FilterKind::ProjectType
        );
        assert_eq!(FilterKind::District.to_string(), "district");
    }

    #[test]
    fn filter_state_spatial_key() {
        let district = FilterState::District(District::new(7).unwrap());
        assert_eq!(district.spatial_key().as_deref(), Some("7"));
        assert_eq!(
            FilterState::County("Fayette".to_string())
                .spatial_key()
                .as_deref(),
            Some("Fayette")
        );
        assert_eq!(
            FilterState::ProjectType("BRIDGE".to_string()).spatial_key(),
            None
        );
        assert_eq!(FilterState::None.kind(), None);
    }

    #[test]
    fn filter_state_json_shape() {
        let json = serde_json::to_value(FilterState::District(District::new(5).unwrap())).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "district", "value": 5 }));
    }

    #[test]
    fn bbox_union() {
        let a = BoundingBox::new(-85.0, 37.0, -84.0, 38.0);
        let b = BoundingBox::new(-84.5, 36.5, -83.0, 37.5);
        assert_eq!(a.union(b), BoundingBox::new(-85.0, 36.5, -83.0, 38.0));
    }

    #[test]
    fn default_columns_cover_every_field() {
        let columns = TableColumn::defaults();
        assert_eq!(columns.len(), ProjectField::all().len());
        assert_eq!(columns[4].title, "Year");
    }
}
