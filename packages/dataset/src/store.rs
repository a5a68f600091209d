use std::io::Write as _;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use highway_plan_project_models::{
    AwardStatusCounts, CountyRef, CrosswalkEntry, DistrictRef, FilterState, ProjectRecord,
    YearCount,
};

use crate::SnapshotError;
use crate::canonical::{CanonicalField, CanonicalRow, query_canonical};
use crate::queries::{self, Query, QueryPlan};

/// Offset of the `DUCK` magic bytes in a `DuckDB` database file.
const MAGIC_OFFSET: usize = 8;
const MAGIC: &[u8; 4] = b"DUCK";

const REQUIRED_TABLES: &[&str] = &["projects", "type_crosswalk"];

/// Which form of a query produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuerySource {
    /// The pre-aggregated view answered.
    View,
    /// The view was unavailable; the base tables answered.
    Fallback,
    /// Both forms failed; the value is empty.
    Failed,
}

/// A query result tagged with the path that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Queried<T> {
    /// The result.
    pub value: T,
    /// Which query form answered.
    pub source: QuerySource,
}

/// The loaded, read-only project dataset.
///
/// `duckdb::Connection` is `Send` but not `Sync`, so the connection is
/// wrapped in a `Mutex` and one store can back many sessions.
pub struct DatasetStore {
    conn: Mutex<duckdb::Connection>,
    crosswalk: Vec<CrosswalkEntry>,
    /// Backing file for snapshots loaded from bytes. Declared after
    /// `conn` so the connection closes before the file is removed.
    _file: Option<tempfile::NamedTempFile>,
}

impl std::fmt::Debug for DatasetStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetStore")
            .field("crosswalk", &self.crosswalk.len())
            .finish_non_exhaustive()
    }
}

impl DatasetStore {
    /// Opens an on-disk snapshot read-only.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] if the file cannot be opened or lacks the
    /// base tables.
    pub fn open(path: &Path) -> Result<Self, SnapshotError> {
        let conn = duckdb::Connection::open_with_flags(
            path,
            duckdb::Config::default().access_mode(duckdb::AccessMode::ReadOnly)?,
        )?;
        Self::from_connection(conn, None)
    }

    /// Loads a snapshot from its raw bytes.
    ///
    /// The bytes are written to a private temporary file that lives as
    /// long as the store.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::InvalidSnapshot`] if the bytes are not a
    /// `DuckDB` database or lack the base tables, and I/O or database
    /// errors if the file cannot be staged or opened.
    pub fn load_snapshot(bytes: &[u8]) -> Result<Self, SnapshotError> {
        if bytes.get(MAGIC_OFFSET..MAGIC_OFFSET + MAGIC.len()) != Some(MAGIC.as_slice()) {
            return Err(SnapshotError::InvalidSnapshot {
                message: format!("missing DuckDB header ({} bytes)", bytes.len()),
            });
        }

        let mut file = tempfile::Builder::new()
            .prefix("highway-plan-")
            .suffix(".duckdb")
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;

        let conn = duckdb::Connection::open_with_flags(
            file.path(),
            duckdb::Config::default().access_mode(duckdb::AccessMode::ReadOnly)?,
        )?;
        Self::from_connection(conn, Some(file))
    }

    fn from_connection(
        conn: duckdb::Connection,
        file: Option<tempfile::NamedTempFile>,
    ) -> Result<Self, SnapshotError> {
        let placeholders = vec!["?"; REQUIRED_TABLES.len()].join(", ");
        let present = query_canonical(
            &conn,
            &format!(
                "SELECT count(DISTINCT table_name) AS cnt
                 FROM information_schema.tables
                 WHERE table_name IN ({placeholders})"
            ),
            duckdb::params_from_iter(REQUIRED_TABLES.iter()),
        )?;
        let found = present.first().map_or(0, |r| r.count(CanonicalField::Count));
        if found < REQUIRED_TABLES.len() as u64 {
            return Err(SnapshotError::InvalidSnapshot {
                message: format!(
                    "expected tables {} ({found} of {} present)",
                    REQUIRED_TABLES.join(", "),
                    REQUIRED_TABLES.len()
                ),
            });
        }

        let crosswalk = query_canonical(
            &conn,
            "SELECT raw_code, category, display_name FROM type_crosswalk",
            [],
        )?
        .iter()
        .filter_map(|row| {
            Some(CrosswalkEntry {
                raw_code: row.text(CanonicalField::TypeOfWork)?,
                category: row.text(CanonicalField::Category)?,
                display_name: row.text(CanonicalField::DisplayName).unwrap_or_default(),
            })
        })
        .collect::<Vec<_>>();

        log::info!("Loaded snapshot ({} crosswalk entries)", crosswalk.len());

        Ok(Self {
            conn: Mutex::new(conn),
            crosswalk,
            _file: file,
        })
    }

    fn run(&self, query: &Query) -> Result<Vec<CanonicalRow>, duckdb::Error> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        query_canonical(
            &conn,
            &query.sql,
            duckdb::params_from_iter(query.params.iter()),
        )
    }

    /// Runs the primary form, then the fallback, then gives up with no
    /// rows. Never fails.
    fn run_plan(&self, plan: &QueryPlan) -> (Vec<CanonicalRow>, QuerySource) {
        match self.run(&plan.primary) {
            Ok(rows) => return (rows, QuerySource::View),
            Err(e) => {
                log::warn!(
                    "{} view query unavailable, falling back to base tables: {e}",
                    plan.label
                );
            }
        }

        match self.run(&plan.fallback) {
            Ok(rows) => (rows, QuerySource::Fallback),
            Err(e) => {
                log::error!("{} query failed: {e}", plan.label);
                (Vec::new(), QuerySource::Failed)
            }
        }
    }

    /// Awarded vs current project counts for the filter.
    ///
    /// Returns zero counts when nothing matches or both query forms fail.
    #[must_use]
    pub fn query_awarded_vs_current(&self, filter: &FilterState) -> Queried<AwardStatusCounts> {
        let (rows, source) = self.run_plan(&queries::award_status(filter));
        let value = rows.first().map_or_else(AwardStatusCounts::default, |row| {
            AwardStatusCounts {
                awarded: row.count(CanonicalField::AwardedCount),
                current: row.count(CanonicalField::CurrentCount),
            }
        });
        Queried { value, source }
    }

    /// Project counts by plan year, ascending by year.
    #[must_use]
    pub fn query_counts_by_year(&self, filter: &FilterState) -> Queried<Vec<YearCount>> {
        let (rows, source) = self.run_plan(&queries::counts_by_year(filter));
        let mut value: Vec<YearCount> = rows
            .iter()
            .filter_map(|row| {
                let year = i32::try_from(row.int(CanonicalField::Year)?).ok()?;
                Some(YearCount {
                    year,
                    count: row.count(CanonicalField::Count),
                })
            })
            .filter(|yc| yc.count > 0)
            .collect();
        value.sort_by_key(|yc| yc.year);
        Queried { value, source }
    }

    /// Project rows for the table, at most `limit` of them.
    #[must_use]
    pub fn query_rows(&self, filter: &FilterState, limit: usize) -> Queried<Vec<ProjectRecord>> {
        let (rows, source) = self.run_plan(&queries::rows(filter, limit));
        let value = rows
            .iter()
            .map(record_from_row)
            .take(limit)
            .collect();
        Queried { value, source }
    }

    /// Resolves a category key to its display name, or returns the key
    /// unchanged if the crosswalk has no entry for it.
    #[must_use]
    pub fn lookup_display_name(&self, category: &str) -> String {
        self.crosswalk
            .iter()
            .find(|entry| entry.category == category && !entry.display_name.is_empty())
            .map_or_else(|| category.to_string(), |entry| entry.display_name.clone())
    }

    /// The category a raw work-type code maps to. Matching is
    /// case-sensitive; unmapped codes are unclassified.
    #[must_use]
    pub fn category_for_code(&self, raw_code: &str) -> Option<&str> {
        self.crosswalk
            .iter()
            .find(|entry| entry.raw_code == raw_code)
            .map(|entry| entry.category.as_str())
    }

    /// Distinct project-type categories with display names, sorted by key.
    #[must_use]
    pub fn project_types(&self) -> Vec<(String, String)> {
        let mut types: Vec<(String, String)> = Vec::new();
        for entry in &self.crosswalk {
            if !types.iter().any(|(key, _)| *key == entry.category) {
                types.push((
                    entry.category.clone(),
                    self.lookup_display_name(&entry.category),
                ));
            }
        }
        types.sort();
        types
    }

    /// The full crosswalk.
    #[must_use]
    pub fn crosswalk(&self) -> &[CrosswalkEntry] {
        &self.crosswalk
    }

    /// County reference rows, sorted by name. Empty if the table is
    /// missing.
    #[must_use]
    pub fn counties(&self) -> Vec<CountyRef> {
        let query = Query {
            sql: "SELECT county, district FROM counties ORDER BY county".to_string(),
            params: Vec::new(),
        };
        match self.run(&query) {
            Ok(rows) => rows
                .iter()
                .filter_map(|row| {
                    Some(CountyRef {
                        county: row.text(CanonicalField::County)?,
                        district: i32::try_from(row.int(CanonicalField::District)?).ok()?,
                    })
                })
                .collect(),
            Err(e) => {
                log::warn!("County reference query failed: {e}");
                Vec::new()
            }
        }
    }

    /// District reference rows, sorted by number. Empty if the table is
    /// missing.
    #[must_use]
    pub fn districts(&self) -> Vec<DistrictRef> {
        let query = Query {
            sql: "SELECT district, district_name FROM districts ORDER BY district".to_string(),
            params: Vec::new(),
        };
        match self.run(&query) {
            Ok(rows) => rows
                .iter()
                .filter_map(|row| {
                    Some(DistrictRef {
                        district: i32::try_from(row.int(CanonicalField::District)?).ok()?,
                        district_name: row.text(CanonicalField::DistrictName).unwrap_or_default(),
                    })
                })
                .collect(),
            Err(e) => {
                log::warn!("District reference query failed: {e}");
                Vec::new()
            }
        }
    }
}

fn record_from_row(row: &CanonicalRow) -> ProjectRecord {
    ProjectRecord {
        item_no: row.text(CanonicalField::ItemNo).unwrap_or_default(),
        district: row
            .int(CanonicalField::District)
            .and_then(|n| i32::try_from(n).ok())
            .unwrap_or(0),
        county: row.text(CanonicalField::County).unwrap_or_default(),
        route: row.text(CanonicalField::Route).unwrap_or_default(),
        plan_year: row
            .int(CanonicalField::Year)
            .and_then(|n| i32::try_from(n).ok())
            .unwrap_or(0),
        type_of_work: row.text(CanonicalField::TypeOfWork).unwrap_or_default(),
        awarded: row.flag(CanonicalField::Awarded).unwrap_or(false),
        description: row.text(CanonicalField::Description).unwrap_or_default(),
        begin_mp: row.float(CanonicalField::BeginMp),
        end_mp: row.float(CanonicalField::EndMp),
        est_cost: row.float(CanonicalField::EstCost),
    }
}

#[cfg(test)]
mod tests {
    use highway_plan_project_models::{DEFAULT_ROW_LIMIT, District};

    use super::*;
    use crate::snapshot::{SnapshotContents, write_snapshot};

    fn project(
        item: &str,
        district: i32,
        county: &str,
        year: i32,
        code: &str,
        awarded: bool,
    ) -> ProjectRecord {
        ProjectRecord {
            item_no: item.to_string(),
            district,
            county: county.to_string(),
            route: "KY-4".to_string(),
            plan_year: year,
            type_of_work: code.to_string(),
            awarded,
            description: format!("Project {item}"),
            begin_mp: Some(1.0),
            end_mp: Some(2.5),
            est_cost: Some(1_500_000.0),
        }
    }

    fn contents() -> SnapshotContents {
        SnapshotContents {
            projects: vec![
                project("7-101", 7, "Fayette", 2024, "BRIDGE REPLACEMENT", true),
                project("7-102", 7, "Fayette", 2026, "RESURFACING", false),
                project("5-201", 5, "Jefferson", 2025, "BRIDGE REPLACEMENT", true),
                project("5-202", 5, "Jefferson", 2025, "SAFETY", false),
                project("7-103", 7, "Jessamine", 2024, "UNMAPPED CODE", false),
            ],
            crosswalk: vec![
                CrosswalkEntry {
                    raw_code: "BRIDGE REPLACEMENT".to_string(),
                    category: "BRIDGE".to_string(),
                    display_name: "Bridge Work".to_string(),
                },
                CrosswalkEntry {
                    raw_code: "RESURFACING".to_string(),
                    category: "PAVEMENT".to_string(),
                    display_name: "Pavement".to_string(),
                },
                CrosswalkEntry {
                    raw_code: "SAFETY".to_string(),
                    category: "SAFETY".to_string(),
                    display_name: "Safety Improvements".to_string(),
                },
            ],
            counties: vec![
                CountyRef {
                    county: "Fayette".to_string(),
                    district: 7,
                },
                CountyRef {
                    county: "Jefferson".to_string(),
                    district: 5,
                },
            ],
            districts: vec![
                DistrictRef {
                    district: 5,
                    district_name: "Louisville".to_string(),
                },
                DistrictRef {
                    district: 7,
                    district_name: "Lexington".to_string(),
                },
            ],
        }
    }

    fn store(with_views: bool) -> (tempfile::TempDir, DatasetStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.duckdb");
        write_snapshot(&path, &contents(), with_views).unwrap();
        let store = DatasetStore::open(&path).unwrap();
        (dir, store)
    }

    fn all_filters() -> Vec<FilterState> {
        vec![
            FilterState::None,
            FilterState::County("Fayette".to_string()),
            FilterState::County("JEFFERSON".to_string()),
            FilterState::District(District::new(7).unwrap()),
            FilterState::District(District::new(12).unwrap()),
            FilterState::ProjectType("BRIDGE".to_string()),
            FilterState::ProjectType("NO_SUCH_CATEGORY".to_string()),
        ]
    }

    #[test]
    fn views_answer_when_present() {
        let (_dir, store) = store(true);
        let result = store.query_awarded_vs_current(&FilterState::None);
        assert_eq!(result.source, QuerySource::View);
        assert_eq!(result.value, AwardStatusCounts { awarded: 2, current: 3 });
    }

    #[test]
    fn falls_back_when_views_missing() {
        let (_dir, store) = store(false);
        let filter = FilterState::County("Fayette".to_string());

        let counts = store.query_awarded_vs_current(&filter);
        assert_eq!(counts.source, QuerySource::Fallback);
        assert_eq!(counts.value, AwardStatusCounts { awarded: 1, current: 1 });

        let years = store.query_counts_by_year(&filter);
        assert_eq!(years.source, QuerySource::Fallback);
        assert_eq!(
            years.value,
            vec![
                YearCount { year: 2024, count: 1 },
                YearCount { year: 2026, count: 1 },
            ]
        );

        let rows = store.query_rows(&filter, DEFAULT_ROW_LIMIT);
        assert_eq!(rows.source, QuerySource::Fallback);
        assert_eq!(rows.value.len(), 2);
    }

    #[test]
    fn views_and_fallbacks_agree() {
        let (_dir_a, with_views) = store(true);
        let (_dir_b, without_views) = store(false);

        for filter in all_filters() {
            assert_eq!(
                with_views.query_awarded_vs_current(&filter).value,
                without_views.query_awarded_vs_current(&filter).value,
                "{filter:?}"
            );
            assert_eq!(
                with_views.query_counts_by_year(&filter).value,
                without_views.query_counts_by_year(&filter).value,
                "{filter:?}"
            );
            assert_eq!(
                with_views.query_rows(&filter, DEFAULT_ROW_LIMIT).value,
                without_views.query_rows(&filter, DEFAULT_ROW_LIMIT).value,
                "{filter:?}"
            );
        }
    }

    #[test]
    fn district_counts_match_row_count() {
        let (_dir, store) = store(true);
        for district in District::all() {
            let filter = FilterState::District(district);
            let counts = store.query_awarded_vs_current(&filter).value;
            let rows = store.query_rows(&filter, DEFAULT_ROW_LIMIT).value;
            assert_eq!(counts.total(), rows.len() as u64, "district {district}");
        }
    }

    #[test]
    fn null_awarded_counts_as_current() {
        for with_views in [true, false] {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("snapshot.duckdb");
            write_snapshot(&path, &contents(), with_views).unwrap();
            {
                let conn = duckdb::Connection::open(&path).unwrap();
                conn.execute_batch(
                    "UPDATE projects SET awarded = NULL WHERE item_no = '7-101'; CHECKPOINT;",
                )
                .unwrap();
            }
            let store = DatasetStore::open(&path).unwrap();

            let filter = FilterState::District(District::new(7).unwrap());
            let counts = store.query_awarded_vs_current(&filter).value;
            let rows = store.query_rows(&filter, DEFAULT_ROW_LIMIT).value;

            assert_eq!(counts, AwardStatusCounts { awarded: 0, current: 3 });
            assert_eq!(counts.total(), rows.len() as u64);
            assert!(rows.iter().all(|r| !r.awarded));
        }
    }

    #[test]
    fn project_type_excludes_unclassified() {
        let (_dir, store) = store(true);
        let filter = FilterState::ProjectType("BRIDGE".to_string());
        let rows = store.query_rows(&filter, DEFAULT_ROW_LIMIT).value;
        let items: Vec<&str> = rows.iter().map(|r| r.item_no.as_str()).collect();
        assert_eq!(items, vec!["7-101", "5-201"]);
        assert_eq!(
            store.query_awarded_vs_current(&filter).value,
            AwardStatusCounts { awarded: 2, current: 0 }
        );
    }

    #[test]
    fn unknown_category_is_empty_not_an_error() {
        let (_dir, store) = store(true);
        let filter = FilterState::ProjectType("NO_SUCH_CATEGORY".to_string());
        assert_eq!(
            store.query_awarded_vs_current(&filter).value,
            AwardStatusCounts::default()
        );
        assert!(store.query_counts_by_year(&filter).value.is_empty());
        assert!(store.query_rows(&filter, DEFAULT_ROW_LIMIT).value.is_empty());
        assert_eq!(store.lookup_display_name("NO_SUCH_CATEGORY"), "NO_SUCH_CATEGORY");
    }

    #[test]
    fn row_limit_caps_result() {
        let (_dir, store) = store(true);
        let rows = store.query_rows(&FilterState::None, 2).value;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].plan_year, 2024);
    }

    #[test]
    fn years_are_ascending() {
        let (_dir, store) = store(true);
        let years: Vec<i32> = store
            .query_counts_by_year(&FilterState::None)
            .value
            .iter()
            .map(|yc| yc.year)
            .collect();
        assert_eq!(years, vec![2024, 2025, 2026]);
    }

    #[test]
    fn crosswalk_lookups() {
        let (_dir, store) = store(true);
        assert_eq!(store.lookup_display_name("BRIDGE"), "Bridge Work");
        assert_eq!(store.category_for_code("RESURFACING"), Some("PAVEMENT"));
        assert_eq!(store.category_for_code("resurfacing"), None);
        assert_eq!(store.category_for_code("UNMAPPED CODE"), None);
        assert_eq!(store.project_types().len(), 3);
    }

    #[test]
    fn reference_tables() {
        let (_dir, store) = store(true);
        assert_eq!(store.counties().len(), 2);
        assert_eq!(store.districts()[1].district_name, "Lexington");
    }

    #[test]
    fn repeated_queries_are_identical() {
        let (_dir, store) = store(true);
        let filter = FilterState::District(District::new(5).unwrap());
        let first = store.query_rows(&filter, DEFAULT_ROW_LIMIT);
        let second = store.query_rows(&filter, DEFAULT_ROW_LIMIT);
        assert_eq!(first, second);
    }

    #[test]
    fn loads_from_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.duckdb");
        write_snapshot(&path, &contents(), true).unwrap();
        let bytes = std::fs::read(&path).unwrap();

        let store = DatasetStore::load_snapshot(&bytes).unwrap();
        assert_eq!(
            store.query_awarded_vs_current(&FilterState::None).value.total(),
            5
        );
    }

    #[test]
    fn rejects_non_snapshot_bytes() {
        let err = DatasetStore::load_snapshot(b"<html>404 Not Found</html>").unwrap_err();
        assert!(matches!(err, SnapshotError::InvalidSnapshot { .. }));

        let err = DatasetStore::load_snapshot(&[]).unwrap_err();
        assert!(matches!(err, SnapshotError::InvalidSnapshot { .. }));
    }

    #[test]
    fn rejects_snapshot_without_base_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.duckdb");
        {
            let conn = duckdb::Connection::open(&path).unwrap();
            conn.execute_batch("CREATE TABLE unrelated (x INTEGER); CHECKPOINT;")
                .unwrap();
        }
        let err = DatasetStore::open(&path).unwrap_err();
        assert!(matches!(err, SnapshotError::InvalidSnapshot { .. }));
    }
}
