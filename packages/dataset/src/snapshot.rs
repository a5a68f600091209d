//! Snapshot writer.
//!
//! Produces the `DuckDB` file the dashboard loads: the base tables and,
//! optionally, the pre-aggregated views the store prefers.

use std::path::Path;

use highway_plan_project_models::{CountyRef, CrosswalkEntry, DistrictRef, ProjectRecord};

/// Base table definitions.
pub const BASE_TABLES_SQL: &str = "
CREATE TABLE projects (
    item_no VARCHAR,
    district INTEGER,
    county VARCHAR,
    route VARCHAR,
    plan_year INTEGER,
    type_of_work VARCHAR,
    awarded BOOLEAN,
    description VARCHAR,
    begin_mp DOUBLE,
    end_mp DOUBLE,
    est_cost DOUBLE
);
CREATE TABLE type_crosswalk (
    raw_code VARCHAR,
    category VARCHAR,
    display_name VARCHAR
);
CREATE TABLE counties (
    county VARCHAR,
    district INTEGER
);
CREATE TABLE districts (
    district INTEGER,
    district_name VARCHAR
);
";

/// Pre-aggregated views, one per query and filter kind.
pub const VIEWS_SQL: &str = "
CREATE VIEW v_award_status AS
    SELECT count(*) FILTER (WHERE awarded) AS awarded_count,
           count(*) FILTER (WHERE NOT coalesce(awarded, false)) AS current_count
    FROM projects;
CREATE VIEW v_award_status_by_county AS
    SELECT county,
           count(*) FILTER (WHERE awarded) AS awarded_count,
           count(*) FILTER (WHERE NOT coalesce(awarded, false)) AS current_count
    FROM projects GROUP BY county;
CREATE VIEW v_award_status_by_district AS
    SELECT district,
           count(*) FILTER (WHERE awarded) AS awarded_count,
           count(*) FILTER (WHERE NOT coalesce(awarded, false)) AS current_count
    FROM projects GROUP BY district;
CREATE VIEW v_award_status_by_type AS
    SELECT c.category,
           count(*) FILTER (WHERE p.awarded) AS awarded_count,
           count(*) FILTER (WHERE NOT coalesce(p.awarded, false)) AS current_count
    FROM projects p JOIN type_crosswalk c ON p.type_of_work = c.raw_code
    GROUP BY c.category;
CREATE VIEW v_year_counts AS
    SELECT plan_year AS \"YEAR\", count(*) AS PROJECT_COUNT
    FROM projects GROUP BY plan_year;
CREATE VIEW v_year_counts_by_county AS
    SELECT county AS COUNTY, plan_year AS \"YEAR\", count(*) AS PROJECT_COUNT
    FROM projects GROUP BY county, plan_year;
CREATE VIEW v_year_counts_by_district AS
    SELECT district AS DISTRICT, plan_year AS \"YEAR\", count(*) AS PROJECT_COUNT
    FROM projects GROUP BY district, plan_year;
CREATE VIEW v_year_counts_by_type AS
    SELECT c.category AS CATEGORY, p.plan_year AS \"YEAR\", count(*) AS PROJECT_COUNT
    FROM projects p JOIN type_crosswalk c ON p.type_of_work = c.raw_code
    GROUP BY c.category, p.plan_year;
CREATE VIEW v_project_rows AS
    SELECT p.*, c.category, c.display_name
    FROM projects p LEFT JOIN type_crosswalk c ON p.type_of_work = c.raw_code;
";

/// Everything that goes into a snapshot.
#[derive(Debug, Clone, Default)]
pub struct SnapshotContents {
    /// Project rows.
    pub projects: Vec<ProjectRecord>,
    /// Work-type crosswalk.
    pub crosswalk: Vec<CrosswalkEntry>,
    /// County reference rows.
    pub counties: Vec<CountyRef>,
    /// District reference rows.
    pub districts: Vec<DistrictRef>,
}

/// Writes a snapshot database to `path`.
///
/// When `with_views` is `false` only the base tables are written, which
/// forces every store query onto its fallback path.
///
/// # Errors
///
/// Returns the `DuckDB` error if the file cannot be created or any
/// statement fails.
pub fn write_snapshot(
    path: &Path,
    contents: &SnapshotContents,
    with_views: bool,
) -> Result<(), duckdb::Error> {
    let duck = duckdb::Connection::open(path)?;
    duck.execute_batch(BASE_TABLES_SQL)?;
    duck.execute_batch("BEGIN TRANSACTION")?;

    {
        let mut stmt = duck.prepare(
            "INSERT INTO projects (item_no, district, county, route, plan_year, type_of_work,
                awarded, description, begin_mp, end_mp, est_cost)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )?;
        for p in &contents.projects {
            stmt.execute(duckdb::params![
                p.item_no,
                p.district,
                p.county,
                p.route,
                p.plan_year,
                p.type_of_work,
                p.awarded,
                p.description,
                p.begin_mp,
                p.end_mp,
                p.est_cost,
            ])?;
        }
    }

    {
        let mut stmt = duck.prepare(
            "INSERT INTO type_crosswalk (raw_code, category, display_name) VALUES (?, ?, ?)",
        )?;
        for entry in &contents.crosswalk {
            stmt.execute(duckdb::params![
                entry.raw_code,
                entry.category,
                entry.display_name
            ])?;
        }
    }

    {
        let mut stmt = duck.prepare("INSERT INTO counties (county, district) VALUES (?, ?)")?;
        for county in &contents.counties {
            stmt.execute(duckdb::params![county.county, county.district])?;
        }
    }

    {
        let mut stmt =
            duck.prepare("INSERT INTO districts (district, district_name) VALUES (?, ?)")?;
        for district in &contents.districts {
            stmt.execute(duckdb::params![district.district, district.district_name])?;
        }
    }

    duck.execute_batch("COMMIT")?;

    if with_views {
        duck.execute_batch(VIEWS_SQL)?;
    }

    duck.execute_batch("CHECKPOINT")?;

    log::info!(
        "Wrote snapshot {} ({} projects, {} crosswalk entries, views: {with_views})",
        path.display(),
        contents.projects.len(),
        contents.crosswalk.len(),
    );

    Ok(())
}
