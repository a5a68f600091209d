//! SQL for the three dashboard queries.
//!
//! Each query has a primary form that reads a pre-aggregated view
//! specific to the filter kind, and a fallback form that computes the
//! same answer from the base `projects` table (joined to the crosswalk
//! when filtering by project type). The store runs the fallback only
//! when the primary form fails.

use duckdb::ToSql;
use duckdb::types::ToSqlOutput;
use highway_plan_project_models::FilterState;

/// A bound query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryParam {
    /// Text parameter.
    Text(String),
    /// Integer parameter.
    Int(i64),
}

impl ToSql for QueryParam {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        match self {
            Self::Text(s) => s.to_sql(),
            Self::Int(n) => n.to_sql(),
        }
    }
}

/// SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Statement text with `?` placeholders.
    pub sql: String,
    /// Parameters in placeholder order.
    pub params: Vec<QueryParam>,
}

/// A preferred query and its base-table equivalent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    /// Short name used in log lines.
    pub label: &'static str,
    /// Query against the pre-aggregated view.
    pub primary: Query,
    /// Equivalent query against the base tables.
    pub fallback: Query,
}

/// Join, WHERE clause and parameters for filtering the base table
/// (aliased `p`).
fn base_filter(filter: &FilterState) -> (&'static str, String, Vec<QueryParam>) {
    match filter {
        FilterState::None => ("", String::new(), Vec::new()),
        FilterState::County(name) => (
            "",
            " WHERE upper(p.county) = upper(?)".to_string(),
            vec![QueryParam::Text(name.clone())],
        ),
        FilterState::District(district) => (
            "",
            " WHERE p.district = ?".to_string(),
            vec![QueryParam::Int(i64::from(district.value()))],
        ),
        FilterState::ProjectType(category) => (
            " JOIN type_crosswalk c ON p.type_of_work = c.raw_code",
            " WHERE c.category = ?".to_string(),
            vec![QueryParam::Text(category.clone())],
        ),
    }
}

/// The grouped view for a filter kind, its key predicate, and the
/// parameters.
fn view_filter(
    filter: &FilterState,
    prefix: &str,
) -> Option<(String, &'static str, Vec<QueryParam>)> {
    match filter {
        FilterState::None => None,
        FilterState::County(name) => Some((
            format!("{prefix}_by_county"),
            "upper(county) = upper(?)",
            vec![QueryParam::Text(name.clone())],
        )),
        FilterState::District(district) => Some((
            format!("{prefix}_by_district"),
            "district = ?",
            vec![QueryParam::Int(i64::from(district.value()))],
        )),
        FilterState::ProjectType(category) => Some((
            format!("{prefix}_by_type"),
            "category = ?",
            vec![QueryParam::Text(category.clone())],
        )),
    }
}

/// Awarded vs current counts.
#[must_use]
pub fn award_status(filter: &FilterState) -> QueryPlan {
    let primary = view_filter(filter, "v_award_status").map_or_else(
        || Query {
            sql: "SELECT awarded_count, current_count FROM v_award_status".to_string(),
            params: Vec::new(),
        },
        |(view, predicate, params)| Query {
            sql: format!(
                "SELECT CAST(coalesce(sum(awarded_count), 0) AS BIGINT) AS awarded_count,
                        CAST(coalesce(sum(current_count), 0) AS BIGINT) AS current_count
                 FROM {view}
                 WHERE {predicate}"
            ),
            params,
        },
    );

    let (join, wc, params) = base_filter(filter);
    let fallback = Query {
        sql: format!(
            "SELECT count(*) FILTER (WHERE p.awarded) AS awarded_count,
                    count(*) FILTER (WHERE NOT coalesce(p.awarded, false)) AS not_awarded
             FROM projects p{join}{wc}"
        ),
        params,
    };

    QueryPlan {
        label: "award status",
        primary,
        fallback,
    }
}

/// Project counts by plan year, ascending.
#[must_use]
pub fn counts_by_year(filter: &FilterState) -> QueryPlan {
    let primary = view_filter(filter, "v_year_counts").map_or_else(
        || Query {
            sql: "SELECT \"YEAR\", PROJECT_COUNT FROM v_year_counts ORDER BY \"YEAR\"".to_string(),
            params: Vec::new(),
        },
        |(view, predicate, params)| Query {
            sql: format!(
                "SELECT \"YEAR\", CAST(sum(PROJECT_COUNT) AS BIGINT) AS PROJECT_COUNT
                 FROM {view}
                 WHERE {predicate}
                 GROUP BY \"YEAR\"
                 ORDER BY \"YEAR\""
            ),
            params,
        },
    );

    let (join, wc, params) = base_filter(filter);
    let fallback = Query {
        sql: format!(
            "SELECT p.plan_year AS year, count(*) AS cnt
             FROM projects p{join}{wc}
             GROUP BY p.plan_year
             ORDER BY p.plan_year"
        ),
        params,
    };

    QueryPlan {
        label: "counts by year",
        primary,
        fallback,
    }
}

const ROW_COLUMNS: &str = "p.item_no, p.district, p.county, p.route, p.plan_year, \
     p.type_of_work, p.awarded, p.description, p.begin_mp, p.end_mp, p.est_cost";

/// Table rows, capped at `limit`.
#[must_use]
pub fn rows(filter: &FilterState, limit: usize) -> QueryPlan {
    let limit = QueryParam::Int(i64::try_from(limit).unwrap_or(i64::MAX));

    // `v_project_rows` already carries the crosswalk category, so the
    // project-type predicate needs no join there.
    let (view_wc, mut view_params) = match filter {
        FilterState::ProjectType(category) => (
            " WHERE p.category = ?".to_string(),
            vec![QueryParam::Text(category.clone())],
        ),
        other => {
            let (_, wc, params) = base_filter(other);
            (wc, params)
        }
    };
    view_params.push(limit.clone());
    let primary = Query {
        sql: format!(
            "SELECT {ROW_COLUMNS}
             FROM v_project_rows p{view_wc}
             ORDER BY p.plan_year, p.item_no
             LIMIT ?"
        ),
        params: view_params,
    };

    let (join, wc, mut params) = base_filter(filter);
    params.push(limit);
    let fallback = Query {
        sql: format!(
            "SELECT {ROW_COLUMNS}
             FROM projects p{join}{wc}
             ORDER BY p.plan_year, p.item_no
             LIMIT ?"
        ),
        params,
    };

    QueryPlan {
        label: "rows",
        primary,
        fallback,
    }
}

#[cfg(test)]
mod tests {
    use highway_plan_project_models::District;

    use super::*;

    #[test]
    fn unfiltered_plans_bind_nothing() {
        let plan = award_status(&FilterState::None);
        assert!(plan.primary.params.is_empty());
        assert!(plan.fallback.params.is_empty());
        assert!(!plan.fallback.sql.contains("WHERE"));
    }

    #[test]
    fn district_plans_use_district_view() {
        let filter = FilterState::District(District::new(7).unwrap());
        let plan = counts_by_year(&filter);
        assert!(plan.primary.sql.contains("v_year_counts_by_district"));
        assert_eq!(plan.primary.params, vec![QueryParam::Int(7)]);
        assert_eq!(plan.fallback.params, vec![QueryParam::Int(7)]);
    }

    #[test]
    fn project_type_fallback_joins_crosswalk() {
        let filter = FilterState::ProjectType("BRIDGE".to_string());
        for plan in [award_status(&filter), counts_by_year(&filter), rows(&filter, 10)] {
            assert!(
                plan.fallback.sql.contains("JOIN type_crosswalk"),
                "{}",
                plan.label
            );
        }
    }

    #[test]
    fn county_match_ignores_case() {
        let plan = award_status(&FilterState::County("fayette".to_string()));
        assert!(plan.primary.sql.contains("upper(county) = upper(?)"));
        assert!(plan.fallback.sql.contains("upper(p.county) = upper(?)"));
    }

    #[test]
    fn row_limit_is_last_parameter() {
        let plan = rows(&FilterState::County("Fayette".to_string()), 25);
        assert_eq!(plan.primary.params.last(), Some(&QueryParam::Int(25)));
        assert_eq!(plan.fallback.params.len(), 2);
    }
}
