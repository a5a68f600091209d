//! Panel and table titles derived from the filter.

use highway_plan_project_models::FilterState;
use serde::{Deserialize, Serialize};

const PANEL_BASE: &str = "Projects";
const TABLE_BASE: &str = "Highway Projects Data";

/// The two title strings shown by the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardTitles {
    /// Chart panel title. Never mentions the project type.
    pub panel: String,
    /// Table title.
    pub table: String,
}

impl Default for DashboardTitles {
    fn default() -> Self {
        compose_titles(None, None, None)
    }
}

/// Builds both titles from their optional parts.
///
/// Accepts any combination of parts, even though the filter only ever
/// supplies one of them.
#[must_use]
pub fn compose_titles(
    district: Option<&str>,
    county: Option<&str>,
    project_type_display: Option<&str>,
) -> DashboardTitles {
    let mut suffix = String::new();
    if let Some(district) = district {
        suffix.push_str(" in District ");
        suffix.push_str(district);
    }
    if let Some(county) = county {
        suffix.push_str(" in ");
        suffix.push_str(county);
        suffix.push_str(" County");
    }

    let mut table = format!("{TABLE_BASE}{suffix}");
    if let Some(display) = project_type_display {
        table.push_str(" (");
        table.push_str(display);
        table.push(')');
    }

    DashboardTitles {
        panel: format!("{PANEL_BASE}{suffix}"),
        table,
    }
}

/// Titles for a filter. `display_name` resolves a project-type category
/// key to its label.
pub fn titles_for(
    filter: &FilterState,
    display_name: impl FnOnce(&str) -> String,
) -> DashboardTitles {
    match filter {
        FilterState::None => compose_titles(None, None, None),
        FilterState::County(name) => compose_titles(None, Some(name), None),
        FilterState::District(district) => {
            compose_titles(Some(&district.to_string()), None, None)
        }
        FilterState::ProjectType(category) => {
            let display = display_name(category);
            compose_titles(None, None, Some(&display))
        }
    }
}

#[cfg(test)]
mod tests {
    use highway_plan_project_models::District;

    use super::*;

    #[test]
    fn unfiltered_titles() {
        let titles = titles_for(&FilterState::None, str::to_string);
        assert_eq!(titles.panel, "Projects");
        assert_eq!(titles.table, "Highway Projects Data");
        assert_eq!(titles, DashboardTitles::default());
    }

    #[test]
    fn county_and_district_suffixes() {
        let county = titles_for(&FilterState::County("Fayette".to_string()), str::to_string);
        assert_eq!(county.panel, "Projects in Fayette County");
        assert_eq!(county.table, "Highway Projects Data in Fayette County");

        let district = titles_for(
            &FilterState::District(District::new(7).unwrap()),
            str::to_string,
        );
        assert_eq!(district.panel, "Projects in District 7");
        assert_eq!(district.table, "Highway Projects Data in District 7");
    }

    #[test]
    fn project_type_only_changes_table_title() {
        let titles = titles_for(&FilterState::ProjectType("BRIDGE".to_string()), |_| {
            "Bridge Work".to_string()
        });
        assert_eq!(titles.panel, "Projects");
        assert_eq!(titles.table, "Highway Projects Data (Bridge Work)");
    }

    #[test]
    fn all_parts_together() {
        let titles = compose_titles(Some("7"), Some("Fayette"), Some("Bridge Work"));
        assert_eq!(titles.panel, "Projects in District 7 in Fayette County");
        assert_eq!(
            titles.table,
            "Highway Projects Data in District 7 in Fayette County (Bridge Work)"
        );
    }
}
