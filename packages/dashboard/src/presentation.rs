//! Presentation sync: turns a filter and its aggregate into what the
//! views draw.

use geojson::Feature;
use highway_plan_project_models::{AggregateResult, AwardStatusCounts, FilterState, YearCount};
use highway_plan_spatial::property_value;

use crate::config::LayerProperties;
use crate::titles::DashboardTitles;
use crate::views::{ChartPoint, ChartView, FeatureStyle, TableView};

/// Pie series for the award-status chart. Empty when there is nothing to
/// show.
#[must_use]
pub fn award_status_series(counts: AwardStatusCounts) -> Vec<ChartPoint> {
    if counts.total() == 0 {
        return Vec::new();
    }
    vec![
        ChartPoint {
            label: "Awarded".to_string(),
            value: counts.awarded,
        },
        ChartPoint {
            label: "Current".to_string(),
            value: counts.current,
        },
    ]
}

/// Bar series for the projects-by-year chart.
#[must_use]
pub fn year_series(year_counts: &[YearCount]) -> Vec<ChartPoint> {
    year_counts
        .iter()
        .map(|yc| ChartPoint {
            label: yc.year.to_string(),
            value: yc.count,
        })
        .collect()
}

/// Styles every project feature for `filter`.
///
/// County and district filters hide features outside the selection. A
/// project-type filter keeps every feature on the map and dims the ones
/// whose work type does not map to the category; `classify` resolves a
/// raw work-type code to its category.
pub fn feature_styles<F>(
    filter: &FilterState,
    features: &[Feature],
    properties: &LayerProperties,
    classify: F,
) -> Vec<FeatureStyle>
where
    F: Fn(&str) -> Option<String>,
{
    features
        .iter()
        .map(|feature| match filter {
            FilterState::None => FeatureStyle::Visible,
            FilterState::County(name) => {
                let matches = property_value(feature, &properties.project_county)
                    .is_some_and(|county| county.trim().eq_ignore_ascii_case(name.trim()));
                if matches {
                    FeatureStyle::Visible
                } else {
                    FeatureStyle::Hidden
                }
            }
            FilterState::District(district) => {
                let matches = property_value(feature, &properties.project_district)
                    .and_then(|value| value.trim().parse::<i64>().ok())
                    .is_some_and(|value| value == i64::from(district.value()));
                if matches {
                    FeatureStyle::Visible
                } else {
                    FeatureStyle::Hidden
                }
            }
            FilterState::ProjectType(category) => {
                let matches = property_value(feature, &properties.project_work_type)
                    .and_then(|code| classify(&code))
                    .is_some_and(|c| c == *category);
                if matches {
                    FeatureStyle::Visible
                } else {
                    FeatureStyle::DIMMED
                }
            }
        })
        .collect()
}

/// Pushes both titles.
pub fn push_titles<V: ChartView + TableView>(views: &mut V, titles: &DashboardTitles) {
    views.set_panel_title(&titles.panel);
    views.set_title(&titles.table);
}

/// Pushes a fresh aggregate to the charts and the table. An empty
/// aggregate clears them.
pub fn push_result<V: ChartView + TableView>(views: &mut V, result: &AggregateResult) {
    views.render_award_status(&award_status_series(result.award_status));
    views.render_year_counts(&year_series(&result.year_counts));
    views.set_rows(&result.rows);
}
