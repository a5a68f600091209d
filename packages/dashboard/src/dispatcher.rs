//! Aggregation dispatch.
//!
//! Turns a filter into the three dataset queries. The queries are
//! independent: one failing or coming back empty never stops the others.

use highway_plan_dataset::{DatasetStore, QuerySource};
use highway_plan_project_models::{AggregateResult, FilterState};
use serde::Serialize;

/// Which query form answered each of the three dispatched queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSources {
    /// Awarded vs current counts.
    pub award_status: SourceLabel,
    /// Counts by year.
    pub year_counts: SourceLabel,
    /// Table rows.
    pub rows: SourceLabel,
}

/// Serializable mirror of [`QuerySource`], plus the case where no
/// dataset was loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceLabel {
    /// Pre-aggregated view.
    View,
    /// Base-table fallback.
    Fallback,
    /// Both forms failed.
    Failed,
    /// No dataset loaded.
    NotLoaded,
}

impl From<QuerySource> for SourceLabel {
    fn from(value: QuerySource) -> Self {
        match value {
            QuerySource::View => Self::View,
            QuerySource::Fallback => Self::Fallback,
            QuerySource::Failed => Self::Failed,
        }
    }
}

/// The result of one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Refresh {
    /// The fresh aggregate.
    pub result: AggregateResult,
    /// Where each part came from.
    pub sources: RefreshSources,
}

/// Runs the award-status, year-count and row queries for `filter`, in
/// that order.
///
/// With no dataset loaded the result is empty; queries are never served
/// before a load completes.
#[must_use]
pub fn refresh(store: Option<&DatasetStore>, filter: &FilterState, row_limit: usize) -> Refresh {
    let Some(store) = store else {
        log::debug!("Dataset not loaded; refresh for {filter:?} is empty");
        return Refresh {
            result: AggregateResult::default(),
            sources: RefreshSources {
                award_status: SourceLabel::NotLoaded,
                year_counts: SourceLabel::NotLoaded,
                rows: SourceLabel::NotLoaded,
            },
        };
    };

    let award_status = store.query_awarded_vs_current(filter);
    let year_counts = store.query_counts_by_year(filter);
    let rows = store.query_rows(filter, row_limit);

    let result = AggregateResult {
        award_status: award_status.value,
        year_counts: year_counts.value,
        rows: rows.value,
    };

    if result.is_empty() {
        log::info!("No projects match {filter:?}");
    }

    Refresh {
        result,
        sources: RefreshSources {
            award_status: award_status.source.into(),
            year_counts: year_counts.source.into(),
            rows: rows.source.into(),
        },
    }
}
