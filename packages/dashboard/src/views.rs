//! View collaborator traits and a recording implementation.
//!
//! The dashboard core never talks to a map, chart or grid library
//! directly. It pushes state through these traits; a concrete UI binds
//! them to its widgets.

use highway_plan_project_models::{BoundingBox, ProjectRecord, TableColumn};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Opacity used for de-emphasized project features.
pub const DIMMED_OPACITY: f64 = 0.25;

/// The two project line layers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ProjectLayer {
    /// Projects not yet awarded.
    Current,
    /// Awarded projects.
    Awarded,
}

/// How one project feature is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum FeatureStyle {
    /// Full opacity.
    Visible,
    /// Drawn at reduced opacity.
    Dimmed {
        /// Opacity in `0.0..=1.0`.
        opacity: f64,
    },
    /// Not drawn.
    Hidden,
}

impl FeatureStyle {
    /// The standard de-emphasized style.
    pub const DIMMED: Self = Self::Dimmed {
        opacity: DIMMED_OPACITY,
    };

    /// Effective opacity; hidden features are fully transparent.
    #[must_use]
    pub const fn opacity(self) -> f64 {
        match self {
            Self::Visible => 1.0,
            Self::Dimmed { opacity } => opacity,
            Self::Hidden => 0.0,
        }
    }
}

/// One labeled value in a chart series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartPoint {
    /// Slice or bar label.
    pub label: String,
    /// Value.
    pub value: u64,
}

/// Map rendering collaborator.
pub trait MapView {
    /// Pans and zooms to `bounds`.
    fn fit_bounds(&mut self, bounds: BoundingBox);

    /// Restyles every feature of `layer`; `styles` is parallel to the
    /// layer's feature list.
    fn style_features(&mut self, layer: ProjectLayer, styles: &[FeatureStyle]);
}

/// Charting collaborator. Each render replaces the previous chart.
pub trait ChartView {
    /// Sets the chart panel title.
    fn set_panel_title(&mut self, title: &str);

    /// Redraws the awarded vs current pie chart. An empty series is the
    /// "no data" state.
    fn render_award_status(&mut self, series: &[ChartPoint]);

    /// Redraws the projects-by-year bar chart.
    fn render_year_counts(&mut self, series: &[ChartPoint]);
}

/// Tabular grid collaborator.
pub trait TableView {
    /// Sets the table title.
    fn set_title(&mut self, title: &str);

    /// Replaces the visible column set.
    fn set_columns(&mut self, columns: &[TableColumn]);

    /// Replaces the loaded rows. Pagination is up to the grid.
    fn set_rows(&mut self, rows: &[ProjectRecord]);
}

/// Everything the views were last told.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    /// Heading over the charts.
    pub panel_title: String,
    /// Heading over the table.
    pub table_title: String,
    /// Awarded vs current pie series.
    pub award_status: Vec<ChartPoint>,
    /// Projects-by-year bar series.
    pub year_counts: Vec<ChartPoint>,
    /// Visible table columns.
    pub columns: Vec<TableColumn>,
    /// Loaded table rows.
    pub rows: Vec<ProjectRecord>,
    /// Last pan target, if the map was ever panned.
    pub bounds: Option<BoundingBox>,
    /// Per-feature styles of the current projects layer.
    pub current_styles: Vec<FeatureStyle>,
    /// Per-feature styles of the awarded projects layer.
    pub awarded_styles: Vec<FeatureStyle>,
    /// Number of chart redraws, counting both charts.
    pub chart_renders: u64,
}

/// Views that record what they are told into a [`ViewState`].
#[derive(Debug, Clone, Default)]
pub struct RecordedViews {
    state: ViewState,
}

impl RecordedViews {
    /// Views with nothing recorded yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// What the views were last told.
    #[must_use]
    pub const fn state(&self) -> &ViewState {
        &self.state
    }
}

impl MapView for RecordedViews {
    fn fit_bounds(&mut self, bounds: BoundingBox) {
        self.state.bounds = Some(bounds);
    }

    fn style_features(&mut self, layer: ProjectLayer, styles: &[FeatureStyle]) {
        let target = match layer {
            ProjectLayer::Current => &mut self.state.current_styles,
            ProjectLayer::Awarded => &mut self.state.awarded_styles,
        };
        *target = styles.to_vec();
    }
}

impl ChartView for RecordedViews {
    fn set_panel_title(&mut self, title: &str) {
        self.state.panel_title = title.to_string();
    }

    fn render_award_status(&mut self, series: &[ChartPoint]) {
        self.state.award_status = series.to_vec();
        self.state.chart_renders += 1;
    }

    fn render_year_counts(&mut self, series: &[ChartPoint]) {
        self.state.year_counts = series.to_vec();
        self.state.chart_renders += 1;
    }
}

impl TableView for RecordedViews {
    fn set_title(&mut self, title: &str) {
        self.state.table_title = title.to_string();
    }

    fn set_columns(&mut self, columns: &[TableColumn]) {
        self.state.columns = columns.to_vec();
    }

    fn set_rows(&mut self, rows: &[ProjectRecord]) {
        self.state.rows = rows.to_vec();
    }
}
