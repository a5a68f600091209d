use std::sync::Arc;

use highway_plan_project_models::{
    AggregateResult, CountyRef, DistrictRef, FilterKind, FilterState, TableColumn,
};

use crate::config::DashboardConfig;
use crate::dispatcher::{self, Refresh};
use crate::export::{self, ExportError, ExportFormat};
use crate::filter;
use crate::loader::{AssetBundle, AssetSource, LoadStatus, LoadedAssets};
use crate::presentation::{feature_styles, push_result, push_titles};
use crate::titles::{DashboardTitles, titles_for};
use crate::views::{ChartView, MapView, ProjectLayer, TableView};
use crate::{FilterError, LoadError};

/// One user's dashboard: the active filter, the loaded assets, and the
/// views kept in sync with them.
///
/// Rejected input never changes the filter or touches the views. Every
/// accepted transition pushes titles, then pans the map (county and
/// district only), then refreshes the aggregate and pushes it to the
/// charts, table and map styling.
#[derive(Debug)]
pub struct DashboardSession<V> {
    config: DashboardConfig,
    filter: FilterState,
    titles: DashboardTitles,
    status: LoadStatus,
    assets: Option<Arc<LoadedAssets>>,
    last: Refresh,
    columns: Vec<TableColumn>,
    views: V,
}

impl<V: MapView + ChartView + TableView> DashboardSession<V> {
    /// Creates an unloaded session with no filter and the default
    /// column set.
    pub fn new(config: DashboardConfig, mut views: V) -> Self {
        let columns = TableColumn::defaults();
        views.set_columns(&columns);

        let last = dispatcher::refresh(None, &FilterState::None, config.table.row_limit);
        let mut session = Self {
            config,
            filter: FilterState::None,
            titles: DashboardTitles::default(),
            status: LoadStatus::Idle,
            assets: None,
            last,
            columns,
            views,
        };
        session.apply();
        session
    }

    #[must_use]
    pub const fn config(&self) -> &DashboardConfig {
        &self.config
    }

    #[must_use]
    pub const fn filter(&self) -> &FilterState {
        &self.filter
    }

    #[must_use]
    pub const fn titles(&self) -> &DashboardTitles {
        &self.titles
    }

    #[must_use]
    pub const fn load_status(&self) -> &LoadStatus {
        &self.status
    }

    /// Whether a load may be started. Disabled while one is in flight.
    #[must_use]
    pub const fn load_trigger_enabled(&self) -> bool {
        !matches!(self.status, LoadStatus::Loading)
    }

    /// The most recent aggregate.
    #[must_use]
    pub const fn last_result(&self) -> &AggregateResult {
        &self.last.result
    }

    #[must_use]
    pub const fn last_refresh(&self) -> &Refresh {
        &self.last
    }

    #[must_use]
    pub fn columns(&self) -> &[TableColumn] {
        &self.columns
    }

    #[must_use]
    pub const fn views(&self) -> &V {
        &self.views
    }

    pub const fn views_mut(&mut self) -> &mut V {
        &mut self.views
    }

    /// Replaces the visible column set. Exports follow it.
    pub fn set_columns(&mut self, columns: Vec<TableColumn>) {
        self.views.set_columns(&columns);
        self.columns = columns;
    }

    /// Filters by county, clearing any other filter.
    ///
    /// # Errors
    ///
    /// * [`FilterError::EmptyValue`] if `name` is blank
    pub fn select_county(&mut self, name: &str) -> Result<(), FilterError> {
        let next = filter::select_county(name)?;
        self.transition(next);
        Ok(())
    }

    /// Filters by district, clearing any other filter.
    ///
    /// # Errors
    ///
    /// * [`FilterError::InvalidDistrict`] if `number` is outside 1-12
    pub fn select_district(&mut self, number: i64) -> Result<(), FilterError> {
        let next = filter::select_district(number)?;
        self.transition(next);
        Ok(())
    }

    /// Filters by project-type category, clearing any other filter.
    ///
    /// # Errors
    ///
    /// * [`FilterError::EmptyValue`] if `category` is blank
    pub fn select_project_type(&mut self, category: &str) -> Result<(), FilterError> {
        let next = filter::select_project_type(category)?;
        self.transition(next);
        Ok(())
    }

    /// Selects the county whose boundary contains a map point.
    ///
    /// # Errors
    ///
    /// * [`FilterError::NotLoaded`] before the layers are loaded
    /// * [`FilterError::NoFeatureAt`] if no county contains the point
    pub fn select_county_at(&mut self, lng: f64, lat: f64) -> Result<(), FilterError> {
        let assets = self.assets.as_ref().ok_or(FilterError::NotLoaded)?;
        let county = assets
            .counties
            .locate(lng, lat)
            .ok_or(FilterError::NoFeatureAt {
                kind: FilterKind::County,
                lng,
                lat,
            })?
            .to_string();
        self.select_county(&county)
    }

    /// Selects the district whose boundary contains a map point.
    ///
    /// # Errors
    ///
    /// * [`FilterError::NotLoaded`] before the layers are loaded
    /// * [`FilterError::NoFeatureAt`] if no district contains the point
    /// * [`FilterError::InvalidInput`] or [`FilterError::InvalidDistrict`]
    ///   if the boundary's district value is not 1-12
    pub fn select_district_at(&mut self, lng: f64, lat: f64) -> Result<(), FilterError> {
        let assets = self.assets.as_ref().ok_or(FilterError::NotLoaded)?;
        let key = assets
            .districts
            .locate(lng, lat)
            .ok_or(FilterError::NoFeatureAt {
                kind: FilterKind::District,
                lng,
                lat,
            })?;
        let next = filter::parse_district(key)?;
        self.transition(next);
        Ok(())
    }

    /// Clears the filter if it is of `kind`; otherwise does nothing.
    pub fn clear_current(&mut self, kind: FilterKind) {
        let next = filter::clear_current(&self.filter, kind);
        if next != self.filter {
            self.transition(next);
        }
    }

    /// Clears whatever filter is active.
    pub fn clear_all(&mut self) {
        self.transition(FilterState::None);
    }

    /// Re-runs the aggregation for the current filter and pushes it to
    /// the views.
    pub fn refresh(&mut self) -> &AggregateResult {
        self.refresh_views();
        &self.last.result
    }

    /// Marks a load as started.
    ///
    /// # Errors
    ///
    /// * [`LoadError::InFlight`] if a load is already running
    pub fn begin_load(&mut self) -> Result<(), LoadError> {
        if !self.load_trigger_enabled() {
            return Err(LoadError::InFlight);
        }
        log::info!("Loading dashboard assets");
        self.status = LoadStatus::Loading;
        Ok(())
    }

    /// Completes a load with the fetched bundle or the fetch error.
    ///
    /// On success the parsed assets replace any previous ones and the
    /// current filter is applied to them. On failure the previous assets
    /// are dropped, so nothing stale stays queryable, and the error is
    /// returned after being recorded in the load status.
    ///
    /// # Errors
    ///
    /// * [`LoadError::NotStarted`] if [`Self::begin_load`] was not called
    ///   first; the session is left unchanged
    /// * the fetch or parse error
    pub fn finish_load(&mut self, bundle: Result<AssetBundle, LoadError>) -> Result<(), LoadError> {
        if self.status != LoadStatus::Loading {
            log::warn!("Ignoring load completion while {:?}", self.status);
            return Err(LoadError::NotStarted);
        }

        let parsed = bundle.and_then(|bundle| LoadedAssets::parse(&bundle, &self.config.layers));
        match parsed {
            Ok(assets) => {
                assets.log_summary();
                self.adopt_load(LoadStatus::Ready, Some(Arc::new(assets)));
                Ok(())
            }
            Err(e) => {
                log::error!("Dashboard load failed: {e}");
                self.adopt_load(LoadStatus::Failed(e.to_string()), None);
                Err(e)
            }
        }
    }

    /// Adopts the outcome of a load run outside this session, such as
    /// assets shared between several sessions, and re-applies the
    /// current filter to it.
    pub fn adopt_load(&mut self, status: LoadStatus, assets: Option<Arc<LoadedAssets>>) {
        self.status = status;
        self.assets = assets;
        self.apply();
    }

    /// Fetches every asset from `source` and installs them.
    ///
    /// # Errors
    ///
    /// * [`LoadError::InFlight`] if a load is already running
    /// * any fetch or parse error, which is also recorded in the status
    pub async fn load(&mut self, source: &AssetSource) -> Result<(), LoadError> {
        self.begin_load()?;
        let bundle = AssetBundle::fetch(source, &self.config.assets).await;
        self.finish_load(bundle)
    }

    /// Serializes the table's loaded rows with the visible columns.
    ///
    /// # Errors
    ///
    /// Returns an [`ExportError`] if serialization fails.
    pub fn export(&self, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
        export::export(format, &self.columns, &self.last.result.rows)
    }

    /// Project-type categories and display names for a picker.
    #[must_use]
    pub fn project_types(&self) -> Vec<(String, String)> {
        self.assets
            .as_ref()
            .map(|assets| assets.store.project_types())
            .unwrap_or_default()
    }

    /// County reference rows for a picker.
    #[must_use]
    pub fn counties(&self) -> Vec<CountyRef> {
        self.assets
            .as_ref()
            .map(|assets| assets.store.counties())
            .unwrap_or_default()
    }

    /// District reference rows for a picker.
    #[must_use]
    pub fn districts(&self) -> Vec<DistrictRef> {
        self.assets
            .as_ref()
            .map(|assets| assets.store.districts())
            .unwrap_or_default()
    }

    fn transition(&mut self, next: FilterState) {
        log::debug!("Filter {:?} -> {next:?}", self.filter);
        self.filter = next;
        self.apply();
    }

    fn apply(&mut self) {
        self.update_titles();
        self.pan();
        self.refresh_views();
    }

    fn update_titles(&mut self) {
        let store = self.assets.as_ref().map(|assets| &assets.store);
        let titles = titles_for(&self.filter, |category| {
            store.map_or_else(
                || category.to_string(),
                |store| store.lookup_display_name(category),
            )
        });
        push_titles(&mut self.views, &titles);
        self.titles = titles;
    }

    fn pan(&mut self) {
        let Some(assets) = &self.assets else {
            return;
        };
        let (index, key) = match &self.filter {
            FilterState::County(name) => (&assets.counties, name.clone()),
            FilterState::District(district) => (&assets.districts, district.to_string()),
            FilterState::None | FilterState::ProjectType(_) => return,
        };

        match index.bounds_for(&key) {
            Ok(bounds) => self.views.fit_bounds(bounds),
            Err(e) => log::info!("{e}; map not panned"),
        }
    }

    fn refresh_views(&mut self) {
        let store = self.assets.as_ref().map(|assets| &assets.store);
        self.last = dispatcher::refresh(store, &self.filter, self.config.table.row_limit);
        push_result(&mut self.views, &self.last.result);
        self.style_map();
    }

    fn style_map(&mut self) {
        let Some(assets) = &self.assets else {
            return;
        };
        let store = &assets.store;
        let classify = |code: &str| store.category_for_code(code).map(str::to_string);

        let current = feature_styles(
            &self.filter,
            &assets.current_projects,
            &self.config.layers,
            classify,
        );
        let awarded = feature_styles(
            &self.filter,
            &assets.awarded_projects,
            &self.config.layers,
            classify,
        );
        self.views.style_features(ProjectLayer::Current, &current);
        self.views.style_features(ProjectLayer::Awarded, &awarded);
    }
}

#[cfg(test)]
mod tests {
    use highway_plan_dataset::snapshot::{SnapshotContents, write_snapshot};
    use highway_plan_project_models::{
        AwardStatusCounts, BoundingBox, CountyRef, CrosswalkEntry, District, DistrictRef,
        ProjectRecord, YearCount,
    };
    use serde_json::json;

    use super::*;
    use crate::RecordedViews;
    use crate::views::FeatureStyle;

    const FAYETTE: [[f64; 2]; 5] = [
        [-84.7, 37.9],
        [-84.3, 37.9],
        [-84.3, 38.2],
        [-84.7, 38.2],
        [-84.7, 37.9],
    ];
    const JEFFERSON: [[f64; 2]; 5] = [
        [-85.9, 38.0],
        [-85.4, 38.0],
        [-85.4, 38.4],
        [-85.9, 38.4],
        [-85.9, 38.0],
    ];

    fn project(
        item_no: &str,
        district: i32,
        county: &str,
        plan_year: i32,
        type_of_work: &str,
        awarded: bool,
    ) -> ProjectRecord {
        ProjectRecord {
            item_no: item_no.to_string(),
            district,
            county: county.to_string(),
            route: "US-60".to_string(),
            plan_year,
            type_of_work: type_of_work.to_string(),
            awarded,
            description: format!("{type_of_work} in {county}"),
            begin_mp: Some(0.0),
            end_mp: Some(2.5),
            est_cost: Some(1_000_000.0),
        }
    }

    fn crosswalk(raw_code: &str, category: &str, display_name: &str) -> CrosswalkEntry {
        CrosswalkEntry {
            raw_code: raw_code.to_string(),
            category: category.to_string(),
            display_name: display_name.to_string(),
        }
    }

    fn contents() -> SnapshotContents {
        SnapshotContents {
            projects: vec![
                project("7-100", 7, "Fayette", 2024, "RESURFACING", true),
                project("7-101", 7, "Fayette", 2025, "BRIDGE REPLACEMENT", false),
                project("5-200", 5, "Jefferson", 2024, "RESURFACING", true),
            ],
            crosswalk: vec![
                crosswalk("RESURFACING", "PAVEMENT", "Pavement Resurfacing"),
                crosswalk("BRIDGE REPLACEMENT", "BRIDGE", "Bridge Work"),
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

    fn polygon(properties: serde_json::Value, ring: [[f64; 2]; 5]) -> serde_json::Value {
        json!({
            "type": "Feature",
            "geometry": { "type": "Polygon", "coordinates": [ring] },
            "properties": properties
        })
    }

    fn line(county: &str, district: i64, work_type: &str) -> serde_json::Value {
        json!({
            "type": "Feature",
            "geometry": { "type": "LineString", "coordinates": [[-84.5, 38.0], [-84.45, 38.05]] },
            "properties": { "COUNTY": county, "DISTRICT": district, "TYPE_OF_WORK": work_type }
        })
    }

    fn collection(features: Vec<serde_json::Value>) -> Vec<u8> {
        serde_json::to_vec(&json!({ "type": "FeatureCollection", "features": features })).unwrap()
    }

    fn snapshot_bytes() -> Vec<u8> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.duckdb");
        write_snapshot(&path, &contents(), true).unwrap();
        std::fs::read(path).unwrap()
    }

    fn bundle() -> AssetBundle {
        AssetBundle {
            snapshot: snapshot_bytes(),
            current_projects: collection(vec![line("FAYETTE", 7, "BRIDGE REPLACEMENT")]),
            awarded_projects: collection(vec![
                line("FAYETTE", 7, "RESURFACING"),
                line("JEFFERSON", 5, "RESURFACING"),
            ]),
            counties: collection(vec![
                polygon(json!({ "NAME": "Fayette" }), FAYETTE),
                polygon(json!({ "NAME": "Jefferson" }), JEFFERSON),
            ]),
            districts: collection(vec![
                polygon(json!({ "DISTRICT": 7 }), FAYETTE),
                polygon(json!({ "DISTRICT": 5 }), JEFFERSON),
            ]),
        }
    }

    fn unloaded() -> DashboardSession<RecordedViews> {
        DashboardSession::new(DashboardConfig::embedded().unwrap(), RecordedViews::new())
    }

    fn loaded() -> DashboardSession<RecordedViews> {
        let mut session = unloaded();
        session.begin_load().unwrap();
        session.finish_load(Ok(bundle())).unwrap();
        session
    }

    #[test]
    fn county_filter_end_to_end() {
        let mut session = loaded();

        session.select_county("Fayette").unwrap();

        let result = session.last_result();
        assert_eq!(
            result.award_status,
            AwardStatusCounts {
                awarded: 1,
                current: 1
            }
        );
        assert_eq!(
            result.year_counts,
            vec![
                YearCount {
                    year: 2024,
                    count: 1
                },
                YearCount {
                    year: 2025,
                    count: 1
                }
            ]
        );
        assert_eq!(result.rows.len(), 2);

        let state = session.views().state();
        assert_eq!(state.panel_title, "Projects in Fayette County");
        assert_eq!(state.table_title, "Highway Projects Data in Fayette County");
        assert_eq!(state.rows.len(), 2);
        assert_eq!(
            state.bounds,
            Some(BoundingBox::new(-84.7, 37.9, -84.3, 38.2))
        );
        assert_eq!(state.current_styles, vec![FeatureStyle::Visible]);
        assert_eq!(
            state.awarded_styles,
            vec![FeatureStyle::Visible, FeatureStyle::Hidden]
        );
    }

    #[test]
    fn unknown_project_type_yields_no_data() {
        let mut session = loaded();

        session
            .select_project_type("Unknown Category Display Name")
            .unwrap();

        let result = session.last_result();
        assert_eq!(result.award_status, AwardStatusCounts::default());
        assert!(result.year_counts.is_empty());
        assert!(result.rows.is_empty());

        let state = session.views().state();
        assert_eq!(
            state.table_title,
            "Highway Projects Data (Unknown Category Display Name)"
        );
        assert_eq!(state.panel_title, "Projects");
        assert!(state.award_status.is_empty());
        assert!(state.year_counts.is_empty());
        assert!(state.rows.is_empty());
        assert_eq!(state.bounds, None);
        assert_eq!(state.awarded_styles, vec![FeatureStyle::DIMMED; 2]);
    }

    #[test]
    fn project_type_dims_other_work_and_uses_display_name() {
        let mut session = loaded();

        session.select_project_type("BRIDGE").unwrap();

        assert_eq!(
            session.last_result().award_status,
            AwardStatusCounts {
                awarded: 0,
                current: 1
            }
        );
        let state = session.views().state();
        assert_eq!(state.table_title, "Highway Projects Data (Bridge Work)");
        assert_eq!(state.current_styles, vec![FeatureStyle::Visible]);
        assert_eq!(state.awarded_styles, vec![FeatureStyle::DIMMED; 2]);
        assert_eq!(state.bounds, None);
    }

    #[test]
    fn selecting_a_district_replaces_the_county() {
        let mut session = loaded();

        session.select_county("Fayette").unwrap();
        session.select_district(7).unwrap();

        assert_eq!(
            *session.filter(),
            FilterState::District(District::new(7).unwrap())
        );
        assert_eq!(session.views().state().panel_title, "Projects in District 7");
    }

    #[test]
    fn district_counts_match_row_counts() {
        let mut session = loaded();

        for n in 1..=12 {
            session.select_district(n).unwrap();
            let result = session.last_result();
            assert_eq!(
                usize::try_from(result.award_status.total()).unwrap(),
                result.rows.len(),
                "district {n}"
            );
        }
    }

    #[test]
    fn invalid_district_leaves_everything_unchanged() {
        let mut session = loaded();
        session.select_county("Fayette").unwrap();
        let before = session.views().state().clone();

        assert!(matches!(
            session.select_district(0),
            Err(FilterError::InvalidDistrict(_))
        ));
        assert!(session.select_district(13).is_err());

        assert_eq!(*session.filter(), FilterState::County("Fayette".to_string()));
        assert_eq!(*session.views().state(), before);
    }

    #[test]
    fn clear_all_restores_base_titles() {
        let mut session = loaded();

        session.select_project_type("PAVEMENT").unwrap();
        session.clear_all();

        assert!(session.filter().is_none());
        let state = session.views().state();
        assert_eq!(state.panel_title, "Projects");
        assert_eq!(state.table_title, "Highway Projects Data");
        assert_eq!(state.rows.len(), 3);
        assert_eq!(state.awarded_styles, vec![FeatureStyle::Visible; 2]);
    }

    #[test]
    fn clear_current_ignores_other_kinds() {
        let mut session = loaded();

        session.select_county("Fayette").unwrap();
        let renders = session.views().state().chart_renders;

        session.clear_current(FilterKind::District);
        assert_eq!(*session.filter(), FilterState::County("Fayette".to_string()));
        assert_eq!(session.views().state().chart_renders, renders);

        session.clear_current(FilterKind::County);
        assert!(session.filter().is_none());
    }

    #[test]
    fn refresh_is_idempotent() {
        let mut session = loaded();
        session.select_district(7).unwrap();

        let first = session.refresh().clone();
        let second = session.refresh().clone();
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_county_still_filters_without_panning() {
        let mut session = loaded();

        session.select_county("Nonexistent County").unwrap();

        assert_eq!(
            *session.filter(),
            FilterState::County("Nonexistent County".to_string())
        );
        assert!(session.last_result().is_empty());
        assert_eq!(session.views().state().bounds, None);
    }

    #[test]
    fn county_key_lookup_tolerates_case() {
        let mut session = loaded();

        session.select_county("FAYETTE").unwrap();

        assert_eq!(session.last_result().rows.len(), 2);
        assert_eq!(
            session.views().state().bounds,
            Some(BoundingBox::new(-84.7, 37.9, -84.3, 38.2))
        );
    }

    #[test]
    fn map_clicks_select_boundaries() {
        let mut session = loaded();

        session.select_county_at(-85.6, 38.2).unwrap();
        assert_eq!(*session.filter(), FilterState::County("Jefferson".to_string()));

        session.select_district_at(-84.5, 38.0).unwrap();
        assert_eq!(
            *session.filter(),
            FilterState::District(District::new(7).unwrap())
        );

        assert!(matches!(
            session.select_county_at(0.0, 0.0),
            Err(FilterError::NoFeatureAt { .. })
        ));
    }

    #[test]
    fn filters_before_load_are_empty() {
        let mut session = unloaded();

        session.select_county("Fayette").unwrap();

        assert!(session.last_result().is_empty());
        assert_eq!(
            session.views().state().panel_title,
            "Projects in Fayette County"
        );
        assert!(matches!(
            session.select_county_at(-84.5, 38.0),
            Err(FilterError::NotLoaded)
        ));
    }

    #[test]
    fn load_reapplies_current_filter() {
        let mut session = unloaded();
        session.select_county("Fayette").unwrap();

        session.begin_load().unwrap();
        session.finish_load(Ok(bundle())).unwrap();

        assert_eq!(*session.load_status(), LoadStatus::Ready);
        assert_eq!(session.last_result().rows.len(), 2);
        assert!(session.views().state().bounds.is_some());
    }

    #[test]
    fn second_load_is_rejected_while_in_flight() {
        let mut session = unloaded();

        session.begin_load().unwrap();
        assert!(!session.load_trigger_enabled());
        assert!(matches!(session.begin_load(), Err(LoadError::InFlight)));
        assert_eq!(*session.load_status(), LoadStatus::Loading);
    }

    #[test]
    fn finishing_an_unstarted_load_is_rejected() {
        let mut session = unloaded();

        let result = session.finish_load(Ok(bundle()));

        assert!(matches!(result, Err(LoadError::NotStarted)));
        assert_eq!(*session.load_status(), LoadStatus::Idle);
        assert!(session.last_result().is_empty());
        assert!(session.project_types().is_empty());
    }

    #[test]
    fn sessions_share_assets_but_not_filters() {
        let config = DashboardConfig::embedded().unwrap();
        let assets = Arc::new(LoadedAssets::parse(&bundle(), &config.layers).unwrap());
        let mut first = unloaded();
        let mut second = unloaded();
        first.adopt_load(LoadStatus::Ready, Some(Arc::clone(&assets)));
        second.adopt_load(LoadStatus::Ready, Some(assets));

        first.select_county("Fayette").unwrap();
        second.select_district(5).unwrap();

        assert_eq!(first.last_result().rows.len(), 2);
        assert_eq!(second.last_result().rows.len(), 1);
        assert_eq!(first.titles().panel, "Projects in Fayette County");
        assert_eq!(*first.filter(), FilterState::County("Fayette".to_string()));
    }

    #[test]
    fn failed_load_drops_previous_assets() {
        let mut session = loaded();
        assert_eq!(session.last_result().rows.len(), 3);

        session.begin_load().unwrap();
        let mut broken = bundle();
        broken.snapshot = b"not a database".to_vec();
        assert!(session.finish_load(Ok(broken)).is_err());

        assert!(matches!(session.load_status(), LoadStatus::Failed(_)));
        assert!(session.load_trigger_enabled());
        assert!(session.last_result().is_empty());
        assert!(session.views().state().rows.is_empty());
        assert!(session.project_types().is_empty());
    }

    #[test]
    fn fetch_failure_is_recorded() {
        let mut session = unloaded();
        session.begin_load().unwrap();

        let result = session.finish_load(Err(LoadError::Fetch {
            asset: "counties.geojson".to_string(),
            message: "connection refused".to_string(),
        }));

        assert!(result.is_err());
        let LoadStatus::Failed(message) = session.load_status() else {
            panic!("expected a failed status");
        };
        assert!(message.contains("counties.geojson"));
    }

    #[tokio::test]
    async fn loads_from_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = DashboardConfig::embedded().unwrap();
        let assets = bundle();
        for (name, bytes) in [
            (&config.assets.snapshot, &assets.snapshot),
            (&config.assets.current_projects, &assets.current_projects),
            (&config.assets.awarded_projects, &assets.awarded_projects),
            (&config.assets.counties, &assets.counties),
            (&config.assets.districts, &assets.districts),
        ] {
            std::fs::write(dir.path().join(name), bytes).unwrap();
        }

        let mut session = DashboardSession::new(config, RecordedViews::new());
        session
            .load(&AssetSource::Directory(dir.path().to_path_buf()))
            .await
            .unwrap();

        assert_eq!(*session.load_status(), LoadStatus::Ready);
        assert_eq!(session.last_result().award_status.total(), 3);
        assert_eq!(
            session.project_types(),
            vec![
                ("BRIDGE".to_string(), "Bridge Work".to_string()),
                ("PAVEMENT".to_string(), "Pavement Resurfacing".to_string()),
            ]
        );
        assert_eq!(session.counties().len(), 2);
        assert_eq!(session.districts()[1].district_name, "Lexington");
    }

    #[test]
    fn export_follows_filter_and_columns() {
        let mut session = loaded();
        session.select_county("Jefferson").unwrap();

        let columns: Vec<TableColumn> = TableColumn::defaults().into_iter().take(3).collect();
        session.set_columns(columns.clone());
        assert_eq!(session.views().state().columns, columns);

        let csv = String::from_utf8(session.export(ExportFormat::Csv).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "5-200,5,Jefferson");
    }
}
