//! HTTP handler functions for the highway plan API.

use std::future::{Ready, ready};

use actix_web::cookie::Cookie;
use actix_web::dev::Payload;
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::{FromRequest, HttpRequest, HttpResponse, web};
use highway_plan_dashboard::dispatcher::RefreshSources;
use highway_plan_dashboard::loader::LoadedAssets;
use highway_plan_dashboard::titles::DashboardTitles;
use highway_plan_dashboard::{
    AssetBundle, DashboardSession, ExportFormat, FilterError, LoadError, LoadStatus,
    RecordedViews, ViewState,
};
use highway_plan_project_models::FilterState;
use highway_plan_route_lookup::{RouteLookupError, RouteSegmentQuery};
use highway_plan_server_models::{
    ApiError, ApiFilterOptions, ApiHealth, ApiProjectType, ApiRouteInfo, ClearParams,
    CountyParams, DistrictParams, PointParams, ProjectTypeParams,
};
use serde::Serialize;

use crate::AppState;

const SESSION_COOKIE: &str = "highway_plan_session";
const SESSION_HEADER: &str = "x-dashboard-session";

const MAX_SESSION_ID_LEN: usize = 64;

/// The dashboard session a request belongs to.
///
/// Read from the `X-Dashboard-Session` header, then the session cookie.
/// Requests carrying neither get a fresh id, which is handed back as a
/// cookie.
#[derive(Debug, Clone)]
pub struct ClientId {
    id: String,
    issued: bool,
}

impl ClientId {
    fn presented(req: &HttpRequest) -> Option<String> {
        req.headers()
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .or_else(|| req.cookie(SESSION_COOKIE).map(|c| c.value().to_string()))
            .filter(|id| !id.trim().is_empty() && id.len() <= MAX_SESSION_ID_LEN)
    }

    /// Tags a response with the session id, setting the cookie when the
    /// id was issued by this request.
    fn attach(&self, mut response: HttpResponse) -> HttpResponse {
        if self.issued {
            let cookie = Cookie::build(SESSION_COOKIE, self.id.clone())
                .path("/")
                .http_only(true)
                .finish();
            if let Err(e) = response.add_cookie(&cookie) {
                log::warn!("Failed to set session cookie: {e}");
            }
        }
        if let Ok(value) = HeaderValue::from_str(&self.id) {
            response
                .headers_mut()
                .insert(HeaderName::from_static(SESSION_HEADER), value);
        }
        response
    }
}

impl FromRequest for ClientId {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let client = Self::presented(req).map_or_else(
            || Self {
                id: uuid::Uuid::new_v4().to_string(),
                issued: true,
            },
            |id| Self { id, issued: false },
        );
        ready(Ok(client))
    }
}

/// Everything the frontend needs to render the dashboard.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiSession<'a> {
    session_id: &'a str,
    filter: &'a FilterState,
    load_status: &'a LoadStatus,
    load_trigger_enabled: bool,
    titles: &'a DashboardTitles,
    sources: RefreshSources,
    view: &'a ViewState,
}

fn session_response(
    client: &ClientId,
    session: &DashboardSession<RecordedViews>,
) -> HttpResponse {
    client.attach(HttpResponse::Ok().json(ApiSession {
        session_id: &client.id,
        filter: session.filter(),
        load_status: session.load_status(),
        load_trigger_enabled: session.load_trigger_enabled(),
        titles: session.titles(),
        sources: session.last_refresh().sources,
        view: session.views().state(),
    }))
}

fn filter_error(e: &FilterError) -> HttpResponse {
    let body = ApiError::new(e);
    match e {
        FilterError::NotLoaded => HttpResponse::Conflict().json(body),
        FilterError::NoFeatureAt { .. } => HttpResponse::NotFound().json(body),
        FilterError::InvalidDistrict(_)
        | FilterError::EmptyValue { .. }
        | FilterError::InvalidInput { .. } => HttpResponse::BadRequest().json(body),
    }
}

fn filter_result(
    state: &AppState,
    client: &ClientId,
    apply: impl FnOnce(&mut DashboardSession<RecordedViews>) -> Result<(), FilterError>,
) -> HttpResponse {
    state.with_session(&client.id, |session| match apply(session) {
        Ok(()) => session_response(client, session),
        Err(e) => {
            log::debug!("Rejected filter input: {e}");
            client.attach(filter_error(&e))
        }
    })
}

/// Runs a server-wide load. No lock is held while fetching; sessions
/// pick up the outcome on their next request.
pub async fn load_assets(state: &AppState) -> Result<(), LoadError> {
    state.begin_load()?;

    let config = state.config();
    let outcome = match AssetBundle::fetch(&state.assets, &config.assets).await {
        Ok(bundle) => LoadedAssets::parse(&bundle, &config.layers),
        Err(e) => Err(e),
    };
    if let Ok(assets) = &outcome {
        assets.log_summary();
    }
    state.finish_load(outcome)
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/state`
pub async fn state(state: web::Data<AppState>, client: ClientId) -> HttpResponse {
    state.with_session(&client.id, |session| session_response(&client, session))
}

/// `GET /api/options`
///
/// Counties, districts and project types for the filter pickers.
pub async fn options(state: web::Data<AppState>, client: ClientId) -> HttpResponse {
    let options = state.with_session(&client.id, |session| ApiFilterOptions {
        counties: session.counties(),
        districts: session.districts(),
        project_types: session
            .project_types()
            .into_iter()
            .map(|(key, display_name)| ApiProjectType { key, display_name })
            .collect(),
    });
    client.attach(HttpResponse::Ok().json(options))
}

/// `POST /api/filter/county`
pub async fn select_county(
    state: web::Data<AppState>,
    client: ClientId,
    body: web::Json<CountyParams>,
) -> HttpResponse {
    filter_result(&state, &client, |session| session.select_county(&body.name))
}

/// `POST /api/filter/county/at`
pub async fn select_county_at(
    state: web::Data<AppState>,
    client: ClientId,
    body: web::Json<PointParams>,
) -> HttpResponse {
    filter_result(&state, &client, |session| {
        session.select_county_at(body.lng, body.lat)
    })
}

/// `POST /api/filter/district`
pub async fn select_district(
    state: web::Data<AppState>,
    client: ClientId,
    body: web::Json<DistrictParams>,
) -> HttpResponse {
    filter_result(&state, &client, |session| {
        session.select_district(body.district)
    })
}

/// `POST /api/filter/district/at`
pub async fn select_district_at(
    state: web::Data<AppState>,
    client: ClientId,
    body: web::Json<PointParams>,
) -> HttpResponse {
    filter_result(&state, &client, |session| {
        session.select_district_at(body.lng, body.lat)
    })
}

/// `POST /api/filter/project-type`
pub async fn select_project_type(
    state: web::Data<AppState>,
    client: ClientId,
    body: web::Json<ProjectTypeParams>,
) -> HttpResponse {
    filter_result(&state, &client, |session| {
        session.select_project_type(&body.category)
    })
}

/// `POST /api/filter/clear`
pub async fn clear_current(
    state: web::Data<AppState>,
    client: ClientId,
    body: web::Json<ClearParams>,
) -> HttpResponse {
    state.with_session(&client.id, |session| {
        session.clear_current(body.kind);
        session_response(&client, session)
    })
}

/// `POST /api/filter/clear-all`
pub async fn clear_all(state: web::Data<AppState>, client: ClientId) -> HttpResponse {
    state.with_session(&client.id, |session| {
        session.clear_all();
        session_response(&client, session)
    })
}

/// `POST /api/load`
///
/// Re-fetches every asset for all sessions. Rejected while another load
/// is in flight.
pub async fn load(state: web::Data<AppState>, client: ClientId) -> HttpResponse {
    match load_assets(&state).await {
        Ok(()) => state.with_session(&client.id, |session| session_response(&client, session)),
        Err(LoadError::InFlight) => client.attach(
            HttpResponse::Conflict().json(ApiError::new(LoadError::InFlight)),
        ),
        Err(e) => client.attach(HttpResponse::BadGateway().json(ApiError::new(e))),
    }
}

/// `GET /api/export/{format}`
///
/// Downloads the session's loaded table rows as CSV, JSON or XLSX.
pub async fn export(
    state: web::Data<AppState>,
    client: ClientId,
    format: web::Path<String>,
) -> HttpResponse {
    let Ok(format) = format.parse::<ExportFormat>() else {
        return HttpResponse::BadRequest().json(ApiError::new(format!(
            "Unsupported export format '{format}'"
        )));
    };

    let result = state.with_session(&client.id, |session| session.export(format));
    let response = match result {
        Ok(bytes) => HttpResponse::Ok()
            .content_type(format.content_type())
            .insert_header((
                "Content-Disposition",
                format!(
                    "attachment; filename=\"highway_projects.{}\"",
                    format.extension()
                ),
            ))
            .body(bytes),
        Err(e) => {
            log::error!("Failed to export {format}: {e}");
            HttpResponse::InternalServerError().json(ApiError::new(e))
        }
    };
    client.attach(response)
}

/// `GET /api/route-info`
///
/// Looks up a route segment by unique id and milepoint range.
pub async fn route_info(
    state: web::Data<AppState>,
    params: web::Query<RouteSegmentQuery>,
) -> HttpResponse {
    let Some(client) = &state.route_lookup else {
        return HttpResponse::ServiceUnavailable()
            .json(ApiError::new("Route lookup is not configured"));
    };

    let info = match client.lookup(&params).await {
        Ok(info) => info,
        Err(e) => {
            log::warn!("Route lookup for {} failed: {e}", params.unique_id);
            let body = ApiError::new(&e);
            return match e {
                RouteLookupError::InvalidRange { .. } => HttpResponse::BadRequest().json(body),
                RouteLookupError::NoRecords => HttpResponse::NotFound().json(body),
                RouteLookupError::Http(_)
                | RouteLookupError::Status { .. }
                | RouteLookupError::Parse { .. }
                | RouteLookupError::InvalidUrl { .. } => HttpResponse::BadGateway().json(body),
            };
        }
    };

    match info.summary(client.return_keys()) {
        Ok(summary) => HttpResponse::Ok().json(ApiRouteInfo {
            summary,
            bridges: info.bridge_ids(),
            license: info.license,
            records: info.records,
        }),
        Err(e) => HttpResponse::NotFound().json(ApiError::new(e)),
    }
}
