#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the highway plan dashboard.
//!
//! Loads the dashboard assets once and shares them between clients.
//! Every client gets its own [`DashboardSession`], keyed by a session id
//! cookie (or the `X-Dashboard-Session` header), so one client's filter
//! never leaks into another's. The frontend itself is served from
//! `app/dist`, and the map layers from the asset directory when assets
//! are local.

mod handlers;
pub mod interactive;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpServer, middleware, web};
use highway_plan_dashboard::config::AssetLocation;
use highway_plan_dashboard::loader::LoadedAssets;
use highway_plan_dashboard::{
    AssetSource, DashboardConfig, DashboardSession, LoadError, LoadStatus, RecordedViews,
};
use highway_plan_route_lookup::RouteLookupClient;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;

/// Sessions idle this long are dropped when new clients arrive.
const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// The outcome of the most recent server-wide load.
#[derive(Debug, Default)]
struct SharedLoad {
    status: LoadStatus,
    assets: Option<Arc<LoadedAssets>>,
    /// Bumped on every status change so sessions know to catch up.
    generation: u64,
}

struct ClientSession {
    session: DashboardSession<RecordedViews>,
    generation: u64,
    last_seen: Instant,
}

/// Shared application state.
pub struct AppState {
    config: DashboardConfig,
    shared: Mutex<SharedLoad>,
    sessions: Mutex<BTreeMap<String, ClientSession>>,
    /// Where assets are loaded from.
    pub assets: AssetSource,
    /// Route lookup client, if a service URL is configured.
    pub route_lookup: Option<RouteLookupClient>,
}

impl AppState {
    /// Builds the state for a configuration. No assets are loaded yet.
    ///
    /// # Errors
    ///
    /// * [`LoadError::InvalidSource`] if the asset URL does not parse
    pub fn new(config: DashboardConfig) -> Result<Self, LoadError> {
        let assets = AssetSource::from_location(&config.assets.location())?;
        let route_lookup = config.route_lookup.base_url.as_ref().map(|url| {
            RouteLookupClient::new(
                reqwest::Client::new(),
                url.clone(),
                &config.route_lookup.return_keys,
            )
        });
        if route_lookup.is_none() {
            log::warn!("No route lookup service configured; /api/route-info is disabled");
        }

        Ok(Self {
            config,
            shared: Mutex::new(SharedLoad::default()),
            sessions: Mutex::new(BTreeMap::new()),
            assets,
            route_lookup,
        })
    }

    /// Configuration every new session starts from.
    #[must_use]
    pub const fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Status of the server-wide load.
    #[must_use]
    pub fn load_status(&self) -> LoadStatus {
        self.shared().status.clone()
    }

    /// Number of live client sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions().len()
    }

    /// Runs `f` against the session for `id`, creating it on first use.
    ///
    /// The session first catches up with any load that finished since it
    /// was last used.
    pub fn with_session<R>(
        &self,
        id: &str,
        f: impl FnOnce(&mut DashboardSession<RecordedViews>) -> R,
    ) -> R {
        let mut sessions = self.sessions();
        let now = Instant::now();

        if !sessions.contains_key(id) {
            sessions.retain(|_, client| {
                now.duration_since(client.last_seen) < SESSION_IDLE_TIMEOUT
            });
            log::debug!("New dashboard session {id} ({} live)", sessions.len() + 1);
        }
        let client = sessions
            .entry(id.to_string())
            .or_insert_with(|| ClientSession {
                session: DashboardSession::new(self.config.clone(), RecordedViews::new()),
                generation: 0,
                last_seen: now,
            });

        {
            let shared = self.shared();
            if client.generation != shared.generation {
                client
                    .session
                    .adopt_load(shared.status.clone(), shared.assets.clone());
                client.generation = shared.generation;
            }
        }
        client.last_seen = now;

        f(&mut client.session)
    }

    /// Marks a server-wide load as started.
    ///
    /// # Errors
    ///
    /// * [`LoadError::InFlight`] if a load is already running
    fn begin_load(&self) -> Result<(), LoadError> {
        let mut shared = self.shared();
        if shared.status == LoadStatus::Loading {
            return Err(LoadError::InFlight);
        }
        log::info!("Loading dashboard assets");
        shared.status = LoadStatus::Loading;
        shared.generation += 1;
        Ok(())
    }

    /// Records the outcome of a load. A failure drops the previous
    /// assets.
    fn finish_load(&self, outcome: Result<LoadedAssets, LoadError>) -> Result<(), LoadError> {
        let mut shared = self.shared();
        shared.generation += 1;
        match outcome {
            Ok(assets) => {
                shared.status = LoadStatus::Ready;
                shared.assets = Some(Arc::new(assets));
                Ok(())
            }
            Err(e) => {
                log::error!("Dashboard load failed: {e}");
                shared.status = LoadStatus::Failed(e.to_string());
                shared.assets = None;
                Err(e)
            }
        }
    }

    fn shared(&self) -> MutexGuard<'_, SharedLoad> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sessions(&self) -> MutexGuard<'_, BTreeMap<String, ClientSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Server settings that are not part of the dashboard configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOptions {
    /// Address to bind.
    pub bind_addr: String,
    /// Port to listen on.
    pub port: u16,
    /// Asset directory replacing the configured asset location.
    pub data_dir: Option<PathBuf>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            port: DEFAULT_PORT,
            data_dir: None,
        }
    }
}

impl ServerOptions {
    /// Reads `BIND_ADDR` and `PORT`, falling back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            data_dir: None,
        }
    }

    /// Applies the options to a dashboard configuration.
    #[must_use]
    pub fn apply(&self, mut config: DashboardConfig) -> DashboardConfig {
        if let Some(dir) = &self.data_dir {
            config.assets.directory = Some(dir.clone());
            config.assets.base_url = None;
        }
        config
    }
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/state", web::get().to(handlers::state))
            .route("/options", web::get().to(handlers::options))
            .route("/filter/county", web::post().to(handlers::select_county))
            .route("/filter/county/at", web::post().to(handlers::select_county_at))
            .route("/filter/district", web::post().to(handlers::select_district))
            .route(
                "/filter/district/at",
                web::post().to(handlers::select_district_at),
            )
            .route(
                "/filter/project-type",
                web::post().to(handlers::select_project_type),
            )
            .route("/filter/clear", web::post().to(handlers::clear_current))
            .route("/filter/clear-all", web::post().to(handlers::clear_all))
            .route("/load", web::post().to(handlers::load))
            .route("/export/{format}", web::get().to(handlers::export))
            .route("/route-info", web::get().to(handlers::route_info)),
    );
}

/// Starts the highway plan dashboard server.
///
/// Reads the configuration, performs the initial asset load (a failure
/// is logged and can be retried through `POST /api/load`), and starts the
/// Actix-Web HTTP server. The caller provides the async runtime.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the configuration is invalid or
/// the HTTP server fails to bind or encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server(options: ServerOptions) -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config = DashboardConfig::load().map_err(|e| std::io::Error::other(e.to_string()))?;
    let config = options.apply(config);
    let asset_dir = match config.assets.location() {
        AssetLocation::Directory(dir) => Some(dir),
        AssetLocation::Url(_) => None,
    };

    let state =
        web::Data::new(AppState::new(config).map_err(|e| std::io::Error::other(e.to_string()))?);

    log::info!("Loading dashboard assets...");
    if let Err(e) = handlers::load_assets(&state).await {
        log::error!("Initial asset load failed: {e}; retry with POST /api/load");
    }

    let ServerOptions {
        bind_addr, port, ..
    } = options;

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        let mut app = App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure);

        // Serve map layers to the frontend
        if let Some(dir) = &asset_dir {
            app = app.service(Files::new("/data", dir.clone()));
        }

        // Serve frontend static files (production)
        app.service(Files::new("/", "app/dist").index_file("index.html"))
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
