//! # Gateway Admin
//!
//! A thin administrative surface around `gateway-core`: a `rusqlite`-backed
//! `ConfigStore` for route CRUD, and a demonstration endpoint that exercises
//! the full request path a real data plane would follow —
//! `Match → BuildKey → Get → (forward stub) → Set`.
//!
//! ## Architecture
//!
//! - **Actix Web**: HTTP server framework for the admin REST surface
//! - **SQLite**: persistent storage for route configuration, via
//!   `module::config_store::SqliteConfigStore`
//! - **`gateway-core`**: the route registry, response cache and refresh
//!   coordinator this binary wires together but does not reimplement
//! - **CORS support**: permissive by default, suitable for local development
//!
//! ## Endpoints
//!
//! - `/api/v1/routes` — list/create routes
//! - `/api/v1/routes/{slug}` — get/delete a route by slug
//! - `/api/v1/routes/refresh` — trigger a full registry reload from the store
//! - `/gateway/{tail:.*}` — demonstration forward path through the cache

mod api;
mod config;
mod error;
mod module;

use std::path::PathBuf;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::{middleware, web, App, HttpServer};
use gateway_core::{CancellationToken, ConfigStore, InMemoryKvStore, RefreshCoordinator, ResponseCache, RouteRegistry};

use module::config_store::SqliteConfigStore;

/// Shared state handed to every handler via `web::Data`.
pub struct AppState {
    pub registry: Arc<RouteRegistry>,
    pub config_store: Arc<dyn ConfigStore>,
    pub refresh: Arc<RefreshCoordinator>,
    pub cache: Arc<ResponseCache>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    std::env::set_var("RUST_LOG", "info");
    env_logger::init();
    config::init();

    let matches = clap::Command::new("gateway-admin")
        .version("0.0.1-pre")
        .about("Administrative REST surface for the mini gateway routing core")
        .arg(
            clap::Arg::new("ip")
                .long("ip")
                .help("IP address to bind the server to")
                .value_name("IP")
                .default_value("127.0.0.1"),
        )
        .arg(
            clap::Arg::new("port")
                .long("port")
                .help("Port number to bind the server to")
                .value_name("PORT")
                .default_value("30098")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            clap::Arg::new("db")
                .long("db")
                .help("Path to the SQLite database file")
                .value_name("PATH")
                .default_value("./data/gateway-admin.sqlite3"),
        )
        .arg(
            clap::Arg::new("no-cache")
                .long("no-cache")
                .help("Run with the response cache disabled")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let ip = matches.get_one::<String>("ip").unwrap();
    let port = matches.get_one::<u16>("port").unwrap();
    let db_path = PathBuf::from(matches.get_one::<String>("db").unwrap());
    let cache_disabled = matches.get_flag("no-cache");
    let bind_address = format!("{}:{}", ip, port);

    log::info!("Opening route store at {}...", db_path.display());
    let config_store: Arc<dyn ConfigStore> = Arc::new(SqliteConfigStore::open(&db_path)?);

    let registry = Arc::new(RouteRegistry::new());
    let refresh = Arc::new(RefreshCoordinator::new(registry.clone(), config_store.clone()));

    log::info!("Loading active routes into the registry...");
    match refresh.refresh(&CancellationToken::new()).await {
        Ok(outcome) => log::info!("Initial refresh installed {} routes ({} errors)", outcome.installed, outcome.errors),
        Err(e) => log::warn!("Initial refresh failed, starting with an empty registry: {}", e),
    }

    let kv_store = if cache_disabled { InMemoryKvStore::disabled() } else { InMemoryKvStore::new() };
    let cache = Arc::new(ResponseCache::new(Arc::new(kv_store)));

    let state = web::Data::new(AppState { registry, config_store, refresh, cache });

    log::info!("Starting HTTP server on {}...", bind_address);
    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
            .allowed_headers(vec![header::AUTHORIZATION, header::ACCEPT, header::CONTENT_TYPE])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .configure(api::configure)
    })
    .bind(&bind_address)?
    .workers(2)
    .run()
    .await?;

    Ok(())
}
