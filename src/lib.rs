pub mod api;
pub mod catalog;
pub mod config;
pub mod db;
pub mod listing;
pub mod middleware;
pub mod server;
pub mod session;
pub mod spell;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use config::StoreLocation;
use db::Repository;

const DEFAULT_DATA_DIR: &str = "./data";

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Database error: {0}")]
    Database(#[from] db::DbError),
    #[error("Server error: {0}")]
    Server(String),
}

async fn open_store(config: &config::Config) -> Result<Arc<dyn Repository>, ServerError> {
    let location = config
        .get_store_location()
        .unwrap_or_else(|| StoreLocation::Json(PathBuf::from(DEFAULT_DATA_DIR)));

    let store: Arc<dyn Repository> = match location {
        StoreLocation::Sqlite(path) => {
            info!("Opening database at {}", path);
            Arc::new(db::SqliteRepository::new(&path).await?)
        }
        StoreLocation::Json(dir) => Arc::new(db::JsonStore::new(dir).await?),
    };
    Ok(store)
}

fn load_speller(config: &config::Config) -> Option<Arc<spell::SpellChecker>> {
    let path = config.search.dictionary.as_deref()?;
    match spell::SpellChecker::load(Path::new(path)) {
        Ok(speller) => Some(Arc::new(speller)),
        Err(e) => {
            warn!("Spell checker unavailable, failed to load {}: {}", path, e);
            None
        }
    }
}

pub async fn run(config_path: &str, debug_logs: bool) -> Result<(), ServerError> {
    let mut config = config::Config::from_file(config_path)?;
    config.debug_logs = debug_logs;

    info!("Using config file: {}", config_path);
    if debug_logs {
        info!("Debug logging enabled");
    }

    let store = open_store(&config).await?;
    info!("Using {} store", store.backend_name());

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.tmdb.timeout_secs))
        .build()
        .map_err(|e| ServerError::Server(format!("Failed to create HTTP client: {}", e)))?;
    let tmdb = Arc::new(catalog::TmdbClient::new(&config.tmdb, http));
    if !tmdb.has_api_key() {
        warn!("No TMDB API key configured; catalog requests will fail");
    }

    let speller = load_speller(&config);
    if speller.is_none() {
        info!("Search runs without spelling alternates");
    }

    let sessions = match config.session.secret {
        Some(ref secret) => session::SessionKeys::new(secret.as_bytes(), config.session.max_age_secs),
        None => {
            warn!("No session secret configured; sessions will not survive a restart");
            session::SessionKeys::ephemeral(config.session.max_age_secs)
        }
    };

    let address = config.listen.address.as_deref().unwrap_or("[::]");
    let port = &config.listen.port;
    let addr: SocketAddr = format!("{}:{}", address, port)
        .parse()
        .map_err(|e| ServerError::Server(format!("Invalid address: {}", e)))?;

    let tls = match (&config.listen.tlscert, &config.listen.tlskey) {
        (Some(cert), Some(key)) => Some((cert.clone(), key.clone())),
        _ => None,
    };

    let state = server::AppState::new(config, store, tmdb, speller, Arc::new(sessions));
    state.views.clone().start_sweeper(state.config.lists.view_ttl_secs);
    let app = server::build_router(state);

    if let Some((cert_path, key_path)) = tls {
        info!("Loading TLS certificate from {}", cert_path);
        info!("Loading TLS key from {}", key_path);

        let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(&cert_path, &key_path)
            .await
            .map_err(|e| ServerError::Server(format!("Failed to load TLS config: {}", e)))?;

        info!("Serving HTTPS on {}", addr);

        axum_server::bind_rustls(addr, tls_config)
            .serve(app.into_make_service())
            .await
            .map_err(|e| ServerError::Server(format!("Server error: {}", e)))?;
    } else {
        info!("Serving HTTP on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Server(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Server(format!("Server error: {}", e)))?;
    }

    Ok(())
}
