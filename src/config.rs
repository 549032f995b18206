use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub appdir: Option<String>,
    #[serde(default)]
    pub datadir: Option<String>,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub tmdb: TmdbConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub lists: ListsConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(skip)]
    pub debug_logs: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenConfig {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default)]
    pub tlscert: Option<String>,
    #[serde(default)]
    pub tlskey: Option<String>,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: None,
            port: default_port(),
            tlscert: None,
            tlskey: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub json: Option<JsonStoreConfig>,
    #[serde(default)]
    pub sqlite: Option<SqliteConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JsonStoreConfig {
    pub directory: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SqliteConfig {
    pub filename: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TmdbConfig {
    #[serde(alias = "apikey", rename = "api_key")]
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(alias = "baseurl", rename = "base_url")]
    #[serde(default = "default_tmdb_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_tmdb_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default = "default_session_max_age")]
    pub max_age_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: None,
            max_age_secs: default_session_max_age(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListsConfig {
    #[serde(alias = "perpage", rename = "per_page")]
    #[serde(default = "default_per_page")]
    pub per_page: usize,
    #[serde(default = "default_near_bottom_px")]
    pub near_bottom_px: f64,
    /// Views untouched for this long are dropped.
    #[serde(default = "default_view_ttl_secs")]
    pub view_ttl_secs: u64,
}

impl Default for ListsConfig {
    fn default() -> Self {
        Self {
            per_page: default_per_page(),
            near_bottom_px: default_near_bottom_px(),
            view_ttl_secs: default_view_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    #[serde(default = "default_suggestion_concurrency")]
    pub suggestion_concurrency: usize,
    #[serde(default = "default_true")]
    pub dedupe_suggestions: bool,
    #[serde(default)]
    pub dictionary: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            suggestion_concurrency: default_suggestion_concurrency(),
            dedupe_suggestions: true,
            dictionary: None,
        }
    }
}

fn default_port() -> String {
    "3000".to_string()
}

fn default_tmdb_base_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_session_max_age() -> u64 {
    3600
}

fn default_per_page() -> usize {
    6
}

fn default_near_bottom_px() -> f64 {
    300.0
}

fn default_view_ttl_secs() -> u64 {
    1800
}

fn default_suggestion_concurrency() -> usize {
    3
}

fn default_true() -> bool {
    true
}

/// Where persistent data lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Json(PathBuf),
    Sqlite(String),
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_string(), e))?;

        Self::from_yaml(&content).map_err(|e| ConfigError::ParseError(path.to_string(), e))
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        let mut config: Config = serde_yaml::from_str(content)?;
        if config.tmdb.api_key.is_none() {
            config.tmdb.api_key = std::env::var("TMDB_API_KEY").ok();
        }
        Ok(config)
    }

    pub fn get_store_location(&self) -> Option<StoreLocation> {
        if let Some(ref sqlite) = self.database.sqlite {
            return Some(StoreLocation::Sqlite(sqlite.filename.clone()));
        }

        if let Some(ref json) = self.database.json {
            return Some(StoreLocation::Json(PathBuf::from(&json.directory)));
        }

        self.datadir
            .as_ref()
            .map(|dir| StoreLocation::Json(PathBuf::from(dir)))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadError(String, std::io::Error),
    #[error("Failed to parse config file {0}: {1}")]
    ParseError(String, serde_yaml::Error),
}
