//! Application configuration.

use serde::Deserialize;
use std::path::Path;
use url::Url;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Redis configuration.
    pub redis: RedisConfig,
    /// Federation configuration.
    pub federation: FederationConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance.
    pub url: String,
}

impl ServerConfig {
    /// Parse the configured public URL.
    pub fn base_url(&self) -> Result<Url, config::ConfigError> {
        Url::parse(&self.url)
            .map_err(|e| config::ConfigError::Message(format!("invalid server.url: {e}")))
    }
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Redis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL.
    pub url: String,
}

/// Federation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FederationConfig {
    /// Whether federation is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Username of the local service account used for signed fetches.
    #[serde(default = "default_instance_actor")]
    pub instance_actor: String,
    /// Whether outbound GET fetches (WebFinger, actor documents) are signed.
    #[serde(default = "default_true")]
    pub signed_fetch: bool,
    /// User agent sent on outbound federation requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

fn default_instance_actor() -> String {
    "hivecache".to_string()
}

fn default_user_agent() -> String {
    concat!("hivecache/", env!("CARGO_PKG_VERSION")).to_string()
}

const fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` file (into the process environment)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `HIVECACHE_ENV`)
    /// 4. Environment variables with `HIVECACHE_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let env = std::env::var("HIVECACHE_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("HIVECACHE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("HIVECACHE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
