//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (RINKOREA_SW_*)
//! 2. TOML config file (if RINKOREA_SW_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (RINKOREA_SW_*)
/// 2. TOML config file (if RINKOREA_SW_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite cache registry.
    ///
    /// Set via RINKOREA_SW_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Socket address the host listens on.
    ///
    /// Set via RINKOREA_SW_LISTEN_ADDR environment variable.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Origin of the site the worker controls. Requests to any other origin
    /// pass through, except those to `backend_host`.
    ///
    /// Set via RINKOREA_SW_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Hostname substring identifying the hosted backend API.
    ///
    /// Set via RINKOREA_SW_BACKEND_HOST environment variable.
    #[serde(default = "default_backend_host")]
    pub backend_host: String,

    /// Prefix shared by every partition name.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Version suffix of the partition names. Bumping it invalidates every
    /// partition at the next activation.
    ///
    /// Set via RINKOREA_SW_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Absolute paths precached into the static partition at install.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// User-Agent string for upstream requests.
    ///
    /// Set via RINKOREA_SW_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to accept per upstream response.
    ///
    /// Set via RINKOREA_SW_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Upstream request timeout in milliseconds.
    ///
    /// Set via RINKOREA_SW_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./rinkorea-sw-cache.sqlite")
}

fn default_listen_addr() -> String {
    "127.0.0.1:8787".into()
}

fn default_origin() -> String {
    "http://127.0.0.1:4173".into()
}

fn default_backend_host() -> String {
    "supabase.co".into()
}

fn default_cache_prefix() -> String {
    "rinkorea".into()
}

fn default_cache_version() -> String {
    "v1.0.0".into()
}

fn default_precache() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/manifest.json",
        "/images/rin-korea-logo-black.png",
        "/images/rin-korea-logo-white.png",
        "/favicon.ico",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_user_agent() -> String {
    "rinkorea-sw/0.1".into()
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            listen_addr: default_listen_addr(),
            origin: default_origin(),
            backend_host: default_backend_host(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            precache: default_precache(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `RINKOREA_SW_`
    /// 2. TOML file from `RINKOREA_SW_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("RINKOREA_SW_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("RINKOREA_SW_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Parse the configured origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin is not an absolute
    /// http(s) URL.
    pub fn origin_url(&self) -> Result<url::Url, ConfigError> {
        let url = url::Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;

        match url.scheme() {
            "http" | "https" if url.host_str().is_some() => Ok(url),
            _ => Err(ConfigError::Invalid { field: "origin".into(), reason: "must be an http(s) URL with a host".into() }),
        }
    }
}
