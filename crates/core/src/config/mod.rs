//! Worker configuration with layered loading.
//!
//! Loading precedence (highest wins):
//!
//! 1. Environment variables (SWCACHE_*)
//! 2. TOML config file (if SWCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::policy::{DynamicRoute, RoutePolicy};

mod validation;

pub use validation::ConfigError;

/// Worker configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Cache generation identifier, assigned externally per deploy.
    ///
    /// Changing it forces a cache rollover on the next install/activate
    /// cycle. Set via SWCACHE_GENERATION.
    #[serde(default = "default_generation")]
    pub generation: String,

    /// Path to the SQLite cache database.
    ///
    /// Set via SWCACHE_DB_PATH.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin the worker serves; site-relative manifest entries and the
    /// fallback document resolve against it.
    ///
    /// Set via SWCACHE_BASE_URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path to the precache manifest (JSON array of URLs), if any.
    ///
    /// Set via SWCACHE_MANIFEST_PATH.
    #[serde(default)]
    pub manifest_path: Option<PathBuf>,

    /// User-Agent string for outgoing fetches.
    ///
    /// Set via SWCACHE_USER_AGENT.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Optional fetch timeout in milliseconds.
    ///
    /// None means requests hang as long as the underlying transport does.
    /// Set via SWCACHE_TIMEOUT_MS.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Navigation path served as the offline fallback document.
    ///
    /// Set via SWCACHE_FALLBACK_DOCUMENT.
    #[serde(default = "default_fallback_document")]
    pub fallback_document: String,

    /// Cap on the entry sample returned by GET_CACHE_INFO.
    ///
    /// Set via SWCACHE_INFO_SAMPLE_LIMIT.
    #[serde(default = "default_info_sample_limit")]
    pub info_sample_limit: usize,

    /// Bound on concurrently tracked background revalidations.
    ///
    /// Set via SWCACHE_MAX_BACKGROUND_REFRESHES.
    #[serde(default = "default_max_background_refreshes")]
    pub max_background_refreshes: usize,

    /// API path prefixes treated as dynamic content.
    #[serde(default = "default_api_prefixes")]
    pub api_prefixes: Vec<String>,

    /// Document routes treated as dynamic content.
    #[serde(default = "default_dynamic_routes")]
    pub dynamic_routes: Vec<DynamicRoute>,

    /// Static-asset extension allow-list.
    #[serde(default = "default_static_extensions")]
    pub static_extensions: Vec<String>,
}

fn default_generation() -> String {
    "dev".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./sw-cache.sqlite")
}

fn default_base_url() -> String {
    "http://localhost:8080".into()
}

fn default_user_agent() -> String {
    "sw-worker/0.1".into()
}

fn default_fallback_document() -> String {
    "/index.html".into()
}

fn default_info_sample_limit() -> usize {
    10
}

fn default_max_background_refreshes() -> usize {
    16
}

fn default_api_prefixes() -> Vec<String> {
    RoutePolicy::default().api_prefixes
}

fn default_dynamic_routes() -> Vec<DynamicRoute> {
    RoutePolicy::default().dynamic_routes
}

fn default_static_extensions() -> Vec<String> {
    RoutePolicy::default().static_extensions
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            generation: default_generation(),
            db_path: default_db_path(),
            base_url: default_base_url(),
            manifest_path: None,
            user_agent: default_user_agent(),
            timeout_ms: None,
            fallback_document: default_fallback_document(),
            info_sample_limit: default_info_sample_limit(),
            max_background_refreshes: default_max_background_refreshes(),
            api_prefixes: default_api_prefixes(),
            dynamic_routes: default_dynamic_routes(),
            static_extensions: default_static_extensions(),
        }
    }
}

impl WorkerConfig {
    /// Fetch timeout as a Duration, if configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// The configured origin as a parsed URL.
    pub fn base_url(&self) -> Result<url::Url, ConfigError> {
        url::Url::parse(&self.base_url)
            .map_err(|e| ConfigError::Invalid { field: "base_url".into(), reason: e.to_string() })
    }

    /// The routing table assembled from the configured rules.
    pub fn route_policy(&self) -> RoutePolicy {
        RoutePolicy {
            api_prefixes: self.api_prefixes.clone(),
            dynamic_routes: self.dynamic_routes.clone(),
            static_extensions: self.static_extensions.clone(),
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, the environment
    /// cannot be parsed, or validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SWCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SWCACHE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
