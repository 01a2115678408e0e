//! Configuration validation rules.
//!
//! Applied after values have been loaded from environment, file, or
//! defaults.

use crate::config::WorkerConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl WorkerConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `generation` or `user_agent` is empty
    /// - `base_url` is not an absolute http(s) URL
    /// - `timeout_ms` is set but outside 100ms..5min
    /// - `info_sample_limit` is 0 or over 100
    /// - `max_background_refreshes` is 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generation.is_empty() {
            return Err(ConfigError::Invalid { field: "generation".into(), reason: "must not be empty".into() });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        match url::Url::parse(&self.base_url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            Ok(parsed) => {
                return Err(ConfigError::Invalid {
                    field: "base_url".into(),
                    reason: format!("scheme must be http or https, got {}", parsed.scheme()),
                });
            }
            Err(e) => {
                return Err(ConfigError::Invalid { field: "base_url".into(), reason: e.to_string() });
            }
        }

        if let Some(timeout_ms) = self.timeout_ms {
            if timeout_ms < 100 {
                return Err(ConfigError::Invalid {
                    field: "timeout_ms".into(),
                    reason: "must be at least 100ms".into(),
                });
            }
            if timeout_ms > 300_000 {
                return Err(ConfigError::Invalid {
                    field: "timeout_ms".into(),
                    reason: "must not exceed 5 minutes (300000ms)".into(),
                });
            }
        }

        if self.info_sample_limit == 0 || self.info_sample_limit > 100 {
            return Err(ConfigError::Invalid {
                field: "info_sample_limit".into(),
                reason: "must be between 1 and 100".into(),
            });
        }

        if self.max_background_refreshes == 0 {
            return Err(ConfigError::Invalid {
                field: "max_background_refreshes".into(),
                reason: "must be at least 1".into(),
            });
        }

        if self.static_extensions.is_empty() {
            tracing::warn!("static_extensions is empty; every asset will take the default route");
        }

        Ok(())
    }
}
