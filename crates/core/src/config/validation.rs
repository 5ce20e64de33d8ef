//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from the config file, environment, or defaults.

use std::path::PathBuf;

use crate::config::AppConfig;
use thiserror::Error;

/// Upper bound the upstream timeline endpoint accepts for `count`.
const MAX_ITEMS_LIMIT: u32 = 200;

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("configuration file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `addr.port` is 0 or `addr.host` is empty
    /// - a certificate or key path is empty
    /// - any refresh duration is 0
    /// - `refresh.max_items` is outside 1-200
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.addr.host.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "addr.host".into(), reason: "must not be empty".into() });
        }
        if self.addr.port == 0 {
            return Err(ConfigError::Invalid { field: "addr.port".into(), reason: "must be greater than 0".into() });
        }

        if self.cert.cert_file.as_os_str().is_empty() {
            return Err(ConfigError::Invalid { field: "cert.cert_file".into(), reason: "must not be empty".into() });
        }
        if self.cert.key_file.as_os_str().is_empty() {
            return Err(ConfigError::Invalid { field: "cert.key_file".into(), reason: "must not be empty".into() });
        }

        let durations = [
            ("refresh.interval_secs", self.refresh.interval_secs),
            ("refresh.cooldown_secs", self.refresh.cooldown_secs),
            ("refresh.retry_secs", self.refresh.retry_secs),
        ];
        for (field, secs) in durations {
            if secs == 0 {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must be greater than 0".into() });
            }
        }

        if !(1..=MAX_ITEMS_LIMIT).contains(&self.refresh.max_items) {
            return Err(ConfigError::Invalid {
                field: "refresh.max_items".into(),
                reason: format!("must be between 1 and {MAX_ITEMS_LIMIT}"),
            });
        }

        if self.refresh.interval_secs < 60 {
            tracing::warn!(
                interval_secs = self.refresh.interval_secs,
                "refresh interval under a minute will likely hit upstream rate limits"
            );
        }

        Ok(())
    }
}
