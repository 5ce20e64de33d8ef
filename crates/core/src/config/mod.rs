//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (GEMFEED_*, nested with `__`)
//! 2. Config file passed on the command line (YAML, or TOML by extension)
//! 3. Built-in defaults
//!
//! Keys are snake_case. The camelCase spellings used by older YAML configs
//! (`certFile`, `consumerKey`, `userID`, `asciiLogoFile`, ...) are accepted as
//! aliases; a file must not use both spellings for the same field.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Toml, Yaml},
};
use serde::Deserialize;

use crate::feed::{AccountRef, FetchRequest, RefreshPolicy};

mod validation;

pub use validation::ConfigError;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Listen address.
    #[serde(default)]
    pub addr: AddrConfig,

    /// TLS certificate and key (PEM).
    #[serde(default)]
    pub cert: CertConfig,

    /// Upstream account and OAuth 1.0a credentials.
    #[serde(default)]
    pub twitter: TwitterConfig,

    /// Page presentation.
    #[serde(default)]
    pub ui: UiConfig,

    /// Refresh loop timing.
    #[serde(default)]
    pub refresh: RefreshConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddrConfig {
    /// Set via GEMFEED_ADDR__HOST.
    #[serde(default = "default_host")]
    pub host: String,

    /// Set via GEMFEED_ADDR__PORT.
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CertConfig {
    #[serde(default = "default_cert_file", alias = "certFile")]
    pub cert_file: PathBuf,

    #[serde(default = "default_key_file", alias = "keyFile")]
    pub key_file: PathBuf,
}

/// Credentials are required at startup; see [`AppConfig::require_credentials`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TwitterConfig {
    #[serde(default, alias = "consumerKey")]
    pub consumer_key: String,

    #[serde(default, alias = "consumerSecret")]
    pub consumer_secret: String,

    #[serde(default, alias = "accessToken")]
    pub access_token: String,

    #[serde(default, alias = "accessSecret")]
    pub access_secret: String,

    /// Numeric account ID; 0 means unset.
    #[serde(default, alias = "userID")]
    pub user_id: Option<u64>,

    #[serde(default, alias = "screenName")]
    pub screen_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UiConfig {
    /// Plain-text art shown above the menu. A missing file renders nothing.
    #[serde(default, alias = "asciiLogoFile")]
    pub ascii_logo_file: Option<PathBuf>,

    /// Separator written after every timeline entry.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    #[serde(default = "default_retry_secs")]
    pub retry_secs: u64,

    /// Number of most recent items requested per fetch.
    #[serde(default = "default_max_items")]
    pub max_items: u32,

    #[serde(default = "default_true")]
    pub exclude_replies: bool,
}

fn default_host() -> String {
    "localhost".into()
}

fn default_port() -> u16 {
    1965
}

fn default_cert_file() -> PathBuf {
    PathBuf::from("cert.pem")
}

fn default_key_file() -> PathBuf {
    PathBuf::from("key.pem")
}

fn default_delimiter() -> String {
    "-----".into()
}

fn default_interval_secs() -> u64 {
    15 * 60
}

fn default_cooldown_secs() -> u64 {
    5 * 60
}

fn default_retry_secs() -> u64 {
    60
}

fn default_max_items() -> u32 {
    100
}

fn default_true() -> bool {
    true
}

impl Default for AddrConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

impl Default for CertConfig {
    fn default() -> Self {
        Self { cert_file: default_cert_file(), key_file: default_key_file() }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self { ascii_logo_file: None, delimiter: default_delimiter() }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            cooldown_secs: default_cooldown_secs(),
            retry_secs: default_retry_secs(),
            max_items: default_max_items(),
            exclude_replies: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from `path` plus the environment.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `GEMFEED_`
    /// 2. The file at `path` (`.toml` is read as TOML, anything else as YAML)
    /// 3. Built-in defaults
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The file does not exist
    /// - The file or environment cannot be parsed
    /// - Validation fails after loading
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let figment = if path.extension().is_some_and(|ext| ext == "toml") {
            Figment::from(Toml::file(path))
        } else {
            Figment::from(Yaml::file(path))
        };

        let figment = figment.merge(
            Env::prefixed("GEMFEED_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// `host:port` for the TCP listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.addr.host, self.addr.port)
    }

    pub fn refresh_policy(&self) -> RefreshPolicy {
        RefreshPolicy {
            interval: Duration::from_secs(self.refresh.interval_secs),
            cooldown: Duration::from_secs(self.refresh.cooldown_secs),
            retry_delay: Duration::from_secs(self.refresh.retry_secs),
        }
    }

    /// Account to mirror. A non-zero numeric ID wins over the screen name.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if neither is set.
    pub fn account(&self) -> Result<AccountRef, ConfigError> {
        if let Some(id) = self.twitter.user_id.filter(|id| *id != 0) {
            return Ok(AccountRef::UserId(id));
        }

        self.twitter
            .screen_name
            .as_deref()
            .map(|name| name.trim().trim_start_matches('@'))
            .filter(|name| !name.is_empty())
            .map(|name| AccountRef::ScreenName(name.to_string()))
            .ok_or_else(|| ConfigError::Missing {
                field: "twitter.user_id".into(),
                hint: "Set twitter.user_id or twitter.screen_name".into(),
            })
    }

    /// Upstream fetch parameters derived from the account and refresh settings.
    pub fn fetch_request(&self) -> Result<FetchRequest, ConfigError> {
        Ok(FetchRequest {
            account: self.account()?,
            max_count: self.refresh.max_items,
            exclude_replies: self.refresh.exclude_replies,
        })
    }

    /// Check that all four OAuth values are present (deferred validation).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` naming the first empty credential.
    pub fn require_credentials(&self) -> Result<&TwitterConfig, ConfigError> {
        let t = &self.twitter;
        let fields = [
            ("consumer_key", &t.consumer_key),
            ("consumer_secret", &t.consumer_secret),
            ("access_token", &t.access_token),
            ("access_secret", &t.access_secret),
        ];

        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing {
                    field: format!("twitter.{name}"),
                    hint: format!("Set GEMFEED_TWITTER__{} or twitter.{name}", name.to_uppercase()),
                });
            }
        }

        Ok(t)
    }
}
