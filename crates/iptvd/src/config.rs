//! Backend configuration.
//!
//! Settings come from three layers, highest priority first: command line
//! flags (with environment fallbacks, handled by the binary), an optional
//! TOML file, and built-in defaults. Each layer is a [`ConfigLayer`] whose
//! fields are all optional; [`BackendConfig::resolve`] merges them.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use iptv_core::Credentials;

use crate::source::DEFAULT_FETCH_TIMEOUT;
use crate::state::DEFAULT_STALE_CHECK_INTERVAL;

pub const DEFAULT_BIND: &str = "127.0.0.1:8000";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 21_600;
const CACHE_DIR_NAME: &str = "iptv";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid bind address '{0}'")]
    Bind(String),

    #[error("{0}")]
    Invalid(String),
}

// ============================================================================
// Config Layer
// ============================================================================

/// One source of settings. Unset fields fall through to the next layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigLayer {
    pub bind: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub cache_ttl_secs: Option<u64>,
    pub verify_ssl: Option<bool>,
    pub debug: Option<bool>,
    pub fetch_timeout_secs: Option<u64>,
    pub stale_check_secs: Option<u64>,
    pub iptv_host: Option<String>,
    pub iptv_username: Option<String>,
    pub iptv_password: Option<String>,
}

impl ConfigLayer {
    /// Reads a layer from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Fills every unset field from `lower`.
    pub fn or(self, lower: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            bind: self.bind.or(lower.bind),
            cache_dir: self.cache_dir.or(lower.cache_dir),
            cache_ttl_secs: self.cache_ttl_secs.or(lower.cache_ttl_secs),
            verify_ssl: self.verify_ssl.or(lower.verify_ssl),
            debug: self.debug.or(lower.debug),
            fetch_timeout_secs: self.fetch_timeout_secs.or(lower.fetch_timeout_secs),
            stale_check_secs: self.stale_check_secs.or(lower.stale_check_secs),
            iptv_host: self.iptv_host.or(lower.iptv_host),
            iptv_username: self.iptv_username.or(lower.iptv_username),
            iptv_password: self.iptv_password.or(lower.iptv_password),
        }
    }
}

// ============================================================================
// Backend Config
// ============================================================================

/// Fully resolved backend settings.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    pub bind: SocketAddr,
    pub cache_dir: PathBuf,
    pub cache_ttl: Duration,
    pub verify_ssl: bool,
    pub debug: bool,
    pub fetch_timeout: Duration,
    /// `None` disables the staleness ticker.
    pub stale_check_interval: Option<Duration>,
    /// Credentials for auto-login at startup.
    pub credentials: Option<Credentials>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8000)),
            cache_dir: default_cache_dir(),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            verify_ssl: true,
            debug: false,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            stale_check_interval: Some(DEFAULT_STALE_CHECK_INTERVAL),
            credentials: None,
        }
    }
}

impl BackendConfig {
    /// Merges `overrides` over the optional config file over defaults.
    ///
    /// # Errors
    ///
    /// Unreadable or malformed config file, bad bind address, zero fetch
    /// timeout, or incomplete auto-login credentials.
    pub fn resolve(overrides: ConfigLayer, file: Option<&Path>) -> Result<Self, ConfigError> {
        let layer = match file {
            Some(path) => overrides.or(ConfigLayer::from_file(path)?),
            None => overrides,
        };
        Self::from_layer(layer)
    }

    fn from_layer(layer: ConfigLayer) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let bind = match layer.bind {
            Some(raw) => raw
                .trim()
                .parse::<SocketAddr>()
                .map_err(|_| ConfigError::Bind(raw.clone()))?,
            None => defaults.bind,
        };

        let fetch_timeout = match layer.fetch_timeout_secs {
            Some(0) => {
                return Err(ConfigError::Invalid(
                    "fetch_timeout_secs must be greater than 0".to_string(),
                ))
            }
            Some(secs) => Duration::from_secs(secs),
            None => defaults.fetch_timeout,
        };

        let stale_check_interval = match layer.stale_check_secs {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => defaults.stale_check_interval,
        };

        let credentials = auto_login_credentials(
            layer.iptv_host,
            layer.iptv_username,
            layer.iptv_password,
        )?;

        Ok(Self {
            bind,
            cache_dir: layer.cache_dir.unwrap_or(defaults.cache_dir),
            cache_ttl: layer
                .cache_ttl_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
            verify_ssl: layer.verify_ssl.unwrap_or(defaults.verify_ssl),
            debug: layer.debug.unwrap_or(defaults.debug),
            fetch_timeout,
            stale_check_interval,
            credentials,
        })
    }
}

/// Auto-login needs all three values. None set means no auto-login; a
/// partial set is a configuration mistake.
fn auto_login_credentials(
    host: Option<String>,
    username: Option<String>,
    password: Option<String>,
) -> Result<Option<Credentials>, ConfigError> {
    match (host, username, password) {
        (None, None, None) => Ok(None),
        (Some(host), Some(username), Some(password)) => {
            let credentials = Credentials::new(host, username, password);
            credentials
                .validate()
                .map_err(|e| ConfigError::Invalid(format!("auto-login credentials: {e}")))?;
            Ok(Some(credentials))
        }
        _ => Err(ConfigError::Invalid(
            "auto-login needs iptv_host, iptv_username and iptv_password together".to_string(),
        )),
    }
}

/// `<user cache dir>/iptv`, or `./.iptv-cache` when the platform has none.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join(CACHE_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(".iptv-cache"))
}
