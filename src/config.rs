// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! at startup into a [`ClientConfig`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `SORT_API_BASE_URL` | Base URL of the remote sorting API | `http://localhost:8000` |
//! | `DATA_DIR` | Directory holding the persisted access credential | `./data` |
//! | `HOST` | Server bind address (IP or resolvable host name) | `127.0.0.1` |
//! | `PORT` | Server bind port | `8080` |
//! | `VERIFY_TIMEOUT_SECS` | Timeout for key verification calls | `15` |
//! | `SORT_TIMEOUT_SECS` | Timeout for the sort request | `900` |
//! | `MAX_UPLOAD_BYTES` | Largest accepted multipart upload body | `104857600` (100 MiB) |
//! | `PROGRESS_INTERVAL_SECS` | Seconds between simulated progress steps | `15` |
//! | `TLS_CERT_PATH` | PEM certificate chain; enables HTTPS with `TLS_KEY_PATH` | Optional |
//! | `TLS_KEY_PATH` | PEM private key; enables HTTPS with `TLS_CERT_PATH` | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

/// Environment variable name for the remote sorting API base URL.
pub const SORT_API_BASE_URL_ENV: &str = "SORT_API_BASE_URL";

/// Environment variable name for the credential data directory.
///
/// The directory plays the role of the browser profile: the credential
/// survives restarts but is never shared between installations.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const VERIFY_TIMEOUT_ENV: &str = "VERIFY_TIMEOUT_SECS";
pub const SORT_TIMEOUT_ENV: &str = "SORT_TIMEOUT_SECS";
pub const PROGRESS_INTERVAL_ENV: &str = "PROGRESS_INTERVAL_SECS";
pub const MAX_UPLOAD_BYTES_ENV: &str = "MAX_UPLOAD_BYTES";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_SORT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(15);
/// The sort call is a single long-running request on the remote side.
pub const DEFAULT_SORT_TIMEOUT: Duration = Duration::from_secs(900);
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(15);
/// Member lists can be large; axum's own 2 MB default is far too small.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} is not a valid URL: {reason}")]
    InvalidUrl { name: &'static str, reason: String },

    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("invalid bind address {0}")]
    InvalidBindAddress(String),

    #[error("{0} and {1} must be set together")]
    IncompleteTls(&'static str, &'static str),
}

/// Log output format selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// PEM files for serving the local UI over HTTPS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: Url,
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub verify_timeout: Duration,
    pub sort_timeout: Duration,
    pub progress_interval: Duration,
    pub max_upload_bytes: usize,
    pub tls: Option<TlsPaths>,
    pub log_format: LogFormat,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: Url::parse(DEFAULT_SORT_API_BASE_URL)
                .unwrap_or_else(|_| unreachable!("default base URL is valid")),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            verify_timeout: DEFAULT_VERIFY_TIMEOUT,
            sort_timeout: DEFAULT_SORT_TIMEOUT,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            tls: None,
            log_format: LogFormat::Pretty,
        }
    }
}

impl ClientConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let raw_url = get(SORT_API_BASE_URL_ENV)
            .unwrap_or_else(|| DEFAULT_SORT_API_BASE_URL.to_string());
        let api_base_url = Url::parse(&raw_url).map_err(|e| ConfigError::InvalidUrl {
            name: SORT_API_BASE_URL_ENV,
            reason: e.to_string(),
        })?;
        if api_base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidUrl {
                name: SORT_API_BASE_URL_ENV,
                reason: "URL cannot be used as a base".to_string(),
            });
        }

        let port = match get(PORT_ENV) {
            Some(value) => value
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidNumber {
                    name: PORT_ENV,
                    value,
                })?,
            None => DEFAULT_PORT,
        };

        let max_upload_bytes = match get(MAX_UPLOAD_BYTES_ENV) {
            Some(value) => match value.parse::<usize>() {
                Ok(bytes) if bytes > 0 => bytes,
                _ => {
                    return Err(ConfigError::InvalidNumber {
                        name: MAX_UPLOAD_BYTES_ENV,
                        value,
                    })
                }
            },
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: PathBuf::from(cert),
                key: PathBuf::from(key),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteTls(TLS_CERT_PATH_ENV, TLS_KEY_PATH_ENV)),
        };

        Ok(Self {
            api_base_url,
            data_dir: PathBuf::from(get(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.into())),
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            verify_timeout: seconds(&get, VERIFY_TIMEOUT_ENV, DEFAULT_VERIFY_TIMEOUT)?,
            sort_timeout: seconds(&get, SORT_TIMEOUT_ENV, DEFAULT_SORT_TIMEOUT)?,
            progress_interval: seconds(&get, PROGRESS_INTERVAL_ENV, DEFAULT_PROGRESS_INTERVAL)?,
            max_upload_bytes,
            tls,
            log_format: get(LOG_FORMAT_ENV)
                .map(|v| LogFormat::parse(&v))
                .unwrap_or(LogFormat::Pretty),
        })
    }

    /// Socket address the local UI listens on.
    ///
    /// `HOST` may be a name such as `localhost`; the first resolved address
    /// is used.
    pub async fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        if let Ok(addr) = raw.parse::<SocketAddr>() {
            return Ok(addr);
        }
        tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or(ConfigError::InvalidBindAddress(raw))
    }
}

fn seconds<G>(get: &G, name: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(value) => match value.parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
            _ => Err(ConfigError::InvalidNumber { name, value }),
        },
        None => Ok(default),
    }
}
