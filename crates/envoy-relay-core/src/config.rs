//! Application configuration management.
//!
//! All settings come from the process environment and are read once at
//! startup. The binary loads a `.env` file first, so the same variables can
//! live there during development.
//!
//! Required: `ENLIGHTEN_USERNAME`, `ENLIGHTEN_PASSWORD`, `ENVOY_SERIAL`,
//! `ENVOY_SITE`, `ENVOY_HOST`.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::auth::Credentials;

/// Enlighten login form endpoint
pub const DEFAULT_LOGIN_URL: &str = "https://entrez.enphaseenergy.com/login";

/// Endpoint that renders the Envoy token for a site/serial pair
pub const DEFAULT_TOKEN_URL: &str = "https://entrez.enphaseenergy.com/entrez_tokens";

/// Default listen address for the relay.
const DEFAULT_BIND: &str = "0.0.0.0:8080";

/// Outbound request timeout in seconds.
/// The Envoy can take a while to answer over a congested LAN.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_USERNAME: &str = "ENLIGHTEN_USERNAME";
pub const ENV_PASSWORD: &str = "ENLIGHTEN_PASSWORD";
pub const ENV_SERIAL: &str = "ENVOY_SERIAL";
pub const ENV_SITE: &str = "ENVOY_SITE";
pub const ENV_HOST: &str = "ENVOY_HOST";
pub const ENV_BIND: &str = "RELAY_BIND";
pub const ENV_TIMEOUT: &str = "RELAY_TIMEOUT_SECS";
pub const ENV_LOGIN_URL: &str = "ENLIGHTEN_LOGIN_URL";
pub const ENV_TOKEN_URL: &str = "ENLIGHTEN_TOKEN_URL";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Cloud portal endpoints used to mint tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudConfig {
    pub login_url: String,
    pub token_url: String,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            login_url: DEFAULT_LOGIN_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
        }
    }
}

/// Where the local Envoy lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Scheme and authority, no trailing slash (e.g. `https://192.168.1.20`)
    pub base_url: String,
}

impl DeviceConfig {
    /// Build from the `ENVOY_HOST` value. A bare host gets `https://`;
    /// a value that already names a scheme is kept as is.
    pub fn from_host(host: &str) -> Self {
        let host = host.trim().trim_end_matches('/');
        let base_url = if host.contains("://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        };
        Self { base_url }
    }

    pub fn check_jwt_url(&self) -> String {
        format!("{}/auth/check_jwt", self.base_url)
    }

    pub fn energy_url(&self) -> String {
        format!("{}/ivp/pdm/energy", self.base_url)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub device: DeviceConfig,
    pub cloud: CloudConfig,
    pub bind: SocketAddr,
    pub timeout: Duration,
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| -> Result<String, ConfigError> {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let credentials = Credentials {
            username: required(ENV_USERNAME)?,
            password: required(ENV_PASSWORD)?,
            site: required(ENV_SITE)?,
            serial: required(ENV_SERIAL)?,
        };
        let device = DeviceConfig::from_host(&required(ENV_HOST)?);

        let defaults = CloudConfig::default();
        let cloud = CloudConfig {
            login_url: lookup(ENV_LOGIN_URL).unwrap_or(defaults.login_url),
            token_url: lookup(ENV_TOKEN_URL).unwrap_or(defaults.token_url),
        };

        let bind_raw = lookup(ENV_BIND).unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind: SocketAddr = bind_raw.parse().map_err(|e: std::net::AddrParseError| {
            ConfigError::Invalid {
                name: ENV_BIND,
                reason: e.to_string(),
            }
        })?;

        let timeout_secs = match lookup(ENV_TIMEOUT) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: ENV_TIMEOUT,
                        reason: format!("expected a positive number of seconds, got {:?}", raw),
                    })
                }
            },
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            credentials,
            device,
            cloud,
            bind,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}
