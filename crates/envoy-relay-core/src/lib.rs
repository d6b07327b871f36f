//! Core library for envoy-relay.
//!
//! Logs into the Enphase Enlighten portal, keeps a single bearer token for the
//! local Envoy gateway alive, and reads production telemetry from the device.
//!
//! - `config`: environment-driven configuration
//! - `api`: outbound HTTP to the cloud portal and the device
//! - `auth`: credentials, token extraction and the shared `Session`
//! - `telemetry`: the `production.pcu` fetcher

pub mod api;
pub mod auth;
pub mod config;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod test_support;

pub use api::{ApiClient, ApiError};
pub use auth::{Credentials, Session};
pub use config::{Config, ConfigError};
