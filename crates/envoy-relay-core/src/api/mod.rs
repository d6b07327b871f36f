//! HTTP client module for the Enlighten portal and the local Envoy.
//!
//! The portal hands out bearer tokens through an HTML form flow; the
//! Envoy accepts them on its `/auth` and `/ivp` endpoints over a
//! self-signed TLS certificate.

pub mod client;
pub mod error;
pub mod protocol;

pub use client::ApiClient;
pub use error::ApiError;
