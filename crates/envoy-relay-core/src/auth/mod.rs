//! Authentication module for the Envoy bearer token.
//!
//! This module provides:
//! - `Credentials`: the Enlighten login and the site/serial the token is for
//! - `extract`: pulls the token out of the portal's HTML page
//! - `Session`: the single shared token, validated and refreshed on demand
//!
//! Tokens are kept in memory only; a restart logs in again.

pub mod credentials;
pub mod extract;
pub mod session;

pub use credentials::Credentials;
pub use session::Session;
