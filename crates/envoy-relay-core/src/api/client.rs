//! API client for the Enlighten portal and the local Envoy.
//!
//! The portal and the device get separate `reqwest::Client`s: the Envoy
//! serves a self-signed certificate, so its client skips verification,
//! while portal traffic keeps default TLS checks.

use std::time::Duration;

use reqwest::{header, Client, RequestBuilder, Response};
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::extract::extract_token;
use crate::auth::Credentials;
use crate::config::{CloudConfig, DeviceConfig};

use super::protocol;
use super::ApiError;

/// Connect timeout for every outbound request.
/// The Envoy sits on the LAN; a slow TCP handshake means it is gone.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// API client for the Enlighten portal and the Envoy.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    cloud: Client,
    device: Client,
    cloud_config: CloudConfig,
    device_config: DeviceConfig,
}

impl ApiClient {
    /// Create a new API client with `timeout` applied to every request.
    pub fn new(
        cloud_config: CloudConfig,
        device_config: DeviceConfig,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        let cloud = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;

        let device = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .danger_accept_invalid_certs(true)
            .build()?;

        Ok(Self {
            cloud,
            device,
            cloud_config,
            device_config,
        })
    }

    pub fn device_config(&self) -> &DeviceConfig {
        &self.device_config
    }

    /// Log into Enlighten and fetch a fresh Envoy token.
    ///
    /// The login sets session cookies which are replayed on the token
    /// request. An empty string means the token page had no textarea.
    pub async fn acquire_token(&self, credentials: &Credentials) -> Result<String, ApiError> {
        let login = self
            .cloud
            .post(&self.cloud_config.login_url)
            .form(&[
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
            ])
            .send()
            .await
            .map_err(ApiError::CloudUnreachable)?;

        let cookies = Self::cookie_header(&login);
        let status = login.status();
        let body = login.text().await.map_err(ApiError::CloudUnreachable)?;

        if protocol::is_login_rejected(&body) {
            warn!(username = %credentials.username, "Enlighten rejected the credentials");
            return Err(ApiError::BadCredentials);
        }
        debug!(status = %status, has_cookies = cookies.is_some(), "Enlighten login complete");

        let mut request = self.cloud.post(&self.cloud_config.token_url).form(&[
            ("Site", credentials.site.as_str()),
            ("serialNum", credentials.serial.as_str()),
        ]);
        if let Some(cookies) = cookies {
            request = request.header(header::COOKIE, cookies);
        }

        let response = request.send().await.map_err(ApiError::CloudUnreachable)?;
        let html = response.text().await.map_err(ApiError::CloudUnreachable)?;

        let token = extract_token(&html);
        if token.is_empty() {
            warn!("Token page did not contain a token");
        }
        Ok(token)
    }

    /// Ask the Envoy whether `token` is accepted.
    ///
    /// `Err(DeviceUnreachable)` when the device cannot be reached.
    pub async fn check_token(&self, token: &str) -> Result<bool, ApiError> {
        let response = self
            .device_get(&self.device_config.check_jwt_url(), token)
            .send()
            .await
            .map_err(ApiError::DeviceUnreachable)?;

        let body = response.text().await.map_err(ApiError::DeviceUnreachable)?;
        Ok(protocol::is_token_accepted(&body))
    }

    /// Fetch the raw `/ivp/pdm/energy` document.
    pub async fn fetch_energy(&self, token: &str) -> Result<Value, ApiError> {
        let response = self
            .device_get(&self.device_config.energy_url(), token)
            .send()
            .await
            .map_err(ApiError::DeviceUnreachable)?;

        let response = Self::check_response(response).await?;

        response
            .json::<Value>()
            .await
            .map_err(|e| ApiError::MalformedPayload(format!("energy response is not JSON: {}", e)))
    }

    fn device_get(&self, url: &str, token: &str) -> RequestBuilder {
        self.device
            .get(url)
            .header(header::CONTENT_TYPE, "application/json")
            .bearer_auth(token)
    }

    /// Build a `Cookie` header value from the response's `Set-Cookie`s.
    fn cookie_header(response: &Response) -> Option<String> {
        let pairs: Vec<String> = response
            .cookies()
            .map(|c| format!("{}={}", c.name(), c.value()))
            .collect();
        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }
}
