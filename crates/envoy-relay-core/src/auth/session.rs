use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};

use super::Credentials;

/// The live Envoy token. Always replaced whole.
#[derive(Debug, Clone, Default)]
pub struct SessionData {
    pub token: String,
    pub acquired_at: Option<DateTime<Utc>>,
}

impl SessionData {
    fn acquired(token: String) -> Self {
        Self {
            token,
            acquired_at: Some(Utc::now()),
        }
    }

    /// Minutes since the token was minted, if it ever was.
    pub fn age_minutes(&self) -> Option<i64> {
        self.acquired_at
            .map(|at| (Utc::now() - at).num_minutes().max(0))
    }
}

/// Owner of the process-wide token.
///
/// Validation and refresh run under one lock, so concurrent callers that
/// all hold a stale token trigger a single login and then share its result.
pub struct Session {
    api: ApiClient,
    credentials: Credentials,
    data: Mutex<SessionData>,
}

impl Session {
    pub fn new(api: ApiClient, credentials: Credentials) -> Self {
        Self {
            api,
            credentials,
            data: Mutex::new(SessionData::default()),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Snapshot of the stored token (empty before the first login).
    pub async fn current_token(&self) -> String {
        self.data.lock().await.token.clone()
    }

    /// Log in and store the new token, whatever it is.
    pub async fn acquire(&self) -> Result<String, ApiError> {
        let mut data = self.data.lock().await;
        self.acquire_locked(&mut data).await
    }

    /// Validate `candidate` against the Envoy, logging in again if the device
    /// rejects it or cannot be reached. The returned token (accepted candidate
    /// or refreshed one) becomes the stored token.
    pub async fn check_token(&self, candidate: &str) -> Result<String, ApiError> {
        let mut data = self.data.lock().await;
        self.validate_locked(&mut data, candidate).await
    }

    /// Validate the stored token, refreshing it if needed.
    pub async fn ensure_valid(&self) -> Result<String, ApiError> {
        let mut data = self.data.lock().await;
        let candidate = data.token.clone();
        self.validate_locked(&mut data, &candidate).await
    }

    /// Drop the stored token so the next request logs in again.
    pub async fn invalidate(&self) {
        let mut data = self.data.lock().await;
        debug!("Discarding stored token");
        *data = SessionData::default();
    }

    /// Eager first login at startup.
    pub async fn prime(&self) -> Result<(), ApiError> {
        self.acquire().await.map(|_| ())
    }

    async fn acquire_locked(&self, data: &mut SessionData) -> Result<String, ApiError> {
        let token = self.api.acquire_token(&self.credentials).await?;
        *data = SessionData::acquired(token.clone());
        info!(empty = token.is_empty(), "Stored new Envoy token");
        Ok(token)
    }

    async fn validate_locked(
        &self,
        data: &mut SessionData,
        candidate: &str,
    ) -> Result<String, ApiError> {
        // Nothing to ask the device about
        if candidate.is_empty() {
            info!("No token yet, logging in");
            return self.acquire_locked(data).await;
        }

        match self.api.check_token(candidate).await {
            Ok(true) => {
                if data.token != candidate {
                    // Accepted but not minted here, so its age is unknown
                    *data = SessionData {
                        token: candidate.to_string(),
                        acquired_at: None,
                    };
                }
                Ok(candidate.to_string())
            }
            Ok(false) => {
                info!(age_minutes = ?data.age_minutes(), "Refreshing token");
                self.acquire_locked(data).await
            }
            Err(e) => {
                warn!(error = %e, "Envoy check failed, refreshing token");
                self.acquire_locked(data).await
            }
        }
    }
}
