//! Production telemetry from the Envoy.
//!
//! `/ivp/pdm/energy` returns a document shaped like
//! `{"production": {"pcu": {...}, "rgm": {...}}, "consumption": {...}}`;
//! the relay only exposes the microinverter (`pcu`) section.

use serde_json::Value;
use tracing::{debug, warn};

use crate::api::ApiError;
use crate::auth::Session;

/// Pull `production.pcu` out of an energy document.
pub fn extract_pcu(mut data: Value) -> Result<Value, ApiError> {
    let production = match data.get_mut("production") {
        Some(Value::Object(production)) => production,
        Some(_) => {
            return Err(ApiError::MalformedPayload(
                "\"production\" is not an object".to_string(),
            ))
        }
        None => {
            return Err(ApiError::MalformedPayload(
                "missing \"production\"".to_string(),
            ))
        }
    };

    match production.remove("pcu") {
        Some(pcu @ Value::Object(_)) => Ok(pcu),
        Some(_) => Err(ApiError::MalformedPayload(
            "\"production.pcu\" is not an object".to_string(),
        )),
        None => Err(ApiError::MalformedPayload(
            "missing \"production.pcu\"".to_string(),
        )),
    }
}

/// Validate the session token and return the current `production.pcu`.
///
/// A 401 from the energy endpoint discards the stored token so the next
/// call logs in again; other failures leave it alone.
pub async fn fetch_production(session: &Session) -> Result<Value, ApiError> {
    let token = session.ensure_valid().await?;

    let data = match session.api().fetch_energy(&token).await {
        Ok(data) => data,
        Err(ApiError::Unauthorized) => {
            warn!("Envoy refused a freshly validated token");
            session.invalidate().await;
            return Err(ApiError::Unauthorized);
        }
        Err(e) => return Err(e),
    };

    let pcu = extract_pcu(data)?;
    debug!("Fetched production data");
    Ok(pcu)
}
