//! HTTP server for envoy-relay

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use envoy_relay_core::{telemetry, ApiError, Session};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Application state shared across handlers
pub struct AppState {
    pub session: Arc<Session>,
}

impl AppState {
    pub fn new(session: Session) -> Self {
        Self {
            session: Arc::new(session),
        }
    }
}

type AppStateArc = Arc<AppState>;

pub fn router(state: AppStateArc) -> Router {
    Router::new()
        .route("/production/", get(get_production))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until Ctrl-C or SIGTERM
pub async fn run(state: AppState, bind: SocketAddr) -> Result<()> {
    let app = router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!("Listening on http://{}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn get_production(State(state): State<AppStateArc>) -> Result<Json<Value>, ErrorResponse> {
    let pcu = telemetry::fetch_production(&state.session).await?;
    Ok(Json(pcu))
}

/// JSON error body: `{"error": "..."}`
#[derive(Debug)]
pub struct ErrorResponse {
    status: StatusCode,
    message: String,
}

impl From<ApiError> for ErrorResponse {
    fn from(e: ApiError) -> Self {
        let status = match e {
            ApiError::DeviceUnreachable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_GATEWAY,
        };
        if e.is_fatal() {
            error!(error = %e, "Enlighten credentials rejected, check ENLIGHTEN_USERNAME/ENLIGHTEN_PASSWORD");
        } else {
            error!(error = ?e, "Production request failed");
        }
        // These carry upstream response bodies, which stay in the log
        let message = match e {
            ApiError::NotFound(_) | ApiError::ServerError(_) | ApiError::InvalidResponse(_) => {
                "Unexpected response from Envoy".to_string()
            }
            _ => e.to_string(),
        };
        Self { status, message }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
