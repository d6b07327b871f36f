//! In-process stand-ins for the Enlighten portal and the Envoy.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Form, Router};

use crate::api::ApiClient;
use crate::auth::Credentials;
use crate::config::{CloudConfig, DeviceConfig};

pub const SESSION_COOKIE: &str = "session=abc";

/// Serve `router` on an ephemeral localhost port and return its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server");
    let addr = listener.local_addr().expect("mock server address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("mock server");
    });
    format!("http://{}", addr)
}

/// A base URL nothing listens on.
pub fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind throwaway listener");
    let addr = listener.local_addr().expect("throwaway listener address");
    drop(listener);
    format!("http://{}", addr)
}

pub fn credentials() -> Credentials {
    Credentials {
        username: "testuser".to_string(),
        password: "testpass".to_string(),
        site: "testsite".to_string(),
        serial: "123456".to_string(),
    }
}

pub fn client(cloud_base: &str, device_base: &str) -> ApiClient {
    client_with_timeout(cloud_base, device_base, Duration::from_secs(5))
}

pub fn client_with_timeout(cloud_base: &str, device_base: &str, timeout: Duration) -> ApiClient {
    let cloud = CloudConfig {
        login_url: format!("{}/login", cloud_base),
        token_url: format!("{}/entrez_tokens", cloud_base),
    };
    ApiClient::new(cloud, DeviceConfig::from_host(device_base), timeout)
        .expect("build test client")
}

// ----------------------------------------------------------------------------
// Cloud portal
// ----------------------------------------------------------------------------

pub struct CloudState {
    pub token: String,
    pub reject_login: bool,
    pub logins: AtomicUsize,
    pub token_requests: AtomicUsize,
    pub last_login_form: std::sync::Mutex<HashMap<String, String>>,
    pub last_token_form: std::sync::Mutex<HashMap<String, String>>,
}

pub struct MockCloud {
    pub base_url: String,
    pub state: Arc<CloudState>,
}

impl MockCloud {
    pub fn logins(&self) -> usize {
        self.state.logins.load(Ordering::SeqCst)
    }

    pub fn token_requests(&self) -> usize {
        self.state.token_requests.load(Ordering::SeqCst)
    }
}

async fn login(
    State(state): State<Arc<CloudState>>,
    Form(form): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    state.logins.fetch_add(1, Ordering::SeqCst);
    *state.last_login_form.lock().expect("login form lock") = form;
    let body = if state.reject_login {
        "<html><body><p class=\"alert\">Wrong username or password</p></body></html>"
    } else {
        "<html><body>Welcome</body></html>"
    };
    (
        [(header::SET_COOKIE, format!("{}; Path=/", SESSION_COOKIE))],
        body,
    )
}

async fn entrez_tokens(
    State(state): State<Arc<CloudState>>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    state.token_requests.fetch_add(1, Ordering::SeqCst);
    *state.last_token_form.lock().expect("token form lock") = form;
    let has_session = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains(SESSION_COOKIE))
        .unwrap_or(false);
    if has_session {
        format!(
            "<html><body><textarea name=\"accessToken\">\n  {}\n</textarea></body></html>",
            state.token
        )
    } else {
        "<html><body>Please log in</body></html>".to_string()
    }
}

pub async fn spawn_cloud(token: &str) -> MockCloud {
    spawn_cloud_with(token, false).await
}

pub async fn spawn_rejecting_cloud() -> MockCloud {
    spawn_cloud_with("unused", true).await
}

async fn spawn_cloud_with(token: &str, reject_login: bool) -> MockCloud {
    let state = Arc::new(CloudState {
        token: token.to_string(),
        reject_login,
        logins: AtomicUsize::new(0),
        token_requests: AtomicUsize::new(0),
        last_login_form: Default::default(),
        last_token_form: Default::default(),
    });
    let router = Router::new()
        .route("/login", post(login))
        .route("/entrez_tokens", post(entrez_tokens))
        .with_state(state.clone());
    MockCloud {
        base_url: serve(router).await,
        state,
    }
}

// ----------------------------------------------------------------------------
// Envoy
// ----------------------------------------------------------------------------

pub struct DeviceState {
    /// Token the device accepts; `None` rejects everything.
    pub valid_token: Option<String>,
    pub energy_status: StatusCode,
    pub energy_body: String,
    /// Hold `/ivp/pdm/energy` responses this long.
    pub energy_delay: Option<Duration>,
    pub checks: AtomicUsize,
    pub energy_requests: AtomicUsize,
}

pub struct MockDevice {
    pub base_url: String,
    pub state: Arc<DeviceState>,
}

impl MockDevice {
    pub fn checks(&self) -> usize {
        self.state.checks.load(Ordering::SeqCst)
    }

    pub fn energy_requests(&self) -> usize {
        self.state.energy_requests.load(Ordering::SeqCst)
    }
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

async fn check_jwt(State(state): State<Arc<DeviceState>>, headers: HeaderMap) -> &'static str {
    state.checks.fetch_add(1, Ordering::SeqCst);
    match (bearer(&headers), state.valid_token.as_deref()) {
        (Some(given), Some(valid)) if given == valid => "<!DOCTYPE html><h2>Valid token.</h2>",
        _ => "Invalid token",
    }
}

async fn energy(State(state): State<Arc<DeviceState>>, headers: HeaderMap) -> impl IntoResponse {
    state.energy_requests.fetch_add(1, Ordering::SeqCst);
    if let Some(delay) = state.energy_delay {
        tokio::time::sleep(delay).await;
    }
    match (bearer(&headers), state.valid_token.as_deref()) {
        (Some(given), Some(valid)) if given == valid => (
            state.energy_status,
            [(header::CONTENT_TYPE, "application/json")],
            state.energy_body.clone(),
        ),
        _ => (
            StatusCode::UNAUTHORIZED,
            [(header::CONTENT_TYPE, "application/json")],
            r#"{"status":401,"error":"","info":"Authentication required"}"#.to_string(),
        ),
    }
}

pub async fn spawn_device(valid_token: Option<&str>, energy_body: &str) -> MockDevice {
    spawn_device_with_status(valid_token, StatusCode::OK, energy_body).await
}

pub async fn spawn_device_with_status(
    valid_token: Option<&str>,
    energy_status: StatusCode,
    energy_body: &str,
) -> MockDevice {
    spawn_device_inner(valid_token, energy_status, energy_body, None).await
}

/// Device whose `check_jwt` answers at once but whose energy endpoint
/// stalls for `delay`.
pub async fn spawn_stalling_device(valid_token: &str, delay: Duration) -> MockDevice {
    spawn_device_inner(Some(valid_token), StatusCode::OK, ENERGY_BODY, Some(delay)).await
}

async fn spawn_device_inner(
    valid_token: Option<&str>,
    energy_status: StatusCode,
    energy_body: &str,
    energy_delay: Option<Duration>,
) -> MockDevice {
    let state = Arc::new(DeviceState {
        valid_token: valid_token.map(str::to_string),
        energy_status,
        energy_body: energy_body.to_string(),
        energy_delay,
        checks: AtomicUsize::new(0),
        energy_requests: AtomicUsize::new(0),
    });
    let router = Router::new()
        .route("/auth/check_jwt", get(check_jwt))
        .route("/ivp/pdm/energy", get(energy))
        .with_state(state.clone());
    MockDevice {
        base_url: serve(router).await,
        state,
    }
}

pub const ENERGY_BODY: &str =
    r#"{"production":{"pcu":{"activeCount":10,"wNow":2500,"whLifetime":1000000}},"consumption":{}}"#;
