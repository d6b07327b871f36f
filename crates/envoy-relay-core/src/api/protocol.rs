//! Text markers the portal and the Envoy use to signal outcomes.
//!
//! Neither side returns structured status for these cases, so the relay
//! matches literal substrings. If Enphase rewords a page, this is the only
//! file that changes.

/// Substring in the login page when the username or password is rejected.
pub const LOGIN_REJECTED_MARKER: &str = "Wrong username or password";

/// Substring in the `/auth/check_jwt` body when the Envoy accepts the token.
pub const TOKEN_VALID_MARKER: &str = "Valid token.";

/// Whether a login response body reports bad credentials.
pub fn is_login_rejected(body: &str) -> bool {
    body.contains(LOGIN_REJECTED_MARKER)
}

/// Whether a `check_jwt` response body confirms the token.
pub fn is_token_accepted(body: &str) -> bool {
    body.contains(TOKEN_VALID_MARKER)
}
