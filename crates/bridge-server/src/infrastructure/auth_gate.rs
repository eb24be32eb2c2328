//! Session cookie handling and the route guard for protected endpoints.
//!
//! # How a request is authenticated
//!
//! 1. The `Cookie` header is searched for the session cookie.
//! 2. The token and the request's `User-Agent` go to
//!    `SessionStore::validate_session`, which also deletes expired or
//!    mismatched sessions.
//! 3. On success the [`Session`] is attached to the request extensions and
//!    the inner handler runs; otherwise the guard answers
//!    `401 {"error":"Unauthorized"}` and the handler never runs.
//!
//! Cookies are `HttpOnly; SameSite=Strict` and carry `Secure` only when the
//! request arrived over HTTPS (as reported by a proxy's `X-Forwarded-Proto`).

use axum::extract::{Request, State};
use axum::http::header::{COOKIE, USER_AGENT};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::debug;

use bridge_core::Session;

use crate::domain::messages::ErrorResponse;
use crate::infrastructure::http_server::AppState;

/// Returns the value of cookie `name`, if present and non-empty.
///
/// Every `Cookie` header is searched; the first match wins.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// The request's `User-Agent`, or `""` when absent or not valid text.
pub fn user_agent(headers: &HeaderMap) -> &str {
    headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

/// `true` when the first `X-Forwarded-Proto` value is `https`.
pub fn is_https_request(headers: &HeaderMap) -> bool {
    headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"))
}

/// `Set-Cookie` value that stores `token` for `max_age_secs`.
pub fn session_cookie(name: &str, token: &str, max_age_secs: u64, secure: bool) -> String {
    let mut cookie =
        format!("{name}={token}; Path=/; HttpOnly; SameSite=Strict; Max-Age={max_age_secs}");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that deletes the session cookie.
pub fn clear_cookie(name: &str) -> String {
    format!("{name}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0")
}

/// Route guard: rejects requests without a valid session.
///
/// Installed with `axum::middleware::from_fn_with_state` on the protected
/// sub-router.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = read_cookie(request.headers(), &state.config.session_cookie_name);
    let ua = user_agent(request.headers()).to_string();

    match state.sessions.validate_session(token.as_deref(), &ua).await {
        Some(session) => {
            request.extensions_mut().insert::<Session>(session);
            next.run(request).await
        }
        None => {
            debug!("rejected unauthenticated request to {}", request.uri().path());
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Unauthorized".to_string(),
                }),
            )
                .into_response()
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
