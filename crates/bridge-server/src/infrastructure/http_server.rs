//! HTTP server: router, handlers, and the process bootstrap.
//!
//! # Route map
//!
//! ```text
//! public   GET  /auth/status           POST /auth/login     POST /auth/logout
//! guarded  GET  /config
//!          GET  /stream/status         GET  /stream/frame
//!          GET  /stream/windows        POST /stream/select-window
//!          GET  /stream/displays       POST /stream/select-display
//!          POST /stream/start          POST /stream/stop
//!          POST /send                  POST /navigate
//! fallback      static files from the public directory
//! ```
//!
//! "Guarded" routes sit behind [`require_session`]; a request without a
//! valid session cookie gets `401` and the handler never runs.
//!
//! Request bodies are parsed leniently: an empty body is treated as `{}` so
//! that `fetch(url, {method: "POST"})` from the web client works without a
//! JSON content type.

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, EXPIRES, PRAGMA, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use bridge_core::{PasscodeVerifier, SystemClock, WindowInfo};

use crate::application::{
    CommandRelay, DesktopCatalog, FrameCaptureLoop, RelayError, SessionStore,
};
use crate::domain::messages::{
    AuthStatusResponse, CaptureStatus, CaptureStatusEnvelope, ClientConfigResponse,
    DisplayListResponse, ErrorResponse, LoginRequest, LoginResponse, NavigateRequest,
    NavigateResponse, OkResponse, SelectDisplayRequest, SelectWindowRequest, SendRequest,
    WindowListResponse,
};
use crate::domain::{BridgeConfig, RequestedId};
use crate::infrastructure::auth_gate::{
    clear_cookie, is_https_request, read_cookie, require_session, session_cookie, user_agent,
};
use crate::infrastructure::desktop::MacDesktop;
use crate::infrastructure::notifier::NtfyNotifier;
use crate::infrastructure::snapshot_file::JsonSnapshotFile;

// ── State ─────────────────────────────────────────────────────────────────────

/// Services shared by every handler.  Cloning is cheap (all `Arc`s).
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub capture: Arc<FrameCaptureLoop>,
    pub catalog: Arc<dyn DesktopCatalog>,
    pub relay: Arc<CommandRelay>,
    pub config: Arc<BridgeConfig>,
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// A non-2xx response with a `{"error": "..."}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<RelayError> for ApiError {
    fn from(e: RelayError) -> Self {
        let status = match e {
            RelayError::EmptyMessage | RelayError::InvalidAction => StatusCode::BAD_REQUEST,
            RelayError::Busy => StatusCode::TOO_MANY_REQUESTS,
            RelayError::Script(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

/// Parses a JSON body, treating an empty body as `T::default()`.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {e}")))
}

// ── Router ────────────────────────────────────────────────────────────────────

/// Builds the full application router.
pub fn build_router(state: AppState) -> Router {
    let guarded = Router::new()
        .route("/config", get(client_config))
        .route("/stream/status", get(stream_status))
        .route("/stream/windows", get(list_windows))
        .route("/stream/select-window", post(select_window))
        .route("/stream/displays", get(list_displays))
        .route("/stream/select-display", post(select_display))
        .route("/stream/start", post(start_stream))
        .route("/stream/stop", post(stop_stream))
        .route("/stream/frame", get(stream_frame))
        .route("/send", post(send_message))
        .route("/navigate", post(navigate))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    Router::new()
        .route("/auth/status", get(auth_status))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .merge(guarded)
        .fallback_service(ServeDir::new(&state.config.public_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── Auth handlers ─────────────────────────────────────────────────────────────

async fn auth_status(State(state): State<AppState>, headers: HeaderMap) -> Json<AuthStatusResponse> {
    let token = read_cookie(&headers, &state.config.session_cookie_name);
    let session = state
        .sessions
        .validate_session(token.as_deref(), user_agent(&headers))
        .await;

    Json(AuthStatusResponse {
        authenticated: session.is_some(),
        expires_at: session.map(|s| s.expires_at),
        session_ttl_ms: state.sessions.session_ttl_ms(),
    })
}

async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request: LoginRequest = parse_body(&body)?;
    let session = state
        .sessions
        .login(request.candidate().as_deref(), user_agent(&headers))
        .await
        .map_err(|_| {
            warn!("login rejected: invalid passcode");
            ApiError::new(StatusCode::UNAUTHORIZED, "Invalid passcode")
        })?;

    let ttl_ms = state.sessions.session_ttl_ms();
    let cookie = session_cookie(
        &state.config.session_cookie_name,
        &session.token,
        ttl_ms / 1_000,
        is_https_request(&headers),
    );
    info!("login accepted; session expires at {}", session.expires_at);

    Ok((
        [(SET_COOKIE, cookie)],
        Json(LoginResponse {
            status: "ok",
            expires_at: session.expires_at,
            session_ttl_ms: ttl_ms,
        }),
    )
        .into_response())
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let name = &state.config.session_cookie_name;
    let token = read_cookie(&headers, name);
    state.sessions.revoke_session(token.as_deref()).await;
    ([(SET_COOKIE, clear_cookie(name))], Json(OkResponse::OK)).into_response()
}

async fn client_config(State(state): State<AppState>) -> Json<ClientConfigResponse> {
    let config = &state.config;
    Json(ClientConfigResponse {
        ntfy_topic: config.ntfy_topic.clone(),
        done_delay_ms: config.done_delay.as_millis() as u64,
        stream_interval_ms: config.stream_interval.as_millis() as u64,
    })
}

// ── Stream handlers ───────────────────────────────────────────────────────────

async fn stream_status(State(state): State<AppState>) -> Json<CaptureStatus> {
    Json(state.capture.status())
}

async fn list_windows(State(state): State<AppState>) -> Result<Json<WindowListResponse>, ApiError> {
    let windows = state.catalog.list_windows().await.map_err(|e| {
        error!("failed to list windows: {e}");
        ApiError::internal("Failed to list windows")
    })?;
    let selected_window_id = state.capture.selected_window().map(|w| w.id);
    info!(
        "window list loaded (count={}, selected={selected_window_id:?})",
        windows.len()
    );
    Ok(Json(WindowListResponse {
        windows,
        selected_window_id,
    }))
}

async fn list_displays(
    State(state): State<AppState>,
) -> Result<Json<DisplayListResponse>, ApiError> {
    let displays = state.catalog.list_displays().await.map_err(|e| {
        error!("failed to list displays: {e}");
        ApiError::internal("Failed to list displays")
    })?;
    Ok(Json(DisplayListResponse {
        selected_display_id: state.capture.selected_display().map(|d| d.id),
        displays,
    }))
}

async fn select_window(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<CaptureStatusEnvelope>, ApiError> {
    let request: SelectWindowRequest = parse_body(&body)?;
    match RequestedId::from_json(request.window_id.as_ref()) {
        RequestedId::Clear => {
            state.capture.clear_selected_window();
            info!("cleared selected window; using app window auto mode");
        }
        RequestedId::Invalid => {
            return Err(ApiError::bad_request("windowId must be a positive integer"));
        }
        RequestedId::Id(id) => {
            let window = find_window(&state, id).await?;
            state
                .capture
                .set_selected_window(&window)
                .map_err(|e| ApiError::bad_request(e.to_string()))?;
            state.capture.clear_selected_display();
            info!(
                "selected window id={} app=\"{}\" title=\"{}\"",
                window.id, window.app_name, window.title
            );
        }
    }
    capture_now(&state, "Failed to set selected window").await
}

async fn find_window(state: &AppState, id: i64) -> Result<WindowInfo, ApiError> {
    let windows = state.catalog.list_windows().await.map_err(|e| {
        error!("failed to list windows: {e}");
        ApiError::internal("Failed to set selected window")
    })?;
    windows.into_iter().find(|w| w.id == id).ok_or_else(|| {
        ApiError::new(
            StatusCode::NOT_FOUND,
            "Selected window not found. Refresh windows and select again.",
        )
    })
}

async fn select_display(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<CaptureStatusEnvelope>, ApiError> {
    let request: SelectDisplayRequest = parse_body(&body)?;
    match RequestedId::from_json(request.display_id.as_ref()) {
        RequestedId::Clear => {
            state.capture.clear_selected_display();
            info!("cleared selected display");
        }
        RequestedId::Invalid => {
            return Err(ApiError::bad_request("displayId must be a positive integer"));
        }
        RequestedId::Id(id) => {
            let displays = state.catalog.list_displays().await.map_err(|e| {
                error!("failed to list displays: {e}");
                ApiError::internal("Failed to set selected display")
            })?;
            let chosen = displays.into_iter().find(|d| d.id == id).ok_or_else(|| {
                ApiError::new(
                    StatusCode::NOT_FOUND,
                    "Selected display not found. Refresh displays and select again.",
                )
            })?;
            state
                .capture
                .set_selected_display(&chosen)
                .map_err(|e| ApiError::bad_request(e.to_string()))?;
            state.capture.clear_selected_window();
            info!("selected display id={}", chosen.id);
        }
    }
    capture_now(&state, "Failed to set selected display").await
}

/// Captures once so the client sees the new target immediately.
async fn capture_now(
    state: &AppState,
    failure: &'static str,
) -> Result<Json<CaptureStatusEnvelope>, ApiError> {
    state.capture.capture_frame().await.map_err(|e| {
        error!("capture after selection failed: {e}");
        ApiError::internal(failure)
    })?;
    Ok(Json(state.capture.status().into()))
}

async fn start_stream(State(state): State<AppState>) -> Json<CaptureStatusEnvelope> {
    state.capture.start();
    info!("live view started");
    Json(state.capture.status().into())
}

async fn stop_stream(State(state): State<AppState>) -> Json<CaptureStatusEnvelope> {
    state.capture.stop();
    info!("live view stopped");
    Json(state.capture.status().into())
}

async fn stream_frame(State(state): State<AppState>) -> Result<Response, ApiError> {
    if !state.capture.is_running() {
        state.capture.start();
    }
    if !state.capture.frame_exists().await {
        return Err(ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "Frame not ready yet",
        ));
    }

    let jpeg = state.capture.read_frame().await.map_err(|e| {
        error!("failed to read frame: {e}");
        ApiError::internal("Failed to read frame")
    })?;
    Ok((
        [
            (CONTENT_TYPE, "image/jpeg"),
            (
                CACHE_CONTROL,
                "no-store, no-cache, must-revalidate, proxy-revalidate",
            ),
            (PRAGMA, "no-cache"),
            (EXPIRES, "0"),
        ],
        jpeg,
    )
        .into_response())
}

// ── Command relay ─────────────────────────────────────────────────────────────

async fn send_message(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<OkResponse>, ApiError> {
    let request: SendRequest = parse_body(&body)?;
    if let Err(e) = state.relay.submit(request.message.as_deref()) {
        warn!("send rejected: {e}");
        return Err(e.into());
    }
    info!("send accepted");
    Ok(Json(OkResponse::OK))
}

async fn navigate(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<NavigateResponse>, ApiError> {
    let request: NavigateRequest = parse_body(&body)?;
    match state.relay.navigate(request.action.as_deref()).await {
        Ok(action) => Ok(Json(NavigateResponse {
            status: "ok",
            action: action.as_str(),
        })),
        Err(RelayError::Script(e)) => {
            error!("navigation failed: {e}");
            Err(ApiError::internal("Failed to navigate"))
        }
        Err(e) => {
            warn!("navigate rejected: {e}");
            Err(e.into())
        }
    }
}

// ── Bootstrap ─────────────────────────────────────────────────────────────────

/// Wires every service from `config`, serves HTTP until `shutdown` resolves,
/// then stops the capture loop and the session sweep.
///
/// # Errors
///
/// Returns an error if the HTTP client or the listener cannot be set up, or
/// if the server fails while running.
pub async fn run_bridge<F>(config: BridgeConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let clock = Arc::new(SystemClock);
    let desktop = Arc::new(MacDesktop::new(&config.scripts_dir));

    let sessions = Arc::new(SessionStore::new(
        PasscodeVerifier::new(config.passcode.clone()),
        config.session_ttl,
        Arc::new(JsonSnapshotFile::new(&config.session_store_path)),
        clock.clone(),
    ));
    if !sessions.is_passcode_configured() {
        warn!("no passcode configured; every login attempt will be rejected");
    }
    sessions.load_from_disk().await;
    sessions.cleanup_expired().await;
    let sweeper = sessions.spawn_cleanup_task(config.cleanup_interval);

    let capture = Arc::new(FrameCaptureLoop::new(
        desktop.clone(),
        clock,
        config.frame_path.clone(),
        config.stream_interval,
    ));
    let notifier = NtfyNotifier::new(config.ntfy_url())
        .context("failed to initialise the notification HTTP client")?;
    let relay = Arc::new(CommandRelay::new(
        desktop.clone(),
        Arc::new(notifier),
        config.done_delay,
    ));

    let bind_addr = config.bind_addr;
    let state = AppState {
        sessions,
        capture: capture.clone(),
        catalog: desktop,
        relay,
        config: Arc::new(config),
    };

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {bind_addr}"))?;
    info!("bridge listening on http://{bind_addr}");

    let served = axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await;

    capture.stop();
    sweeper.abort();
    served.context("HTTP server failed")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Sample {
        #[serde(default)]
        value: Option<u32>,
    }

    #[test]
    fn test_empty_body_parses_as_default() {
        assert_eq!(parse_body::<Sample>(&Bytes::new()).unwrap(), Sample::default());
        assert_eq!(
            parse_body::<Sample>(&Bytes::from_static(b"  \n")).unwrap(),
            Sample::default()
        );
    }

    #[test]
    fn test_json_body_is_parsed() {
        let sample = parse_body::<Sample>(&Bytes::from_static(br#"{"value":7}"#)).unwrap();
        assert_eq!(sample.value, Some(7));
    }

    #[test]
    fn test_malformed_body_is_bad_request() {
        let err = parse_body::<Sample>(&Bytes::from_static(b"{nope")).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_relay_errors_map_to_status_codes() {
        assert_eq!(ApiError::from(RelayError::Busy).status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            ApiError::from(RelayError::EmptyMessage).status,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(RelayError::EmptyMessage).message,
            "Message is required"
        );
        assert_eq!(
            ApiError::from(RelayError::InvalidAction).status,
            StatusCode::BAD_REQUEST
        );
    }
}
