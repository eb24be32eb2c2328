//! JSON request and response types for the browser-facing HTTP API.
//!
//! Field names are camelCase on the wire because the web client is written
//! in JavaScript, e.g.:
//!
//! ```json
//! {"running":true,"intervalMs":1000,"lastCaptureAt":1700000000000,"mode":"claude-window",
//!  "selectedWindow":null,"selectedDisplay":null}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use bridge_core::{CaptureMode, DisplayInfo, WindowInfo};

// ── Auth ──────────────────────────────────────────────────────────────────────

/// Body of `POST /auth/login`.
///
/// `passcode` is kept as raw JSON so that a numeric passcode such as
/// `123456` is compared as text instead of failing deserialization.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub passcode: Option<Value>,
}

impl LoginRequest {
    /// Textual form of the submitted passcode.  Strings, numbers and booleans
    /// are stringified; any other shape yields `None`, which never matches.
    pub fn candidate(&self) -> Option<String> {
        match self.passcode.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

/// Response of `GET /auth/status`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatusResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
    pub session_ttl_ms: u64,
}

/// Response of a successful `POST /auth/login`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub status: &'static str,
    pub expires_at: u64,
    pub session_ttl_ms: u64,
}

/// `{"status":"ok"}`
#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub status: &'static str,
}

impl OkResponse {
    pub const OK: Self = Self { status: "ok" };
}

/// `{"error":"…"}` body used by every non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ── Client config ─────────────────────────────────────────────────────────────

/// Response of `GET /config`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfigResponse {
    pub ntfy_topic: String,
    pub done_delay_ms: u64,
    pub stream_interval_ms: u64,
}

// ── Capture ───────────────────────────────────────────────────────────────────

/// Snapshot of the frame capture loop, derived on demand.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureStatus {
    pub running: bool,
    pub interval_ms: u64,
    pub last_capture_at: Option<u64>,
    pub mode: CaptureMode,
    pub selected_window: Option<WindowInfo>,
    pub selected_display: Option<DisplayInfo>,
}

/// `{"status":"ok", ...CaptureStatus}` returned by the stream control routes.
#[derive(Debug, Serialize)]
pub struct CaptureStatusEnvelope {
    pub status: &'static str,
    #[serde(flatten)]
    pub capture: CaptureStatus,
}

impl From<CaptureStatus> for CaptureStatusEnvelope {
    fn from(capture: CaptureStatus) -> Self {
        Self {
            status: "ok",
            capture,
        }
    }
}

/// Response of `GET /stream/windows`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowListResponse {
    pub windows: Vec<WindowInfo>,
    pub selected_window_id: Option<i64>,
}

/// Response of `GET /stream/displays`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayListResponse {
    pub displays: Vec<DisplayInfo>,
    pub selected_display_id: Option<i64>,
}

/// Body of `POST /stream/select-window`.
///
/// `windowId` may be a number, a numeric string, `null`, `""`, or absent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectWindowRequest {
    #[serde(default)]
    pub window_id: Option<Value>,
}

/// Body of `POST /stream/select-display`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectDisplayRequest {
    #[serde(default)]
    pub display_id: Option<Value>,
}

/// What a selection request asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestedId {
    /// Absent, `null`, or empty string: clear the selection.
    Clear,
    /// A positive integer id.
    Id(i64),
    /// Anything else (non-numeric, zero, negative, fractional).
    Invalid,
}

impl RequestedId {
    /// Interprets the raw `windowId` / `displayId` JSON value.
    pub fn from_json(raw: Option<&Value>) -> Self {
        let parsed = match raw {
            None | Some(Value::Null) => return Self::Clear,
            Some(Value::String(s)) if s.trim().is_empty() => return Self::Clear,
            Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
            Some(Value::Number(n)) => n.as_i64(),
            Some(_) => None,
        };
        match parsed {
            Some(id) if id > 0 => Self::Id(id),
            _ => Self::Invalid,
        }
    }
}

// ── Command relay ─────────────────────────────────────────────────────────────

/// Body of `POST /send`.
#[derive(Debug, Default, Deserialize)]
pub struct SendRequest {
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of `POST /navigate`.
#[derive(Debug, Default, Deserialize)]
pub struct NavigateRequest {
    #[serde(default)]
    pub action: Option<String>,
}

/// Response of a successful `POST /navigate`.
#[derive(Debug, Serialize)]
pub struct NavigateResponse {
    pub status: &'static str,
    pub action: &'static str,
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn status() -> CaptureStatus {
        CaptureStatus {
            running: true,
            interval_ms: 1000,
            last_capture_at: None,
            mode: CaptureMode::Screen,
            selected_window: None,
            selected_display: None,
        }
    }

    #[test]
    fn test_capture_status_uses_camel_case_and_nulls() {
        let value = serde_json::to_value(status()).unwrap();
        assert_eq!(
            value,
            json!({
                "running": true,
                "intervalMs": 1000,
                "lastCaptureAt": null,
                "mode": "screen",
                "selectedWindow": null,
                "selectedDisplay": null
            })
        );
    }

    #[test]
    fn test_status_envelope_flattens_capture_fields() {
        let value = serde_json::to_value(CaptureStatusEnvelope::from(status())).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["mode"], "screen");
        assert_eq!(value["intervalMs"], 1000);
    }

    #[test]
    fn test_auth_status_omits_expiry_when_unauthenticated() {
        let value = serde_json::to_value(AuthStatusResponse {
            authenticated: false,
            expires_at: None,
            session_ttl_ms: 5,
        })
        .unwrap();
        assert_eq!(value, json!({"authenticated": false, "sessionTtlMs": 5}));
    }

    #[test]
    fn test_requested_id_clear_variants() {
        assert_eq!(RequestedId::from_json(None), RequestedId::Clear);
        assert_eq!(RequestedId::from_json(Some(&json!(null))), RequestedId::Clear);
        assert_eq!(RequestedId::from_json(Some(&json!(""))), RequestedId::Clear);
        assert_eq!(RequestedId::from_json(Some(&json!("  "))), RequestedId::Clear);
    }

    #[test]
    fn test_requested_id_accepts_numbers_and_numeric_strings() {
        assert_eq!(RequestedId::from_json(Some(&json!(42))), RequestedId::Id(42));
        assert_eq!(RequestedId::from_json(Some(&json!("42"))), RequestedId::Id(42));
    }

    #[test]
    fn test_requested_id_rejects_non_positive_and_garbage() {
        for raw in [json!(0), json!(-5), json!("-5"), json!("abc"), json!(1.5), json!(true), json!([1])] {
            assert_eq!(RequestedId::from_json(Some(&raw)), RequestedId::Invalid, "{raw}");
        }
    }

    #[test]
    fn test_login_candidate_stringifies_scalars() {
        let parse = |raw: &str| serde_json::from_str::<LoginRequest>(raw).unwrap().candidate();

        assert_eq!(parse(r#"{"passcode":"123456"}"#).as_deref(), Some("123456"));
        assert_eq!(parse(r#"{"passcode":123456}"#).as_deref(), Some("123456"));
        assert_eq!(parse(r#"{"passcode":true}"#).as_deref(), Some("true"));
        assert_eq!(parse(r#"{"passcode":[1,2]}"#), None);
        assert_eq!(parse(r#"{"passcode":null}"#), None);
        assert_eq!(parse("{}"), None);
    }

    #[test]
    fn test_select_window_request_accepts_missing_field() {
        let req: SelectWindowRequest = serde_json::from_str("{}").unwrap();
        assert!(req.window_id.is_none());
    }
}
