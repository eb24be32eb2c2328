//! Session records and the in-memory session table.
//!
//! A [`Session`] is issued after a successful passcode check and grants access
//! until `expires_at`.  It may be bound to the `User-Agent` string of the
//! browser that created it; a request from a different user agent destroys
//! the session instead of using it.
//!
//! # Lifecycle
//!
//! ```text
//! issue() ──► Valid ──(now > expires_at)──────────► removed on validate()/remove_expired()
//!               │
//!               ├──(different user agent)─────────► removed on validate()
//!               └──(revoke)───────────────────────► removed
//! ```
//!
//! Sessions are never modified in place: there is no sliding expiry and the
//! user-agent binding is never renegotiated.
//!
//! # Snapshot format
//!
//! The table is persisted as a JSON object keyed by token:
//!
//! ```json
//! {
//!   "9f1c…": { "createdAt": 1700000000000, "expiresAt": 1700086400000, "userAgent": "Mozilla/5.0 …" }
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use rand::rngs::OsRng;
use rand::RngCore;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Number of random bytes in a session token (256 bits).
pub const TOKEN_BYTES: usize = 32;

/// A server-issued credential granting time-bounded access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// 64 lowercase hex characters.
    pub token: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: u64,
    /// Milliseconds since the Unix epoch; the session is valid up to and
    /// including this instant.
    pub expires_at: u64,
    /// User agent observed at creation.  Empty means "not bound".
    pub user_agent: String,
}

impl Session {
    /// Returns `true` once `now_ms` is strictly past `expires_at`.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms > self.expires_at
    }

    /// Returns `true` if this session may be used by `user_agent`.
    pub fn accepts_user_agent(&self, user_agent: &str) -> bool {
        self.user_agent.is_empty() || self.user_agent == user_agent
    }
}

/// Outcome of [`SessionTable::validate`].
///
/// The rejected variants tell the caller whether the table was modified (and
/// therefore needs to be persisted).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCheck {
    /// The session exists, is unexpired, and matches the user agent.
    Valid(Session),
    /// No token was supplied, or the token is unknown.  Table unchanged.
    Missing,
    /// The session had expired and has been removed.
    Expired,
    /// The session was bound to another user agent and has been removed.
    BindingMismatch,
}

impl SessionCheck {
    /// Returns `true` if validation removed the session from the table.
    pub fn removed_session(&self) -> bool {
        matches!(self, Self::Expired | Self::BindingMismatch)
    }

    /// Converts the outcome into the session, if it was valid.
    pub fn into_session(self) -> Option<Session> {
        match self {
            Self::Valid(session) => Some(session),
            _ => None,
        }
    }
}

/// Generates a fresh 256-bit token from the operating system CSPRNG,
/// rendered as lowercase hex.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// In-memory map of token → [`Session`].
///
/// All methods take the current time explicitly so that expiry rules are
/// deterministic under test.
#[derive(Debug)]
pub struct SessionTable {
    sessions: HashMap<String, Session>,
    ttl_ms: u64,
}

impl SessionTable {
    /// Creates an empty table whose sessions live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            ttl_ms: ttl.as_millis() as u64,
        }
    }

    /// Session lifetime in milliseconds.
    pub fn ttl_ms(&self) -> u64 {
        self.ttl_ms
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Looks up a session without any expiry or binding checks.
    pub fn get(&self, token: &str) -> Option<&Session> {
        self.sessions.get(token)
    }

    /// Creates and stores a new session bound to `user_agent`.
    pub fn issue(&mut self, user_agent: &str, now_ms: u64) -> Session {
        // 256 random bits make a collision practically impossible, but the
        // uniqueness invariant is cheap to enforce.
        let mut token = generate_token();
        while self.sessions.contains_key(&token) {
            token = generate_token();
        }

        let session = Session {
            token: token.clone(),
            created_at: now_ms,
            expires_at: now_ms.saturating_add(self.ttl_ms),
            user_agent: user_agent.to_string(),
        };
        self.sessions.insert(token, session.clone());
        session
    }

    /// Validates `token` for a request carrying `user_agent`.
    ///
    /// Expired sessions and sessions bound to a different user agent are
    /// removed as a side effect.
    pub fn validate(&mut self, token: Option<&str>, user_agent: &str, now_ms: u64) -> SessionCheck {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return SessionCheck::Missing;
        };
        let Some(session) = self.sessions.get(token) else {
            return SessionCheck::Missing;
        };

        if session.is_expired_at(now_ms) {
            self.sessions.remove(token);
            return SessionCheck::Expired;
        }

        if !session.accepts_user_agent(user_agent) {
            self.sessions.remove(token);
            return SessionCheck::BindingMismatch;
        }

        SessionCheck::Valid(session.clone())
    }

    /// Removes `token`.  Returns `true` if a session was deleted.
    pub fn revoke(&mut self, token: &str) -> bool {
        !token.is_empty() && self.sessions.remove(token).is_some()
    }

    /// Removes every session with `now_ms > expires_at`.  Returns the number
    /// removed.
    pub fn remove_expired(&mut self, now_ms: u64) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !s.is_expired_at(now_ms));
        before - self.sessions.len()
    }

    /// Replaces the whole table with `sessions` (used when loading a snapshot).
    pub fn replace_all(&mut self, sessions: impl IntoIterator<Item = Session>) {
        self.sessions = sessions
            .into_iter()
            .map(|s| (s.token.clone(), s))
            .collect();
    }

    /// Iterates over all stored sessions in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }
}

// ── Snapshot (de)serialization ────────────────────────────────────────────────

/// Error type for snapshot decoding.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The file content is not valid JSON.
    #[error("session snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The top-level JSON value is not an object.
    #[error("session snapshot must be a JSON object keyed by token")]
    NotAnObject,
}

/// One on-disk record (the token is the map key).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionRecord<'a> {
    created_at: u64,
    expires_at: u64,
    user_agent: &'a str,
}

/// Result of decoding a snapshot.
#[derive(Debug, Default)]
pub struct ParsedSnapshot {
    /// Records that decoded cleanly.
    pub sessions: Vec<Session>,
    /// Tokens whose records were dropped because they were malformed.
    pub discarded: Vec<String>,
}

/// Decodes a snapshot file.
///
/// Empty (or whitespace-only) input yields no sessions.  A record whose
/// `createdAt` or `expiresAt` is not an integer (a JSON integer or a string
/// containing one) is left out and its token reported in `discarded`; it never
/// fails the whole load.
///
/// # Errors
///
/// Returns [`SnapshotError`] if the input is not JSON or not a JSON object.
pub fn parse_snapshot(raw: &str) -> Result<ParsedSnapshot, SnapshotError> {
    if raw.trim().is_empty() {
        return Ok(ParsedSnapshot::default());
    }

    let value: Value = serde_json::from_str(raw)?;
    let Value::Object(entries) = value else {
        return Err(SnapshotError::NotAnObject);
    };

    let mut parsed = ParsedSnapshot::default();
    for (token, record) in entries {
        match decode_record(&token, &record) {
            Some(session) => parsed.sessions.push(session),
            None => parsed.discarded.push(token),
        }
    }
    Ok(parsed)
}

/// Encodes sessions as a pretty-printed snapshot, sorted by token so the file
/// is stable between writes.
///
/// # Errors
///
/// Propagates serialization errors from `serde_json`.
pub fn render_snapshot<'a>(
    sessions: impl IntoIterator<Item = &'a Session>,
) -> Result<String, serde_json::Error> {
    let records: BTreeMap<&str, SessionRecord<'_>> = sessions
        .into_iter()
        .map(|s| {
            (
                s.token.as_str(),
                SessionRecord {
                    created_at: s.created_at,
                    expires_at: s.expires_at,
                    user_agent: &s.user_agent,
                },
            )
        })
        .collect();
    serde_json::to_string_pretty(&records)
}

fn decode_record(token: &str, record: &Value) -> Option<Session> {
    if token.is_empty() {
        return None;
    }
    let fields = record.as_object()?;
    let created_at = integer_field(fields.get("createdAt")?)?;
    let expires_at = integer_field(fields.get("expiresAt")?)?;
    let user_agent = match fields.get("userAgent") {
        Some(Value::String(ua)) => ua.clone(),
        _ => String::new(),
    };

    Some(Session {
        token: token.to_string(),
        created_at,
        expires_at,
        user_agent,
    })
}

fn integer_field(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
