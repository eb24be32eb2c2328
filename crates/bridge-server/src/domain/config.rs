//! Bridge configuration types.
//!
//! [`BridgeConfig`] is the single source of truth for all runtime settings.
//! It is assembled once in `main.rs` from CLI arguments, environment
//! variables, and an optional TOML file, then shared behind an `Arc`.
//!
//! Keeping configuration as a plain struct (no global state, no environment
//! reads in here) makes every service easy to construct in tests.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// File name of the captured frame inside the system temp directory.
pub const DEFAULT_FRAME_FILE: &str = "claude-bridge-latest-frame.jpg";

/// Cookie that carries the session token.
pub const DEFAULT_SESSION_COOKIE: &str = "claude_bridge_session";

/// All runtime configuration for the bridge.
#[derive(Clone)]
pub struct BridgeConfig {
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,

    /// Shared login passcode.  Empty disables login entirely.
    pub passcode: String,

    /// Lifetime of a session from the moment it is issued.
    pub session_ttl: Duration,

    /// Where the session snapshot is written.
    pub session_store_path: PathBuf,

    /// Name of the session cookie.
    pub session_cookie_name: String,

    /// How often expired sessions are swept in the background.
    pub cleanup_interval: Duration,

    /// Delay between frame captures while the stream is running.
    pub stream_interval: Duration,

    /// Fixed path of the latest captured frame.
    pub frame_path: PathBuf,

    /// Directory holding the AppleScript / Swift helper scripts.
    pub scripts_dir: PathBuf,

    /// Directory served as static files (the web client).
    pub public_dir: PathBuf,

    /// Time between typing a message and sending the "done" notification.
    pub done_delay: Duration,

    /// Base URL of the ntfy server, e.g. `https://ntfy.sh`.
    pub ntfy_server: String,

    /// ntfy topic the web client subscribes to.
    pub ntfy_topic: String,
}

impl BridgeConfig {
    /// Full URL that done notifications are POSTed to.
    pub fn ntfy_url(&self) -> String {
        format!(
            "{}/{}",
            self.ntfy_server.trim_end_matches('/'),
            self.ntfy_topic
        )
    }
}

impl Default for BridgeConfig {
    /// | Field               | Default                                   |
    /// |---------------------|-------------------------------------------|
    /// | bind_addr           | `0.0.0.0:3456`                            |
    /// | passcode            | empty (login disabled)                    |
    /// | session_ttl         | 24 hours                                  |
    /// | session_store_path  | `data/sessions.json`                      |
    /// | cleanup_interval    | 10 minutes                                |
    /// | stream_interval     | 1 second                                  |
    /// | frame_path          | `<tmp>/claude-bridge-latest-frame.jpg`    |
    /// | done_delay          | 2 seconds                                 |
    /// | ntfy                | `https://ntfy.sh/default-claude-bridge`   |
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3456)),
            passcode: String::new(),
            session_ttl: Duration::from_secs(24 * 60 * 60),
            session_store_path: PathBuf::from("data").join("sessions.json"),
            session_cookie_name: DEFAULT_SESSION_COOKIE.to_string(),
            cleanup_interval: Duration::from_secs(10 * 60),
            stream_interval: Duration::from_millis(1_000),
            frame_path: std::env::temp_dir().join(DEFAULT_FRAME_FILE),
            scripts_dir: PathBuf::from("scripts"),
            public_dir: PathBuf::from("public"),
            done_delay: Duration::from_millis(2_000),
            ntfy_server: "https://ntfy.sh".to_string(),
            ntfy_topic: "default-claude-bridge".to_string(),
        }
    }
}

impl fmt::Debug for BridgeConfig {
    // Hand-written so the passcode never ends up in a log line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("bind_addr", &self.bind_addr)
            .field("passcode", &if self.passcode.is_empty() { "<unset>" } else { "<redacted>" })
            .field("session_ttl", &self.session_ttl)
            .field("session_store_path", &self.session_store_path)
            .field("session_cookie_name", &self.session_cookie_name)
            .field("cleanup_interval", &self.cleanup_interval)
            .field("stream_interval", &self.stream_interval)
            .field("frame_path", &self.frame_path)
            .field("scripts_dir", &self.scripts_dir)
            .field("public_dir", &self.public_dir)
            .field("done_delay", &self.done_delay)
            .field("ntfy_url", &self.ntfy_url())
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
