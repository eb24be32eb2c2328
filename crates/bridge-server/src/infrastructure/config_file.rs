//! Optional TOML configuration file.
//!
//! Every field is optional: the file only supplies values the command line
//! and environment leave unset.  Precedence is CLI/env → file → built-in
//! default, resolved in `main.rs`.
//!
//! ```toml
//! [server]
//! port = 3456
//! bind = "0.0.0.0"
//! public_dir = "public"
//!
//! [auth]
//! passcode = "abc123"
//! session_ttl_ms = 86400000
//! session_store = "data/sessions.json"
//! cleanup_interval_secs = 600
//!
//! [stream]
//! interval_ms = 1000
//! frame_path = "/tmp/claude-bridge-latest-frame.jpg"
//!
//! [relay]
//! scripts_dir = "scripts"
//! done_delay_ms = 2000
//! ntfy_server = "https://ntfy.sh"
//! ntfy_topic = "my-desk"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level layout of the config file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub server: ServerSection,
    pub auth: AuthSection,
    pub stream: StreamSection,
    pub relay: RelaySection,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub port: Option<u16>,
    pub bind: Option<String>,
    pub public_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AuthSection {
    pub passcode: Option<String>,
    pub session_ttl_ms: Option<u64>,
    pub session_store: Option<PathBuf>,
    pub cleanup_interval_secs: Option<u64>,
    pub cookie_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StreamSection {
    pub interval_ms: Option<u64>,
    pub frame_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RelaySection {
    pub scripts_dir: Option<PathBuf>,
    pub done_delay_ms: Option<u64>,
    pub ntfy_server: Option<String>,
    pub ntfy_topic: Option<String>,
}

/// Loads the config file at `path`, returning an empty [`FileConfig`] if the
/// file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed or has unknown keys.
pub fn load_config_file(path: &Path) -> Result<FileConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
