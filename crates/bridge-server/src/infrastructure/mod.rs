//! Infrastructure layer for bridge-server.
//!
//! The infrastructure layer handles all I/O: serving HTTP, reading cookies,
//! running the macOS helper programs, writing files, and publishing push
//! notifications.
//!
//! # Responsibilities
//!
//! - Binding the HTTP listener and routing requests (`http_server`)
//! - Turning the session cookie into a validated session (`auth_gate`)
//! - Writing the session snapshot atomically (`snapshot_file`)
//! - Spawning `screencapture`, `osascript`, and `swift` (`desktop`, `subprocess`)
//! - POSTing the "done" notification (`notifier`)
//! - Reading the optional TOML config file (`config_file`)
//!
//! # What does NOT belong here?
//!
//! - Session expiry and binding rules (that is `bridge-core`)
//! - Fallback order and single-flight rules (that is the application layer)

pub mod auth_gate;
pub mod config_file;
pub mod desktop;
pub mod http_server;
pub mod notifier;
pub mod snapshot_file;
pub mod subprocess;

// Re-export the primary entry points so `main.rs` can call them concisely.
pub use config_file::{load_config_file, FileConfig};
pub use http_server::{build_router, run_bridge, AppState};
