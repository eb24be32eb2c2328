//! bridge-server library crate.
//!
//! This crate provides the HTTP service that lets a phone or another computer
//! log in with a shared passcode, watch a periodically captured image of a
//! desktop window, and type messages into that window.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Browser (HTTP + JSON, session cookie)
//!         ↕
//! [bridge-server]
//!   ├── domain/           Pure types: BridgeConfig, JSON request/response DTOs
//!   ├── application/      Session store, frame capture loop, command relay,
//!   │                     and the ports (traits) they depend on
//!   └── infrastructure/
//!         ├── http_server/  axum router and handlers
//!         ├── auth_gate/    cookie → session middleware
//!         ├── snapshot_file/ JSON session snapshot on disk
//!         ├── desktop/      screencapture, enumeration, and osascript helpers
//!         ├── subprocess/   argument-vector process runner
//!         ├── notifier/     ntfy push notifications
//!         └── config_file/  optional TOML settings
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain` and `bridge-core`; it reaches the
//!   outside world only through traits (`CaptureBackend`, `DesktopCatalog`,
//!   `SessionPersistence`, `AutomationRunner`, `DoneNotifier`).
//! - `infrastructure` implements those traits with `tokio`, `axum`, and
//!   `reqwest`.

/// Domain layer: configuration and wire types (no I/O).
pub mod domain;

/// Application layer: sessions, capture, and command relay.
pub mod application;

/// Infrastructure layer: HTTP server and OS/network adapters.
pub mod infrastructure;
