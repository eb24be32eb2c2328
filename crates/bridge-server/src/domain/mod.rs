//! Domain layer for bridge-server.
//!
//! The domain layer contains plain data types with no dependencies on I/O,
//! networking, or async runtimes.
//!
//! # What belongs in the domain layer?
//!
//! - The runtime configuration struct
//! - The JSON request/response shapes of the HTTP API
//!
//! # What does NOT belong here?
//!
//! - Any `tokio`, `axum`, or file-system types
//! - Environment variable or config file reading (that is `main.rs` and
//!   `infrastructure::config_file`)

pub mod config;
pub mod messages;

pub use config::BridgeConfig;
pub use messages::{CaptureStatus, RequestedId};
