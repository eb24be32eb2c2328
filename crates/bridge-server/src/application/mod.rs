//! Application layer for bridge-server.
//!
//! The application layer orchestrates the business logic: it knows *what* to
//! do, but delegates *how* to do it to the infrastructure layer through the
//! traits declared here.
//!
//! # Responsibilities
//!
//! - Issuing, validating, expiring, and persisting sessions
//! - Resolving the capture target and running the capture timer
//! - Relaying typed messages to the desktop app, one at a time
//!
//! # What does NOT belong here?
//!
//! - Spawning subprocesses or touching files (infrastructure)
//! - HTTP routing, cookies, status codes (infrastructure)

pub mod capture_loop;
pub mod catalog;
pub mod command_relay;
pub mod session_store;

pub use capture_loop::{CaptureBackend, CaptureError, CaptureOutcome, FrameCaptureLoop};
pub use catalog::{DesktopCatalog, EnumerationError};
pub use command_relay::{
    AutomationRunner, CommandRelay, DoneNotifier, NavigateAction, RelayError,
};
pub use session_store::{AuthError, PersistenceError, SessionPersistence, SessionStore};
