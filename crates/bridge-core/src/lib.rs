//! # bridge-core
//!
//! Shared domain library for Screen Bridge containing the session model, the
//! passcode check, and the capture-target selection rules.
//!
//! This crate has zero dependencies on OS APIs, async runtimes, sockets, or the
//! file system.  Everything that touches the outside world (subprocesses, the
//! session snapshot file, HTTP) lives in `bridge-server`.
//!
//! # Architecture overview (for beginners)
//!
//! Screen Bridge lets a browser on another device watch a desktop window and
//! type into it.  Access is guarded by a single shared passcode that is
//! exchanged for a time-limited session.
//!
//! - **`auth`** – How access is granted.  A [`PasscodeVerifier`] checks the
//!   shared secret; a [`SessionTable`] issues, validates, and expires sessions.
//!
//! - **`capture`** – What gets captured.  The [`CaptureTargetSelector`] holds
//!   the user's explicit window/display choice and turns it into an ordered
//!   fallback plan of [`CaptureTarget`]s.  The `listing` module parses the
//!   output of the window/display enumeration helpers.
//!
//! - **`clock`** – A tiny [`Clock`] abstraction so expiry rules can be tested
//!   without sleeping.

pub mod auth;
pub mod capture;
pub mod clock;

// Re-export the most-used types at the crate root so callers can write
// `bridge_core::SessionTable` instead of `bridge_core::auth::session::SessionTable`.
pub use auth::passcode::PasscodeVerifier;
pub use auth::session::{
    generate_token, parse_snapshot, render_snapshot, ParsedSnapshot, Session, SessionCheck,
    SessionTable, SnapshotError,
};
pub use capture::listing::{parse_display_list, parse_window_list};
pub use capture::target::{
    CaptureMode, CaptureTarget, CaptureTargetSelector, DisplayInfo, SelectionError, WindowInfo,
};
pub use clock::{Clock, ManualClock, SystemClock};
