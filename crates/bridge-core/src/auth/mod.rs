//! Access control: the shared passcode and the sessions it is exchanged for.
//!
//! # Flow (for beginners)
//!
//! ```text
//! Browser                               Bridge
//! ───────                               ──────
//! POST /auth/login {passcode}  ──►  PasscodeVerifier::is_valid()
//!                                    SessionTable::issue()
//!                              ◄──  Set-Cookie: <token>
//! GET /stream/frame (cookie)   ──►  SessionTable::validate()
//! ```
//!
//! Both types are pure: they never touch the disk.  Persisting the session
//! table is the server's job (see `bridge_server::application::session_store`).

pub mod passcode;
pub mod session;
