//! SessionStore: the authoritative session map plus its durable snapshot.
//!
//! The store wraps a [`SessionTable`] from `bridge-core` and adds the two
//! things the pure table cannot do: reading the clock and writing the
//! snapshot to disk.
//!
//! # Persistence rules
//!
//! - The in-memory table is the authority; the snapshot is a copy.
//! - Every mutation is followed by a snapshot write *while the table lock is
//!   still held*, so two writes can never land out of order and the file never
//!   contradicts the live map.
//! - Write failures are logged and swallowed: the bridge keeps working from
//!   memory if the disk is unavailable.
//!
//! # Concurrency
//!
//! The table lives behind a `tokio::sync::Mutex` because the lock is held
//! across the `.await` of the snapshot write.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use bridge_core::{
    parse_snapshot, render_snapshot, Clock, PasscodeVerifier, Session, SessionTable,
    SnapshotError,
};

// ── Errors ────────────────────────────────────────────────────────────────────

/// Authentication failures.  Always surfaced to the caller as "unauthenticated".
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// The passcode was missing, wrong, or login is disabled.
    #[error("invalid passcode")]
    InvalidPasscode,

    /// No valid session accompanies the request.
    #[error("unauthenticated")]
    Unauthenticated,
}

/// Failures reading or writing the session snapshot.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// A file-system operation failed.
    #[error("I/O error on session snapshot {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The table could not be encoded.
    #[error("failed to encode session snapshot: {0}")]
    Encode(#[from] serde_json::Error),

    /// The snapshot file is not a JSON object.
    #[error("failed to decode session snapshot: {0}")]
    Decode(#[from] SnapshotError),
}

// ── Port ──────────────────────────────────────────────────────────────────────

/// Durable storage for the encoded session snapshot.
///
/// Implemented by `infrastructure::snapshot_file::JsonSnapshotFile`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionPersistence: Send + Sync {
    /// Returns the stored snapshot, or `None` if nothing has been stored yet.
    async fn load(&self) -> Result<Option<String>, PersistenceError>;

    /// Atomically replaces the stored snapshot.
    async fn save(&self, snapshot: &str) -> Result<(), PersistenceError>;
}

// ── Store ─────────────────────────────────────────────────────────────────────

/// Owns every session of the running process.
pub struct SessionStore {
    table: Mutex<SessionTable>,
    ttl_ms: u64,
    verifier: PasscodeVerifier,
    persistence: Arc<dyn SessionPersistence>,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    pub fn new(
        verifier: PasscodeVerifier,
        ttl: Duration,
        persistence: Arc<dyn SessionPersistence>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let table = SessionTable::new(ttl);
        Self {
            ttl_ms: table.ttl_ms(),
            table: Mutex::new(table),
            verifier,
            persistence,
            clock,
        }
    }

    /// Session lifetime in milliseconds (also the cookie lifetime).
    pub fn session_ttl_ms(&self) -> u64 {
        self.ttl_ms
    }

    pub fn is_passcode_configured(&self) -> bool {
        self.verifier.is_configured()
    }

    /// Number of sessions currently held in memory.
    pub async fn len(&self) -> usize {
        self.table.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.table.lock().await.is_empty()
    }

    /// Checks `passcode` and, if it matches, issues a session bound to
    /// `user_agent`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidPasscode`] if the passcode is missing or
    /// wrong, or if no passcode is configured.
    pub async fn login(
        &self,
        passcode: Option<&str>,
        user_agent: &str,
    ) -> Result<Session, AuthError> {
        if !self.verifier.is_valid(passcode.unwrap_or("")) {
            return Err(AuthError::InvalidPasscode);
        }
        Ok(self.create_session(user_agent).await)
    }

    /// Issues a new session and persists the table before returning it.
    pub async fn create_session(&self, user_agent: &str) -> Session {
        let mut table = self.table.lock().await;
        let session = table.issue(user_agent, self.clock.now_ms());
        self.persist(&table).await;
        debug!("issued session expiring at {}", session.expires_at);
        session
    }

    /// Returns the session for `token` if it is unexpired and bound to
    /// `user_agent` (or unbound).
    ///
    /// Expired and mismatched sessions are deleted, and the deletion is
    /// persisted, before `None` is returned.
    pub async fn validate_session(&self, token: Option<&str>, user_agent: &str) -> Option<Session> {
        let mut table = self.table.lock().await;
        let check = table.validate(token, user_agent, self.clock.now_ms());
        if check.removed_session() {
            debug!("session rejected and removed: {check:?}");
            self.persist(&table).await;
        }
        check.into_session()
    }

    /// Deletes `token` if present.  Persists only when something was deleted.
    pub async fn revoke_session(&self, token: Option<&str>) {
        let Some(token) = token else { return };
        let mut table = self.table.lock().await;
        if table.revoke(token) {
            self.persist(&table).await;
        }
    }

    /// Sweeps every expired session.  Persists once if anything was removed.
    /// Returns the number of sessions removed.
    pub async fn cleanup_expired(&self) -> usize {
        let mut table = self.table.lock().await;
        let removed = table.remove_expired(self.clock.now_ms());
        if removed > 0 {
            info!("removed {removed} expired session(s)");
            self.persist(&table).await;
        }
        removed
    }

    /// Replaces the in-memory table with the stored snapshot.
    ///
    /// A missing or empty snapshot means "no sessions".  Malformed records are
    /// dropped with a warning; an unreadable snapshot is logged and ignored.
    /// Returns the number of sessions loaded.
    pub async fn load_from_disk(&self) -> usize {
        let raw = match self.persistence.load().await {
            Ok(Some(raw)) => raw,
            Ok(None) => return 0,
            Err(e) => {
                warn!("could not read session snapshot, starting empty: {e}");
                return 0;
            }
        };

        let parsed = match parse_snapshot(&raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("ignoring unreadable session snapshot: {e}");
                return 0;
            }
        };

        for token in &parsed.discarded {
            // Only a prefix: the token is a credential.
            let prefix: String = token.chars().take(8).collect();
            warn!("discarding malformed session record {prefix}…");
        }

        let loaded = parsed.sessions.len();
        self.table.lock().await.replace_all(parsed.sessions);
        info!("loaded {loaded} session(s) from snapshot");
        loaded
    }

    /// Writes the current table to the snapshot.
    pub async fn persist_to_disk(&self) {
        let table = self.table.lock().await;
        self.persist(&table).await;
    }

    /// Runs [`cleanup_expired`](Self::cleanup_expired) every `every`, starting
    /// one period from now.  Abort the returned handle to stop it.
    pub fn spawn_cleanup_task(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                store.cleanup_expired().await;
            }
        })
    }

    /// Encodes `table` and hands it to the persistence port.  Must be called
    /// with the table lock held.
    async fn persist(&self, table: &SessionTable) {
        let snapshot = match render_snapshot(table.iter()) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("{}", PersistenceError::from(e));
                return;
            }
        };
        if let Err(e) = self.persistence.save(&snapshot).await {
            warn!("session snapshot not persisted, continuing in memory: {e}");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
