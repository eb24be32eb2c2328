//! CommandRelay: types browser messages into the desktop app, one at a time.
//!
//! # Flow
//!
//! ```text
//! submit("#new hello")
//!   ├─ busy? ──────────────────────────────► Err(Busy)
//!   └─ spawn:
//!        run new_chat script ─► wait 500 ms
//!        run type_message script "hello"
//!        wait done_delay ─► clear busy ─► notify "done"
//! ```
//!
//! A message that is only a command (`#new`) notifies right after the
//! command script.  Any script failure is logged and clears busy without a
//! notification.
//!
//! `submit` returns as soon as the message is accepted; the HTTP handler
//! never waits for typing to finish.
//!
//! [`CommandRelay::navigate`] scrolls the app's conversation view.  It does
//! not type anything, so it runs inline and ignores the busy flag.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Script that types its single argument into the app's input box.
pub const TYPE_MESSAGE_SCRIPT: &str = "type_message.applescript";

/// Script that scrolls the conversation view; takes one [`NavigateAction`].
pub const NAVIGATE_SCRIPT: &str = "navigate_main_view.swift";

/// A message prefix that runs a script before (or instead of) typing.
#[derive(Debug)]
pub struct RelayCommand {
    pub prefix: &'static str,
    pub script: &'static str,
    /// Time for the UI to settle before the remaining text is typed.
    pub settle: Duration,
    pub description: &'static str,
}

/// Known command prefixes, matched in order.
pub const COMMANDS: &[RelayCommand] = &[RelayCommand {
    prefix: "#new",
    script: "new_chat.applescript",
    settle: Duration::from_millis(500),
    description: "Open a new chat",
}];

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RelayError {
    #[error("Message is required")]
    EmptyMessage,

    #[error("Claude is already processing a message")]
    Busy,

    #[error("action must be one of: up, down, end")]
    InvalidAction,

    #[error("automation script failed: {0}")]
    Script(String),
}

// ── Navigation ────────────────────────────────────────────────────────────────

/// Where to move the conversation view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigateAction {
    Up,
    Down,
    End,
}

impl NavigateAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::End => "end",
        }
    }
}

impl fmt::Display for NavigateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NavigateAction {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            "end" => Ok(Self::End),
            _ => Err(RelayError::InvalidAction),
        }
    }
}

// ── Ports ─────────────────────────────────────────────────────────────────────

/// Runs a named automation script (AppleScript or Swift) with an argument
/// vector.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AutomationRunner: Send + Sync {
    async fn run_script(&self, script: &str, args: &[String]) -> Result<(), RelayError>;
}

/// Announces that the app has (probably) finished answering.
///
/// Implementations log their own failures; there is nothing to propagate.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DoneNotifier: Send + Sync {
    async fn notify_done(&self);
}

// ── Relay ─────────────────────────────────────────────────────────────────────

/// Releases the busy flag when processing ends or the task is aborted.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct CommandRelay {
    runner: Arc<dyn AutomationRunner>,
    notifier: Arc<dyn DoneNotifier>,
    done_delay: Duration,
    busy: AtomicBool,
}

impl CommandRelay {
    pub fn new(
        runner: Arc<dyn AutomationRunner>,
        notifier: Arc<dyn DoneNotifier>,
        done_delay: Duration,
    ) -> Self {
        Self {
            runner,
            notifier,
            done_delay,
            busy: AtomicBool::new(false),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Accepts a message and processes it in the background.
    ///
    /// # Errors
    ///
    /// - [`RelayError::EmptyMessage`] if `message` is absent or blank.
    /// - [`RelayError::Busy`] if a previous message is still being handled.
    pub fn submit(self: &Arc<Self>, message: Option<&str>) -> Result<JoinHandle<()>, RelayError> {
        let text = message
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .ok_or(RelayError::EmptyMessage)?;

        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| RelayError::Busy)?;

        info!("relaying message ({} chars)", text.chars().count());
        let (command, rest) = split_command(text);
        let rest = rest.to_string();
        let this = Arc::clone(self);
        Ok(tokio::spawn(async move { this.process(command, rest).await }))
    }

    /// Runs the navigation helper and waits for it to finish.
    ///
    /// # Errors
    ///
    /// - [`RelayError::InvalidAction`] if `action` is absent or not one of
    ///   `up`, `down`, `end`.
    /// - [`RelayError::Script`] if the helper fails.
    pub async fn navigate(&self, action: Option<&str>) -> Result<NavigateAction, RelayError> {
        let action: NavigateAction = action.ok_or(RelayError::InvalidAction)?.parse()?;
        self.runner
            .run_script(NAVIGATE_SCRIPT, &[action.as_str().to_string()])
            .await?;
        info!("navigated conversation view: {action}");
        Ok(action)
    }

    async fn process(&self, command: Option<&'static RelayCommand>, text: String) {
        let guard = BusyGuard(&self.busy);
        match self.relay(command, &text).await {
            Ok(()) => {
                drop(guard);
                info!("app marked as done");
                self.notifier.notify_done().await;
            }
            Err(e) => error!("message relay aborted: {e}"),
        }
    }

    async fn relay(&self, command: Option<&RelayCommand>, text: &str) -> Result<(), RelayError> {
        if let Some(command) = command {
            info!("executing command: {}", command.description);
            self.runner.run_script(command.script, &[]).await?;
            if text.is_empty() {
                return Ok(());
            }
            tokio::time::sleep(command.settle).await;
        }

        self.runner
            .run_script(TYPE_MESSAGE_SCRIPT, &[text.to_string()])
            .await?;
        info!(
            "message typed; notifying done in {} ms",
            self.done_delay.as_millis()
        );
        tokio::time::sleep(self.done_delay).await;
        Ok(())
    }
}

/// Splits a known command prefix off the message.
fn split_command(text: &str) -> (Option<&'static RelayCommand>, &str) {
    COMMANDS
        .iter()
        .find_map(|c| text.strip_prefix(c.prefix).map(|rest| (Some(c), rest.trim())))
        .unwrap_or((None, text))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
