//! FrameCaptureLoop: timer-driven, single-flight frame capture with fallback.
//!
//! Every capture attempt walks the plan produced by
//! [`CaptureTargetSelector::plan`] and stops at the first target that yields
//! a frame:
//!
//! ```text
//! SelectedWindow ─fail─► SelectedDisplay ─fail─► FullScreen ─fail─► Err
//!   (or AutoWindow: look up the app window; "not found" skips the step)
//! ```
//!
//! The selected display is only tried after a window capture actually ran
//! and failed.  When the app window is not found, the chain goes straight to
//! the full screen.
//!
//! Failures of intermediate steps are swallowed.  Only a failure of the
//! terminal full-screen step is returned to the caller, and even then the
//! timer keeps running.
//!
//! # Warning deduplication
//!
//! Each failed step is identified by a key such as `selected-window:42`.  A
//! warning is logged only when that key did not also fail on the previous
//! attempt, so an unreachable selection produces one warning instead of one
//! per second.
//!
//! # Single flight
//!
//! `in_progress` is an explicit `AtomicBool` token: a tick or manual trigger
//! that arrives while a capture is writing the frame file returns
//! [`CaptureOutcome::Skipped`] immediately.
//!
//! # Frame file
//!
//! The backend writes to `<frame>.tmp`, which is then renamed over the frame
//! path, so readers never see a half-written image.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use bridge_core::{
    CaptureMode, CaptureTarget, CaptureTargetSelector, Clock, DisplayInfo, SelectionError,
    WindowInfo,
};

use crate::domain::CaptureStatus;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Errors produced while capturing a frame.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The capture helper could not be run or exited unsuccessfully.
    #[error("capture helper failed: {0}")]
    Helper(String),

    /// Moving the captured image into place failed.
    #[error("I/O error on frame file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Every target in the fallback chain failed.
    #[error("all capture targets failed: {last}")]
    Exhausted {
        /// Error of the terminal (full-screen) step.
        #[source]
        last: Box<CaptureError>,
    },
}

/// Result of a capture attempt that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// A frame was written by the given tier.
    Captured(CaptureMode),
    /// Another capture was already in flight; nothing was done.
    Skipped,
}

// ── Port ──────────────────────────────────────────────────────────────────────

/// Screen-capture operations provided by the OS.
///
/// Implemented by `infrastructure::desktop::ScreencaptureBackend`.
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Looks up the target application's main window.  `None` when it is not
    /// running or has no on-screen window.
    async fn find_target_window(&self) -> Option<i64>;

    /// Captures a single window into `dest`.
    async fn capture_window(&self, window_id: i64, dest: &Path) -> Result<(), CaptureError>;

    /// Captures a single display into `dest`.
    async fn capture_display(&self, display_id: i64, dest: &Path) -> Result<(), CaptureError>;

    /// Captures the entire screen into `dest`.
    async fn capture_screen(&self, dest: &Path) -> Result<(), CaptureError>;
}

// ── Loop ──────────────────────────────────────────────────────────────────────

/// A capture target after dynamic lookup, ready to run.
#[derive(Debug, Clone, Copy)]
enum Step {
    Window { id: i64, mode: CaptureMode },
    Display { id: i64 },
    Screen,
}

impl Step {
    fn mode(self) -> CaptureMode {
        match self {
            Self::Window { mode, .. } => mode,
            Self::Display { .. } => CaptureMode::SelectedDisplay,
            Self::Screen => CaptureMode::Screen,
        }
    }

    fn failure_key(self) -> String {
        match self {
            Self::Window { id, mode } => format!("{mode}:{id}"),
            Self::Display { id } => format!("{}:{id}", CaptureMode::SelectedDisplay),
            Self::Screen => CaptureMode::Screen.to_string(),
        }
    }
}

#[derive(Debug)]
struct LoopState {
    last_capture_at: Option<u64>,
    last_mode: CaptureMode,
    previous_failures: HashSet<String>,
}

/// Clears the in-flight flag when the capture ends, including on abort.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns the capture selection, the capture timer, and the frame file.
pub struct FrameCaptureLoop {
    backend: Arc<dyn CaptureBackend>,
    clock: Arc<dyn Clock>,
    frame_path: PathBuf,
    interval: Duration,
    selector: Mutex<CaptureTargetSelector>,
    state: Mutex<LoopState>,
    in_progress: AtomicBool,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl FrameCaptureLoop {
    pub fn new(
        backend: Arc<dyn CaptureBackend>,
        clock: Arc<dyn Clock>,
        frame_path: PathBuf,
        interval: Duration,
    ) -> Self {
        Self {
            backend,
            clock,
            frame_path,
            interval,
            selector: Mutex::new(CaptureTargetSelector::new()),
            state: Mutex::new(LoopState {
                last_capture_at: None,
                last_mode: CaptureMode::Screen,
                previous_failures: HashSet::new(),
            }),
            in_progress: AtomicBool::new(false),
            timer: Mutex::new(None),
        }
    }

    pub fn frame_path(&self) -> &Path {
        &self.frame_path
    }

    // ── Selection ─────────────────────────────────────────────────────────────

    /// Selects a window.  Does not touch the display selection.
    ///
    /// # Errors
    ///
    /// [`SelectionError::InvalidSelection`] for a non-positive id.
    pub fn set_selected_window(&self, info: &WindowInfo) -> Result<(), SelectionError> {
        lock(&self.selector).set_selected_window(info)
    }

    /// Selects a display.  Does not touch the window selection.
    ///
    /// # Errors
    ///
    /// [`SelectionError::InvalidSelection`] for a non-positive id.
    pub fn set_selected_display(&self, info: &DisplayInfo) -> Result<(), SelectionError> {
        lock(&self.selector).set_selected_display(info)
    }

    pub fn clear_selected_window(&self) {
        lock(&self.selector).clear_selected_window();
    }

    pub fn clear_selected_display(&self) {
        lock(&self.selector).clear_selected_display();
    }

    pub fn selected_window(&self) -> Option<WindowInfo> {
        lock(&self.selector).selected_window()
    }

    pub fn selected_display(&self) -> Option<DisplayInfo> {
        lock(&self.selector).selected_display()
    }

    // ── Capture ───────────────────────────────────────────────────────────────

    /// Runs one capture attempt through the fallback chain.
    ///
    /// # Errors
    ///
    /// [`CaptureError::Exhausted`] if even the full-screen capture failed, or
    /// [`CaptureError::Io`] if the frame directory cannot be created.
    pub async fn capture_frame(&self) -> Result<CaptureOutcome, CaptureError> {
        let Some(_in_flight) = InFlight::acquire(&self.in_progress) else {
            debug!("capture already in progress; skipping");
            return Ok(CaptureOutcome::Skipped);
        };

        if let Some(dir) = self.frame_path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| CaptureError::Io {
                    path: dir.to_path_buf(),
                    source,
                })?;
        }

        let plan = lock(&self.selector).plan();
        let previous = lock(&self.state).previous_failures.clone();
        let tmp = temp_sibling(&self.frame_path);

        let mut failures = HashSet::new();
        let mut captured = None;
        let mut last_error = None;
        let mut window_failed = false;

        for target in &plan {
            // The display tier only stands in for a window capture that ran and failed.
            if matches!(target, CaptureTarget::SelectedDisplay(_)) && !window_failed {
                continue;
            }
            let Some(step) = self.resolve(target).await else {
                continue;
            };
            match self.run_step(step, &tmp).await {
                Ok(()) => {
                    captured = Some(step.mode());
                    break;
                }
                Err(e) => {
                    let key = step.failure_key();
                    if !previous.contains(&key) {
                        warn!("capture failed for {key}; falling back: {e}");
                    }
                    window_failed |= matches!(step, Step::Window { .. });
                    failures.insert(key);
                    last_error = Some(e);
                }
            }
        }

        let mut state = lock(&self.state);
        state.previous_failures = failures;
        match captured {
            Some(mode) => {
                state.last_mode = mode;
                state.last_capture_at = Some(self.clock.now_ms());
                Ok(CaptureOutcome::Captured(mode))
            }
            None => Err(CaptureError::Exhausted {
                last: Box::new(last_error.unwrap_or_else(|| {
                    CaptureError::Helper("capture plan was empty".to_string())
                })),
            }),
        }
    }

    /// Turns a plan entry into a runnable step.  `None` means the target is
    /// unavailable (the app window could not be found) and is skipped.
    async fn resolve(&self, target: &CaptureTarget) -> Option<Step> {
        match target {
            CaptureTarget::SelectedWindow(window) => Some(Step::Window {
                id: window.id,
                mode: CaptureMode::SelectedWindow,
            }),
            CaptureTarget::AutoWindow => {
                let id = self.backend.find_target_window().await;
                if id.is_none() {
                    debug!("target app window not found");
                }
                id.map(|id| Step::Window {
                    id,
                    mode: CaptureMode::ClaudeWindow,
                })
            }
            CaptureTarget::SelectedDisplay(display) => Some(Step::Display { id: display.id }),
            CaptureTarget::FullScreen => Some(Step::Screen),
        }
    }

    async fn run_step(&self, step: Step, tmp: &Path) -> Result<(), CaptureError> {
        let captured = match step {
            Step::Window { id, .. } => self.backend.capture_window(id, tmp).await,
            Step::Display { id } => self.backend.capture_display(id, tmp).await,
            Step::Screen => self.backend.capture_screen(tmp).await,
        };
        if let Err(e) = captured {
            // A partial temp file is simply overwritten next time.
            let _ = tokio::fs::remove_file(tmp).await;
            return Err(e);
        }

        tokio::fs::rename(tmp, &self.frame_path)
            .await
            .map_err(|source| CaptureError::Io {
                path: self.frame_path.clone(),
                source,
            })
    }

    // ── Timer ─────────────────────────────────────────────────────────────────

    /// Captures immediately, then every `interval`.  No-op if already running.
    pub fn start(self: &Arc<Self>) {
        let mut timer = lock(&self.timer);
        if timer.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        let this = Arc::clone(self);
        *timer = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(this.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                // The first tick completes immediately.
                ticker.tick().await;
                if let Err(e) = this.capture_frame().await {
                    debug!("tick produced no frame: {e}");
                }
            }
        }));
        info!(
            "frame capture started (every {} ms)",
            self.interval.as_millis()
        );
    }

    /// Stops the timer.  No-op if not running.
    pub fn stop(&self) {
        if let Some(handle) = lock(&self.timer).take() {
            handle.abort();
            info!("frame capture stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.timer)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Current loop and selection state.  Never blocks on a capture in flight.
    pub fn status(&self) -> CaptureStatus {
        let (selected_window, selected_display) = {
            let selector = lock(&self.selector);
            (selector.selected_window(), selector.selected_display())
        };
        let (last_capture_at, mode) = {
            let state = lock(&self.state);
            (state.last_capture_at, state.last_mode)
        };
        CaptureStatus {
            running: self.is_running(),
            interval_ms: self.interval.as_millis() as u64,
            last_capture_at,
            mode,
            selected_window,
            selected_display,
        }
    }

    /// Returns `true` once a frame file exists.
    pub async fn frame_exists(&self) -> bool {
        tokio::fs::metadata(&self.frame_path).await.is_ok()
    }

    /// Reads the latest frame.
    ///
    /// # Errors
    ///
    /// Any I/O error reading the frame file.
    pub async fn read_frame(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.frame_path).await
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// `/tmp/frame.jpg` → `/tmp/frame.jpg.tmp`
fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("frame"));
    name.push(".tmp");
    path.with_file_name(name)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
