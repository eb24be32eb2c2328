//! macOS adapters: screen capture, window/display listing, and UI automation.
//!
//! [`MacDesktop`] implements three application ports by running helper
//! programs from the scripts directory:
//!
//! | Port               | Program                                            |
//! |--------------------|----------------------------------------------------|
//! | `CaptureBackend`   | `screencapture -x -t jpg [-l <window> \| -D <display>] <dest>` |
//! |                    | `osascript get_claude_window_id.applescript`       |
//! | `DesktopCatalog`   | `swift list_windows.swift`, `swift list_displays.swift` |
//! | `AutomationRunner` | `osascript <script> [args…]` or `swift <script> [args…]` |
//!
//! Output parsing lives in `bridge_core::capture::listing` so it can be
//! tested without a Mac.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use bridge_core::{parse_display_list, parse_window_list, DisplayInfo, WindowInfo};

use crate::application::{
    AutomationRunner, CaptureBackend, CaptureError, DesktopCatalog, EnumerationError, RelayError,
};
use crate::infrastructure::subprocess::run_program;

const WINDOW_ID_SCRIPT: &str = "get_claude_window_id.applescript";
const LIST_WINDOWS_SCRIPT: &str = "list_windows.swift";
const LIST_DISPLAYS_SCRIPT: &str = "list_displays.swift";

/// Runs the macOS helpers found in `scripts_dir`.
#[derive(Debug, Clone)]
pub struct MacDesktop {
    scripts_dir: PathBuf,
}

impl MacDesktop {
    pub fn new(scripts_dir: impl Into<PathBuf>) -> Self {
        Self {
            scripts_dir: scripts_dir.into(),
        }
    }

    fn script(&self, name: &str) -> PathBuf {
        self.scripts_dir.join(name)
    }

    async fn screencapture(&self, args: Vec<OsString>) -> Result<(), CaptureError> {
        run_program("screencapture", args)
            .await
            .map(|_| ())
            .map_err(|e| CaptureError::Helper(e.to_string()))
    }

    async fn run_swift(&self, script: &str) -> Result<String, EnumerationError> {
        run_program("swift", [self.script(script)])
            .await
            .map_err(|e| EnumerationError::Helper(e.to_string()))
    }
}

/// Builds the `screencapture` argument vector.  `selector` is `("-l", id)`
/// for a window, `("-D", id)` for a display, or `None` for the whole screen.
fn screencapture_args(selector: Option<(&str, i64)>, dest: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-x", "-t", "jpg"].iter().map(OsString::from).collect();
    if let Some((flag, id)) = selector {
        args.push(flag.into());
        args.push(id.to_string().into());
    }
    args.push(dest.as_os_str().to_owned());
    args
}

/// Window lookup prints a bare id; anything that is not a positive integer
/// means "no window".
fn parse_window_id(stdout: &str) -> Option<i64> {
    stdout.trim().parse::<i64>().ok().filter(|id| *id > 0)
}

#[async_trait]
impl CaptureBackend for MacDesktop {
    async fn find_target_window(&self) -> Option<i64> {
        match run_program("osascript", [self.script(WINDOW_ID_SCRIPT)]).await {
            Ok(stdout) => parse_window_id(&stdout),
            Err(e) => {
                debug!("window lookup failed: {e}");
                None
            }
        }
    }

    async fn capture_window(&self, window_id: i64, dest: &Path) -> Result<(), CaptureError> {
        self.screencapture(screencapture_args(Some(("-l", window_id)), dest))
            .await
    }

    async fn capture_display(&self, display_id: i64, dest: &Path) -> Result<(), CaptureError> {
        self.screencapture(screencapture_args(Some(("-D", display_id)), dest))
            .await
    }

    async fn capture_screen(&self, dest: &Path) -> Result<(), CaptureError> {
        self.screencapture(screencapture_args(None, dest)).await
    }
}

#[async_trait]
impl DesktopCatalog for MacDesktop {
    async fn list_windows(&self) -> Result<Vec<WindowInfo>, EnumerationError> {
        let stdout = self.run_swift(LIST_WINDOWS_SCRIPT).await?;
        Ok(parse_window_list(&stdout))
    }

    async fn list_displays(&self) -> Result<Vec<DisplayInfo>, EnumerationError> {
        let stdout = self.run_swift(LIST_DISPLAYS_SCRIPT).await?;
        Ok(parse_display_list(&stdout))
    }
}

/// Picks the interpreter for an automation script by its extension.
fn interpreter_for(script: &str) -> &'static str {
    if Path::new(script).extension().is_some_and(|ext| ext == "swift") {
        "swift"
    } else {
        "osascript"
    }
}

#[async_trait]
impl AutomationRunner for MacDesktop {
    async fn run_script(&self, script: &str, args: &[String]) -> Result<(), RelayError> {
        let mut argv: Vec<OsString> = vec![self.script(script).into_os_string()];
        argv.extend(args.iter().map(OsString::from));
        run_program(interpreter_for(script), argv)
            .await
            .map(|_| ())
            .map_err(|e| RelayError::Script(e.to_string()))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
