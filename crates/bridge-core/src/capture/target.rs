//! Capture targets and the selector that holds the viewer's choice.
//!
//! # Resolution order
//!
//! [`CaptureTargetSelector::plan`] returns the targets a capture attempt
//! should try, in order, stopping at the first success:
//!
//! ```text
//! 1. SelectedWindow   (if a window is selected)
//!    AutoWindow       (otherwise: look the target app's window up by name)
//! 2. SelectedDisplay  (if a display is selected)
//! 3. FullScreen       (always last)
//! ```
//!
//! Selecting a window does not clear a selected display (and vice versa); the
//! HTTP layer clears the other selection itself.  When both are set the window
//! is always tried first.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a selection carries an unusable identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// The identifier is zero or negative.
    #[error("invalid selection: {kind} id must be a positive integer, got {id}")]
    InvalidSelection {
        /// `"window"` or `"display"`.
        kind: &'static str,
        /// The rejected identifier.
        id: i64,
    },
}

/// A desktop window as reported by the window enumeration helper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowInfo {
    /// Window-server identifier (positive).
    pub id: i64,
    /// Name of the owning application.
    #[serde(default)]
    pub app_name: String,
    /// Window title; may be empty.
    #[serde(default)]
    pub title: String,
}

/// A physical display as reported by the display enumeration helper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayInfo {
    pub id: i64,
    #[serde(default)]
    pub is_main: bool,
    #[serde(default)]
    pub x: i64,
    #[serde(default)]
    pub y: i64,
    #[serde(default)]
    pub width: i64,
    #[serde(default)]
    pub height: i64,
}

/// Which tier of the fallback chain produced (or should produce) a frame.
///
/// Serialized in kebab-case for the status API, e.g. `"selected-window"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaptureMode {
    SelectedWindow,
    ClaudeWindow,
    SelectedDisplay,
    Screen,
}

impl CaptureMode {
    /// The wire name used in logs and the status API.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SelectedWindow => "selected-window",
            Self::ClaudeWindow => "claude-window",
            Self::SelectedDisplay => "selected-display",
            Self::Screen => "screen",
        }
    }
}

impl fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of the capture fallback chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureTarget {
    /// No explicit window: resolve the target application's window by name.
    AutoWindow,
    /// The window the viewer picked.
    SelectedWindow(WindowInfo),
    /// The display the viewer picked.
    SelectedDisplay(DisplayInfo),
    /// The entire screen.
    FullScreen,
}

impl CaptureTarget {
    /// The mode reported when this target produces a frame.
    pub fn mode(&self) -> CaptureMode {
        match self {
            Self::AutoWindow => CaptureMode::ClaudeWindow,
            Self::SelectedWindow(_) => CaptureMode::SelectedWindow,
            Self::SelectedDisplay(_) => CaptureMode::SelectedDisplay,
            Self::FullScreen => CaptureMode::Screen,
        }
    }
}

/// Holds the currently selected window and display.
#[derive(Debug, Default, Clone)]
pub struct CaptureTargetSelector {
    window: Option<WindowInfo>,
    display: Option<DisplayInfo>,
}

impl CaptureTargetSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects `info` as the window to capture.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::InvalidSelection`] if `info.id <= 0`; the
    /// previous selection is left untouched.
    pub fn set_selected_window(&mut self, info: &WindowInfo) -> Result<(), SelectionError> {
        if info.id <= 0 {
            return Err(SelectionError::InvalidSelection {
                kind: "window",
                id: info.id,
            });
        }
        self.window = Some(WindowInfo {
            id: info.id,
            app_name: info.app_name.trim().to_string(),
            title: info.title.trim().to_string(),
        });
        Ok(())
    }

    /// Selects `info` as the display to capture.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::InvalidSelection`] if `info.id <= 0`; the
    /// previous selection is left untouched.
    pub fn set_selected_display(&mut self, info: &DisplayInfo) -> Result<(), SelectionError> {
        if info.id <= 0 {
            return Err(SelectionError::InvalidSelection {
                kind: "display",
                id: info.id,
            });
        }
        self.display = Some(info.clone());
        Ok(())
    }

    pub fn clear_selected_window(&mut self) {
        self.window = None;
    }

    pub fn clear_selected_display(&mut self) {
        self.display = None;
    }

    /// Returns a copy of the selected window.
    pub fn selected_window(&self) -> Option<WindowInfo> {
        self.window.clone()
    }

    /// Returns a copy of the selected display.
    pub fn selected_display(&self) -> Option<DisplayInfo> {
        self.display.clone()
    }

    /// Builds the ordered fallback chain for one capture attempt.
    ///
    /// The last element is always [`CaptureTarget::FullScreen`].  A
    /// [`CaptureTarget::SelectedDisplay`] entry is only a candidate: callers
    /// try it after the preceding window step was attempted and failed.
    pub fn plan(&self) -> Vec<CaptureTarget> {
        let mut plan = Vec::with_capacity(3);
        match &self.window {
            Some(window) => plan.push(CaptureTarget::SelectedWindow(window.clone())),
            None => plan.push(CaptureTarget::AutoWindow),
        }
        if let Some(display) = &self.display {
            plan.push(CaptureTarget::SelectedDisplay(display.clone()));
        }
        plan.push(CaptureTarget::FullScreen);
        plan
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn window(id: i64) -> WindowInfo {
        WindowInfo {
            id,
            app_name: "Claude".to_string(),
            title: "Chat".to_string(),
        }
    }

    fn display(id: i64) -> DisplayInfo {
        DisplayInfo {
            id,
            is_main: true,
            x: 0,
            y: 0,
            width: 1920,
            height: 1080,
        }
    }

    #[test]
    fn test_empty_selector_plans_auto_window_then_screen() {
        let selector = CaptureTargetSelector::new();
        assert_eq!(
            selector.plan(),
            vec![CaptureTarget::AutoWindow, CaptureTarget::FullScreen]
        );
    }

    #[test]
    fn test_selected_window_replaces_auto_lookup() {
        let mut selector = CaptureTargetSelector::new();
        selector.set_selected_window(&window(7)).unwrap();
        assert_eq!(
            selector.plan(),
            vec![
                CaptureTarget::SelectedWindow(window(7)),
                CaptureTarget::FullScreen
            ]
        );
    }

    #[test]
    fn test_window_is_planned_before_display() {
        // Arrange: both selections set (caller forgot to clear one)
        let mut selector = CaptureTargetSelector::new();
        selector.set_selected_display(&display(2)).unwrap();
        selector.set_selected_window(&window(7)).unwrap();

        // Act
        let modes: Vec<_> = selector.plan().iter().map(CaptureTarget::mode).collect();

        // Assert
        assert_eq!(
            modes,
            vec![
                CaptureMode::SelectedWindow,
                CaptureMode::SelectedDisplay,
                CaptureMode::Screen
            ]
        );
    }

    #[test]
    fn test_display_only_still_tries_auto_window_first() {
        let mut selector = CaptureTargetSelector::new();
        selector.set_selected_display(&display(3)).unwrap();
        let modes: Vec<_> = selector.plan().iter().map(CaptureTarget::mode).collect();
        assert_eq!(
            modes,
            vec![
                CaptureMode::ClaudeWindow,
                CaptureMode::SelectedDisplay,
                CaptureMode::Screen
            ]
        );
    }

    #[test]
    fn test_negative_window_id_is_rejected_and_state_kept() {
        // Arrange: a valid selection already exists
        let mut selector = CaptureTargetSelector::new();
        selector.set_selected_window(&window(7)).unwrap();

        // Act
        let result = selector.set_selected_window(&window(-5));

        // Assert
        assert_eq!(
            result,
            Err(SelectionError::InvalidSelection {
                kind: "window",
                id: -5
            })
        );
        assert_eq!(selector.selected_window(), Some(window(7)));
    }

    #[test]
    fn test_negative_window_id_on_empty_selector_leaves_it_empty() {
        let mut selector = CaptureTargetSelector::new();
        assert!(selector.set_selected_window(&window(-5)).is_err());
        assert_eq!(selector.selected_window(), None);
        assert_eq!(selector.selected_display(), None);
    }

    #[test]
    fn test_zero_display_id_is_rejected() {
        let mut selector = CaptureTargetSelector::new();
        assert!(selector.set_selected_display(&display(0)).is_err());
        assert_eq!(selector.selected_display(), None);
    }

    #[test]
    fn test_selection_is_normalized() {
        let mut selector = CaptureTargetSelector::new();
        selector
            .set_selected_window(&WindowInfo {
                id: 9,
                app_name: "  Notes ".to_string(),
                title: " todo\n".to_string(),
            })
            .unwrap();
        let stored = selector.selected_window().unwrap();
        assert_eq!(stored.app_name, "Notes");
        assert_eq!(stored.title, "todo");
    }

    #[test]
    fn test_returned_selection_is_a_copy() {
        let mut selector = CaptureTargetSelector::new();
        selector.set_selected_window(&window(7)).unwrap();

        let mut copy = selector.selected_window().unwrap();
        copy.id = 99;
        copy.title.push_str(" (edited)");

        assert_eq!(selector.selected_window(), Some(window(7)));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut selector = CaptureTargetSelector::new();
        selector.clear_selected_window();
        selector.clear_selected_display();
        selector.set_selected_window(&window(1)).unwrap();
        selector.clear_selected_window();
        selector.clear_selected_window();
        assert_eq!(selector.selected_window(), None);
    }

    #[test]
    fn test_mode_serializes_as_kebab_case() {
        let json = serde_json::to_string(&CaptureMode::SelectedDisplay).unwrap();
        assert_eq!(json, "\"selected-display\"");
        assert_eq!(CaptureMode::ClaudeWindow.to_string(), "claude-window");
    }
}
