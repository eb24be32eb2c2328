//! Window and display listing port.
//!
//! Listing is delegated to external helpers; the application layer only sees
//! this trait.  A failed lookup is an error, not an empty list, so the HTTP
//! layer can tell "no windows open" apart from "could not ask".

use async_trait::async_trait;
use thiserror::Error;

use bridge_core::{DisplayInfo, WindowInfo};

/// Failure to enumerate windows or displays.
#[derive(Debug, Error)]
pub enum EnumerationError {
    /// The helper could not be run or exited unsuccessfully.
    #[error("enumeration helper failed: {0}")]
    Helper(String),
}

/// Lists the windows and displays available for capture.
///
/// Implementations return lists already de-duplicated and sorted (see
/// `bridge_core::capture::listing`).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DesktopCatalog: Send + Sync {
    async fn list_windows(&self) -> Result<Vec<WindowInfo>, EnumerationError>;

    async fn list_displays(&self) -> Result<Vec<DisplayInfo>, EnumerationError>;
}
