//! JSON session snapshot on disk.
//!
//! The snapshot is rewritten in full after every change.  A write goes to
//! `<path>.tmp` first and is then renamed over `<path>`, so a crash mid-write
//! leaves either the old snapshot or the new one, never a truncated file.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::application::{PersistenceError, SessionPersistence};

/// Stores the session snapshot at a fixed path.
#[derive(Debug, Clone)]
pub struct JsonSnapshotFile {
    path: PathBuf,
}

impl JsonSnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("sessions.json"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PersistenceError + '_ {
        move |source| PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[async_trait]
impl SessionPersistence for JsonSnapshotFile {
    async fn load(&self) -> Result<Option<String>, PersistenceError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_error(&self.path)(e)),
        }
    }

    async fn save(&self, snapshot: &str) -> Result<(), PersistenceError> {
        // Ensure directory exists before writing.
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(Self::io_error(dir))?;
        }

        let tmp = self.temp_path();
        tokio::fs::write(&tmp, snapshot)
            .await
            .map_err(Self::io_error(&tmp))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(Self::io_error(&self.path))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
