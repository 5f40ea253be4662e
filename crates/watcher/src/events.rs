//! Event types flowing through the watcher
//!
//! Raw events come in from the filesystem adapter; ready events and
//! diagnostic messages go out through the notification channels.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::time::Instant;

/// Kind of raw filesystem change that reached the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    /// File was created
    Created,
    /// File content, size or metadata changed
    Modified,
}

/// A filtered filesystem change for one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// Full path as reported by the source
    pub full_path: PathBuf,
    /// File name without directory; the tracking key
    pub name: String,
    /// Type of change
    pub kind: ChangeKind,
    /// When the change was observed
    pub observed_at: Instant,
}

impl RawEvent {
    /// Create an event observed now
    ///
    /// Returns `None` for paths without a file name component (`/`, `..`).
    pub fn new(full_path: impl Into<PathBuf>, kind: ChangeKind) -> Option<Self> {
        Self::observed_at(full_path, kind, Instant::now())
    }

    /// Create an event with an explicit observation time
    pub fn observed_at(
        full_path: impl Into<PathBuf>,
        kind: ChangeKind,
        observed_at: Instant,
    ) -> Option<Self> {
        let full_path = full_path.into();
        let name = file_name(&full_path)?;
        Some(Self {
            full_path,
            name,
            kind,
            observed_at,
        })
    }
}

/// Extract the tracking key for a path
pub(crate) fn file_name(path: &Path) -> Option<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

/// A file that stopped changing long enough to be considered complete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReady {
    /// Most recently observed path for the file
    pub full_path: PathBuf,
    /// File name
    pub name: String,
    /// Wall-clock time of the ready declaration
    pub timestamp: SystemTime,
}

/// Free-form status text raised by the tracker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticMessage {
    /// Message text
    pub text: String,
}

impl DiagnosticMessage {
    /// Create a diagnostic message
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl std::fmt::Display for DiagnosticMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}
