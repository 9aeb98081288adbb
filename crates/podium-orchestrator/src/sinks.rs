//! File-backed observers.
//!
//! [`FileStateSink`] keeps a single-word state file current for external
//! displays, and [`JsonlTranscript`] appends every utterance as one JSON
//! line. Neither ever fails the session: I/O problems are logged at `warn`.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::warn;

use crate::collaborators::{LogEntry, StateSink, TranscriptSink};
use crate::session_state::RobotState;

/// The default robot state file name.
pub const STATE_FILE_NAME: &str = "robot_state.txt";

/// The default transcript file name.
pub const TRANSCRIPT_FILE_NAME: &str = "conversation_log.jsonl";

/// Writes the current robot state to a file, replacing its contents.
#[derive(Debug, Clone)]
pub struct FileStateSink {
    path: PathBuf,
}

impl FileStateSink {
    /// Creates a sink writing to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a sink for `robot_state.txt` inside `dir`.
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(STATE_FILE_NAME))
    }

    /// Path of the state file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateSink for FileStateSink {
    fn publish(&self, state: RobotState) {
        if let Err(e) = std::fs::write(&self.path, state.as_str()) {
            warn!(path = %self.path.display(), error = %e, "Failed to write robot state");
        }
    }
}

/// Appends log entries to a JSON Lines file.
///
/// Appends are serialized through a mutex so concurrent writers never
/// interleave partial lines.
#[derive(Debug)]
pub struct JsonlTranscript {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlTranscript {
    /// Creates a transcript appending to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Creates a transcript for `conversation_log.jsonl` inside `dir`.
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(TRANSCRIPT_FILE_NAME))
    }

    /// Path of the transcript file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn try_append(&self, entry: &LogEntry) -> std::io::Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let _guard = self
            .lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())
    }
}

impl TranscriptSink for JsonlTranscript {
    fn append(&self, entry: &LogEntry) {
        if let Err(e) = self.try_append(entry) {
            warn!(path = %self.path.display(), error = %e, "Failed to append to transcript");
        }
    }
}
