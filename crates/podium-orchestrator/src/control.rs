//! Control-signal sources.
//!
//! [`FileControl`] polls a plain-text flag file (`running`, `paused` or
//! `end`), which is how an external panel steers a session without any
//! other channel. [`SharedControl`] keeps the signal in memory so the HTTP
//! control API can flip it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::warn;

use crate::collaborators::{ControlSignal, ControlSource};

/// The default control flag file name.
pub const CONTROL_FILE_NAME: &str = "control_flags.txt";

/// Control signal stored in a text file.
#[derive(Debug, Clone)]
pub struct FileControl {
    path: PathBuf,
}

impl FileControl {
    /// Creates a control source backed by the given file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a control source for `control_flags.txt` inside `dir`.
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(CONTROL_FILE_NAME))
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrites the flag file. Failures are logged, not returned.
    pub fn write(&self, signal: ControlSignal) {
        if let Err(e) = std::fs::write(&self.path, signal.as_str()) {
            warn!(path = %self.path.display(), error = %e, "Failed to write control flag");
        }
    }

    /// Resets the flag to `running`, so a stale `end` from a previous
    /// session does not stop the new one immediately.
    pub fn reset(&self) {
        self.write(ControlSignal::Running);
    }
}

impl ControlSource for FileControl {
    fn read(&self) -> ControlSignal {
        std::fs::read_to_string(&self.path)
            .map_or(ControlSignal::Running, |contents| {
                ControlSignal::parse_lenient(&contents)
            })
    }
}

/// In-memory control signal shared between the session and the control API.
#[derive(Debug, Clone)]
pub struct SharedControl {
    tx: Arc<watch::Sender<ControlSignal>>,
}

impl Default for SharedControl {
    fn default() -> Self {
        Self::new(ControlSignal::Running)
    }
}

impl SharedControl {
    /// Creates a shared signal with the given initial value.
    #[must_use]
    pub fn new(initial: ControlSignal) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Replaces the current signal.
    pub fn set(&self, signal: ControlSignal) {
        self.tx.send_replace(signal);
    }
}

impl ControlSource for SharedControl {
    fn read(&self) -> ControlSignal {
        *self.tx.borrow()
    }
}
