//! Interfaces to the services a session depends on.
//!
//! The orchestrator only ever talks to these traits. Concrete speech and
//! language-model clients live in the backend crate; file-backed and
//! in-memory implementations of the control and sink traits live in
//! [`crate::control`] and [`crate::sinks`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::error::Result;
use crate::session_state::{ConversationTurn, RobotState};

// ============================================================================
// Speech and language
// ============================================================================

/// Turns the speaker's voice into text.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Captures and transcribes one utterance of at most `max_duration`.
    ///
    /// Returns an empty string on silence or failure; implementations log
    /// their own errors.
    async fn transcribe(&self, max_duration: Duration, language: &str) -> String;
}

/// Speaks crowd reactions aloud.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Speaks `text`, returning once playback is done.
    ///
    /// Must not fail: implementations log and swallow their own errors.
    async fn speak(&self, text: &str);
}

/// Produces chat completions.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Completes a conversation under the given system instruction.
    ///
    /// `messages` is ordered oldest first and does not include the system
    /// prompt; implementations place it ahead of the messages.
    async fn complete(&self, system_prompt: &str, messages: &[ConversationTurn]) -> Result<String>;
}

// ============================================================================
// Settings and control
// ============================================================================

/// Supplies the settings snapshot for a session.
pub trait SettingsSource: Send + Sync {
    /// Returns the current settings, falling back to defaults on any problem.
    fn load(&self) -> Settings;
}

/// External request for what the session should be doing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlSignal {
    /// Keep the conversation going.
    #[default]
    Running,
    /// Hold at idle without listening.
    Paused,
    /// Say goodbye and end the session.
    End,
}

impl ControlSignal {
    /// Parses a control flag; anything unrecognized means `Running`.
    #[must_use]
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "paused" | "pause" => Self::Paused,
            "end" => Self::End,
            _ => Self::Running,
        }
    }

    /// The canonical lowercase name, as written to control files.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Paused => "paused",
            Self::End => "end",
        }
    }
}

impl std::fmt::Display for ControlSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Polled once per loop iteration for the current control signal.
pub trait ControlSource: Send + Sync {
    /// Returns the current signal; `Running` when it cannot be read.
    fn read(&self) -> ControlSignal;
}

// ============================================================================
// Observers
// ============================================================================

/// Receives every robot state transition.
pub trait StateSink: Send + Sync {
    /// Publishes the new current state.
    fn publish(&self, state: RobotState);
}

/// Who produced a logged utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// The human speaker.
    User,
    /// The simulated crowd.
    Robot,
}

/// One line of the conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Who said it.
    pub speaker: Speaker,
    /// What was said.
    pub text: String,
    /// When it was logged.
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    /// Creates a log entry stamped with the current time.
    #[must_use]
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Receives every utterance from both sides, in order.
pub trait TranscriptSink: Send + Sync {
    /// Appends one entry.
    fn append(&self, entry: &LogEntry);
}

impl<T: StateSink + ?Sized> StateSink for Arc<T> {
    fn publish(&self, state: RobotState) {
        (**self).publish(state);
    }
}

impl<T: TranscriptSink + ?Sized> TranscriptSink for Arc<T> {
    fn append(&self, entry: &LogEntry) {
        (**self).append(entry);
    }
}

impl<T: StateSink> StateSink for Vec<T> {
    fn publish(&self, state: RobotState) {
        for sink in self {
            sink.publish(state);
        }
    }
}

impl<T: TranscriptSink> TranscriptSink for Vec<T> {
    fn append(&self, entry: &LogEntry) {
        for sink in self {
            sink.append(entry);
        }
    }
}
