//! Session state types for the Podium orchestrator.
//!
//! This module defines the observable robot state, the conversation history
//! fed to the language model, the trailing interruption window used for rate
//! limiting, and the `SessionState` record that the orchestrator owns for the
//! lifetime of one session.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tokio::time::{Duration, Instant};

/// Number of history entries passed to the language model as context.
pub const HISTORY_CONTEXT_LEN: usize = 6;

/// Trailing span, in seconds, of the interruption rate-limit window.
pub const INTERRUPTION_WINDOW_SECS: f64 = 60.0;

/// Minimum number of words an utterance needs to become the main topic.
pub const MIN_TOPIC_WORDS: usize = 3;

// ============================================================================
// RobotState
// ============================================================================

/// What the simulated crowd is doing right now.
///
/// The state cycles `Idle -> Listening -> Thinking -> Speaking -> Idle`.
/// Greeting and goodbye jump straight from `Idle` to `Speaking`. Only the
/// latest value matters; observers are told about every transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotState {
    /// Waiting between turns, or paused.
    #[default]
    Idle,
    /// Capturing the speaker's utterance.
    Listening,
    /// Waiting for the language model.
    Thinking,
    /// Playing back a crowd reaction.
    Speaking,
}

impl RobotState {
    /// The canonical lowercase name, as written to state files.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::Thinking => "thinking",
            Self::Speaking => "speaking",
        }
    }
}

impl std::fmt::Display for RobotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Conversation history
// ============================================================================

/// Author of a conversation turn, in chat-completion terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human speaker.
    User,
    /// The simulated crowd.
    Assistant,
}

impl Role {
    /// The role name used by chat-completion APIs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One entry of the conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Who said it.
    pub role: Role,
    /// What was said.
    pub content: String,
}

impl ConversationTurn {
    /// Creates a turn spoken by the human.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates a turn spoken by the crowd.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// ============================================================================
// InterruptionWindow
// ============================================================================

/// Session-relative timestamps (seconds) of past hard interruptions.
///
/// Timestamps are kept in insertion order, which is also chronological
/// because the session clock is monotonic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterruptionWindow {
    timestamps: VecDeque<f64>,
}

impl InterruptionWindow {
    /// Creates an empty window.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every timestamp older than the trailing 60 seconds at `now`.
    pub fn prune(&mut self, now: f64) {
        self.timestamps
            .retain(|t| now - t <= INTERRUPTION_WINDOW_SECS);
    }

    /// Records an interruption at `now`.
    pub fn record(&mut self, now: f64) {
        self.timestamps.push_back(now);
    }

    /// Number of interruptions currently in the window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Returns `true` if no interruption is in the window.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Iterates over the retained timestamps, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.timestamps.iter().copied()
    }
}

impl FromIterator<f64> for InterruptionWindow {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Self {
            timestamps: iter.into_iter().collect(),
        }
    }
}

// ============================================================================
// SessionState
// ============================================================================

/// Everything one session remembers between turns.
///
/// Times handed to the scheduler are seconds since `started_at`, so the
/// session starts at `0.0` and `last_interrupt_time` starts there too.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Conversation so far, oldest first.
    pub history: Vec<ConversationTurn>,

    /// The first substantive utterance, locked once set.
    main_topic: Option<String>,

    /// Monotonic start of the session.
    pub started_at: Instant,

    /// Session time (seconds) of the last emitted interruption.
    pub last_interrupt_time: f64,

    /// Recent interruptions for rate limiting.
    pub interruptions: InterruptionWindow,

    /// Total interruptions emitted this session.
    pub interruption_count: u32,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    /// Creates a fresh session starting now.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Creates a fresh session with an explicit start instant.
    #[must_use]
    pub fn starting_at(started_at: Instant) -> Self {
        Self {
            history: Vec::new(),
            main_topic: None,
            started_at,
            last_interrupt_time: 0.0,
            interruptions: InterruptionWindow::new(),
            interruption_count: 0,
        }
    }

    /// Time elapsed since the session started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Session time in seconds, as used by the scheduler.
    #[must_use]
    pub fn now_secs(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }

    /// The locked main topic, if any.
    #[must_use]
    pub fn main_topic(&self) -> Option<&str> {
        self.main_topic.as_deref()
    }

    /// Records what the speaker said and locks the main topic if possible.
    ///
    /// Returns `true` if this utterance became the main topic.
    pub fn record_user(&mut self, text: &str) -> bool {
        self.history.push(ConversationTurn::user(text));
        self.try_lock_topic(text)
    }

    /// Records a crowd reaction.
    pub fn record_reply(&mut self, text: &str) {
        self.history.push(ConversationTurn::assistant(text));
    }

    /// Sets the main topic from `text` if none is set and it has enough words.
    ///
    /// Returns `true` if the topic was set by this call.
    pub fn try_lock_topic(&mut self, text: &str) -> bool {
        if self.main_topic.is_some() || text.split_whitespace().count() < MIN_TOPIC_WORDS {
            return false;
        }
        self.main_topic = Some(text.trim().to_string());
        true
    }

    /// The last `HISTORY_CONTEXT_LEN` entries, oldest first.
    #[must_use]
    pub fn recent_history(&self) -> &[ConversationTurn] {
        let start = self.history.len().saturating_sub(HISTORY_CONTEXT_LEN);
        &self.history[start..]
    }
}

// ============================================================================
// Tests
// ============================================================================
