//! Podium Session Orchestrator
//!
//! Runs simulated-audience practice sessions: listens to the speaker,
//! decides when the crowd interrupts, generates the crowd's reaction and
//! speaks it back. Also hosts the optional HTTP control API.

pub mod api;
pub mod collaborators;
pub mod config;
pub mod control;
pub mod error;
pub mod orchestrator;
pub mod prompt;
pub mod reaction;
pub mod scheduler;
pub mod session_state;
pub mod sinks;
pub mod websocket;

pub use api::{create_router, AppState, ControlRequest, ErrorResponse, SessionStatus, StatusBoard};
pub use collaborators::{
    ControlSignal, ControlSource, LanguageModel, LogEntry, SettingsSource, Speaker, SpeechRecognizer,
    SpeechSynthesizer, StateSink, TranscriptSink,
};
pub use config::{
    Aggressiveness, AudienceAttitude, Difficulty, FileSettings, InterruptionMode, Settings,
    SETTINGS_FILE_NAME,
};
pub use control::{FileControl, SharedControl, CONTROL_FILE_NAME};
pub use error::{LlmErrorKind, PodiumError, Result};
pub use orchestrator::{
    is_termination_phrase, Collaborators, EndReason, Orchestrator, SessionSummary, TurnOutcome,
    GOODBYE, GREETING, TIME_OVER,
};
pub use prompt::build_system_prompt;
pub use reaction::{ReactionGenerator, LLM_ERROR_PREFIX};
pub use scheduler::{decide_event, Decision, EventType};
pub use session_state::{ConversationTurn, InterruptionWindow, RobotState, Role, SessionState};
pub use sinks::{FileStateSink, JsonlTranscript, STATE_FILE_NAME, TRANSCRIPT_FILE_NAME};
pub use websocket::{EventBroadcaster, SessionEvent};
