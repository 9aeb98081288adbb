//! The turn loop that drives a practice session.
//!
//! One [`Orchestrator`] runs one session as a single sequential task:
//!
//! ```text
//! control check -> budget check -> listen -> record -> decide
//!     -> (think -> speak) -> idle
//! ```
//!
//! Each collaborator call is awaited before the next phase starts, so
//! listening, thinking and speaking never overlap. The control signal is
//! polled once per iteration and cannot preempt a call already in flight.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::collaborators::{
    ControlSignal, ControlSource, LanguageModel, LogEntry, SettingsSource, Speaker, SpeechRecognizer,
    SpeechSynthesizer, StateSink, TranscriptSink,
};
use crate::config::Settings;
use crate::reaction::ReactionGenerator;
use crate::scheduler::{decide_event, EventType};
use crate::session_state::{RobotState, SessionState};

/// Spoken once when the session starts.
pub const GREETING: &str = "Hello, I am ready to talk with you. You can speak whenever you are ready.";

/// Spoken when the session ends by control signal or termination phrase.
pub const GOODBYE: &str = "Okay, ending the conversation now. Goodbye.";

/// Spoken when the session budget runs out.
pub const TIME_OVER: &str = "The session time is over. Thank you for speaking.";

/// Utterances that end the session when spoken on their own.
pub const TERMINATION_PHRASES: [&str; 4] = ["end conversation", "stop", "shutdown", "goodbye"];

/// Recognition language.
pub const LANGUAGE: &str = "en";

/// How long to wait before re-checking the control signal while paused.
pub const PAUSE_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Breather after the crowd has spoken.
pub const POST_SPEECH_PAUSE: Duration = Duration::from_millis(200);

/// Returns `true` if `text` is exactly one of the termination phrases,
/// ignoring case and surrounding whitespace.
#[must_use]
pub fn is_termination_phrase(text: &str) -> bool {
    let cleaned = text.trim().to_lowercase();
    TERMINATION_PHRASES.contains(&cleaned.as_str())
}

// ============================================================================
// Outcomes
// ============================================================================

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The control signal asked for `end`.
    ControlSignal,
    /// The speaker said a termination phrase.
    TerminationPhrase,
    /// `total_session_minutes` elapsed.
    TimeBudget,
}

impl std::fmt::Display for EndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ControlSignal => write!(f, "control_signal"),
            Self::TerminationPhrase => write!(f, "termination_phrase"),
            Self::TimeBudget => write!(f, "time_budget"),
        }
    }
}

/// What happened during one loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The control signal said `paused`; nothing was captured.
    Paused,
    /// The transcript was empty.
    Silence,
    /// The speaker was heard and the crowd stayed quiet.
    NoReaction,
    /// The crowd reacted out loud.
    Reacted(EventType),
    /// The session is over.
    Ended(EndReason),
}

/// Summary returned when a session ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Why the session ended.
    pub ended_by: EndReason,
    /// Non-empty utterances heard from the speaker.
    pub turns: u32,
    /// Interruptions the crowd emitted.
    pub interruptions: u32,
    /// The locked main topic, if one was set.
    pub main_topic: Option<String>,
    /// Wall-clock length of the session.
    pub duration: Duration,
}

// ============================================================================
// Orchestrator
// ============================================================================

/// The external services a session talks to.
#[derive(Clone)]
pub struct Collaborators {
    /// Speech-to-text.
    pub recognizer: Arc<dyn SpeechRecognizer>,
    /// Text-to-speech.
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    /// Chat completions.
    pub llm: Arc<dyn LanguageModel>,
    /// External run/pause/end signal.
    pub control: Arc<dyn ControlSource>,
    /// Observer of robot state transitions.
    pub state_sink: Arc<dyn StateSink>,
    /// Observer of every utterance.
    pub transcript: Arc<dyn TranscriptSink>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Drives one practice session from greeting to goodbye.
pub struct Orchestrator {
    settings: Settings,
    recognizer: Arc<dyn SpeechRecognizer>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    reactions: ReactionGenerator,
    control: Arc<dyn ControlSource>,
    state_sink: Arc<dyn StateSink>,
    transcript: Arc<dyn TranscriptSink>,
    rng: Box<dyn RngCore + Send + Sync>,
    session: SessionState,
    turns: u32,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("settings", &self.settings)
            .field("session", &self.session)
            .field("turns", &self.turns)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Creates an orchestrator, reading settings from `settings` once.
    #[must_use]
    pub fn new(settings: &dyn SettingsSource, collaborators: Collaborators) -> Self {
        let Collaborators {
            recognizer,
            synthesizer,
            llm,
            control,
            state_sink,
            transcript,
        } = collaborators;

        Self {
            settings: settings.load(),
            recognizer,
            synthesizer,
            reactions: ReactionGenerator::new(llm),
            control,
            state_sink,
            transcript,
            rng: Box::new(StdRng::from_entropy()),
            session: SessionState::new(),
            turns: 0,
        }
    }

    /// Replaces the random source used by the scheduler.
    #[must_use]
    pub fn with_rng(mut self, rng: impl RngCore + Send + Sync + 'static) -> Self {
        self.rng = Box::new(rng);
        self
    }

    /// The settings this session runs with.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The session state so far.
    #[must_use]
    pub const fn session(&self) -> &SessionState {
        &self.session
    }

    /// Runs the whole session: greeting, turns until an end condition, and
    /// the matching closing line.
    pub async fn run(&mut self) -> SessionSummary {
        self.session = SessionState::new();
        self.turns = 0;

        info!(
            mode = self.settings.interruption_mode.as_str(),
            difficulty = self.settings.question_difficulty.as_str(),
            attitude = self.settings.audience_attitude.as_str(),
            "Starting practice session"
        );

        self.greet().await;

        let ended_by = loop {
            if let TurnOutcome::Ended(reason) = self.run_turn().await {
                break reason;
            }
        };

        let summary = SessionSummary {
            ended_by,
            turns: self.turns,
            interruptions: self.session.interruption_count,
            main_topic: self.session.main_topic().map(str::to_string),
            duration: self.session.elapsed(),
        };

        info!(
            ended_by = %summary.ended_by,
            turns = summary.turns,
            interruptions = summary.interruptions,
            "Session ended"
        );

        summary
    }

    /// Speaks the greeting.
    pub async fn greet(&self) {
        info!("Greeting the speaker");
        self.say(GREETING).await;
    }

    /// Runs one loop iteration.
    pub async fn run_turn(&mut self) -> TurnOutcome {
        match self.control.read() {
            ControlSignal::End => {
                info!("End requested by control signal");
                self.say(GOODBYE).await;
                return TurnOutcome::Ended(EndReason::ControlSignal);
            }
            ControlSignal::Paused => {
                self.state_sink.publish(RobotState::Idle);
                tokio::time::sleep(PAUSE_POLL_INTERVAL).await;
                return TurnOutcome::Paused;
            }
            ControlSignal::Running => {}
        }

        if let Some(budget) = self.settings.session_budget() {
            if self.session.elapsed() >= budget {
                info!(budget_secs = budget.as_secs_f64(), "Session budget exhausted");
                self.say(TIME_OVER).await;
                return TurnOutcome::Ended(EndReason::TimeBudget);
            }
        }

        self.state_sink.publish(RobotState::Listening);
        let user_text = self
            .recognizer
            .transcribe(self.settings.max_speaking_duration(), LANGUAGE)
            .await;

        if user_text.trim().is_empty() {
            debug!("Nothing heard");
            self.state_sink.publish(RobotState::Idle);
            return TurnOutcome::Silence;
        }

        let now = self.session.now_secs();
        self.turns += 1;
        debug!(text = %user_text, "Speaker said");

        self.transcript.append(&LogEntry::new(Speaker::User, user_text.as_str()));
        let prior = self.session.history.len();
        if self.session.record_user(&user_text) {
            info!(topic = self.session.main_topic().unwrap_or_default(), "Main topic set");
        }

        if is_termination_phrase(&user_text) {
            info!("Termination phrase heard");
            self.say(GOODBYE).await;
            return TurnOutcome::Ended(EndReason::TerminationPhrase);
        }

        let decision = decide_event(
            &self.settings,
            now,
            0.0,
            self.session.last_interrupt_time,
            std::mem::take(&mut self.session.interruptions),
            &mut *self.rng,
        );
        self.session.last_interrupt_time = decision.last_interrupt_time;
        self.session.interruptions = decision.interruptions;
        debug!(
            event = %decision.event,
            at = now,
            window = self.session.interruptions.len(),
            "Scheduler decided"
        );

        if !decision.event.is_audible() {
            self.state_sink.publish(RobotState::Idle);
            return TurnOutcome::NoReaction;
        }

        if decision.event == EventType::InterruptionQuestion {
            self.session.interruption_count += 1;
            info!(at = now, count = self.session.interruption_count, "Crowd interrupts");
        }

        self.state_sink.publish(RobotState::Thinking);
        let reply = self
            .reactions
            .generate(
                &user_text,
                self.session.main_topic(),
                decision.event,
                &self.settings,
                &self.session.history[..prior],
            )
            .await;

        self.transcript.append(&LogEntry::new(Speaker::Robot, reply.as_str()));
        self.session.record_reply(&reply);

        self.state_sink.publish(RobotState::Speaking);
        self.synthesizer.speak(&reply).await;
        self.state_sink.publish(RobotState::Idle);
        tokio::time::sleep(POST_SPEECH_PAUSE).await;

        TurnOutcome::Reacted(decision.event)
    }

    /// Speaks a fixed line: speaking, speak, log as robot, idle.
    async fn say(&self, text: &str) {
        self.state_sink.publish(RobotState::Speaking);
        self.synthesizer.speak(text).await;
        self.transcript.append(&LogEntry::new(Speaker::Robot, text));
        self.state_sink.publish(RobotState::Idle);
    }
}

// ============================================================================
// Tests
// ============================================================================
