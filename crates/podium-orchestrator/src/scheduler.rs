//! Interruption scheduling.
//!
//! [`decide_event`] is a pure function of the settings, the session clock,
//! the rate-limit window and a random source. It never touches session
//! state directly; the caller stores the returned clock and window.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{InterruptionMode, Settings};
use crate::session_state::InterruptionWindow;

/// Minimum gap, in seconds, between interruptions in random mode.
pub const RANDOM_MIN_GAP_SECS: f64 = 5.0;

/// Probability of interrupting on an eligible turn in random mode.
pub const RANDOM_INTERRUPT_PROBABILITY: f64 = 0.4;

/// What the crowd does after an utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// The crowd stays silent.
    NoReaction,
    /// A brief, low-intensity reaction. Supported by the prompt builder but
    /// never chosen by the scheduler.
    SoftReaction,
    /// A sharp question that interrupts the speaker.
    InterruptionQuestion,
}

impl EventType {
    /// Returns `true` if the crowd says anything for this event.
    #[must_use]
    pub const fn is_audible(&self) -> bool {
        !matches!(self, Self::NoReaction)
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoReaction => write!(f, "no_reaction"),
            Self::SoftReaction => write!(f, "soft_reaction"),
            Self::InterruptionQuestion => write!(f, "interruption_question"),
        }
    }
}

/// Outcome of one scheduling decision.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// The event chosen for this turn.
    pub event: EventType,
    /// Session time of the last interruption after this decision.
    pub last_interrupt_time: f64,
    /// Pruned window after this decision.
    pub interruptions: InterruptionWindow,
}

/// Decides whether the crowd interrupts at session time `now`.
///
/// All times are seconds on the same monotonic clock. The window may be
/// stale; it is pruned to the trailing minute before anything else and the
/// pruned window is always returned.
pub fn decide_event<R: Rng + ?Sized>(
    settings: &Settings,
    now: f64,
    start_time: f64,
    last_interrupt_time: f64,
    mut interruptions: InterruptionWindow,
    rng: &mut R,
) -> Decision {
    interruptions.prune(now);

    let silent = |interruptions| Decision {
        event: EventType::NoReaction,
        last_interrupt_time,
        interruptions,
    };

    if now - start_time < settings.warmup_seconds {
        return silent(interruptions);
    }

    let limit = settings.max_interruptions_per_minute;
    if limit > 0 && interruptions.len() >= limit as usize {
        return silent(interruptions);
    }

    let since_last = now - last_interrupt_time;
    let interrupt = match settings.interruption_mode {
        InterruptionMode::Fixed => since_last >= settings.fixed_interval_seconds,
        InterruptionMode::Random => {
            since_last >= RANDOM_MIN_GAP_SECS
                && rng.gen::<f64>() < RANDOM_INTERRUPT_PROBABILITY
        }
    };

    if !interrupt {
        return silent(interruptions);
    }

    interruptions.record(now);
    Decision {
        event: EventType::InterruptionQuestion,
        last_interrupt_time: now,
        interruptions,
    }
}
