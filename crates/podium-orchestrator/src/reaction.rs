//! Crowd reaction generation.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::collaborators::LanguageModel;
use crate::config::Settings;
use crate::prompt::build_system_prompt;
use crate::scheduler::EventType;
use crate::session_state::{ConversationTurn, HISTORY_CONTEXT_LEN};

/// Prefix of the reply used when the language model cannot be reached.
pub const LLM_ERROR_PREFIX: &str = "An error occurred while contacting the language model: ";

/// Turns an utterance into a crowd reaction through a [`LanguageModel`].
#[derive(Clone)]
pub struct ReactionGenerator {
    llm: Arc<dyn LanguageModel>,
}

impl std::fmt::Debug for ReactionGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactionGenerator").finish_non_exhaustive()
    }
}

impl ReactionGenerator {
    /// Creates a generator backed by `llm`.
    #[must_use]
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// Generates the crowd's reply to `user_message`.
    ///
    /// The model sees the last six entries of `history` (oldest first)
    /// followed by `user_message`. `history` should not already contain
    /// `user_message`.
    ///
    /// This never fails. A model error becomes an inline error sentence
    /// that the caller speaks and logs like any other reply.
    pub async fn generate(
        &self,
        user_message: &str,
        main_topic: Option<&str>,
        event: EventType,
        settings: &Settings,
        history: &[ConversationTurn],
    ) -> String {
        let system_prompt = build_system_prompt(
            main_topic,
            event,
            settings.question_difficulty,
            settings.audience_attitude,
            settings.max_aggressiveness,
        );

        let start = history.len().saturating_sub(HISTORY_CONTEXT_LEN);
        let mut messages = history[start..].to_vec();
        messages.push(ConversationTurn::user(user_message));

        debug!(%event, context = messages.len(), "Requesting crowd reaction");

        match self.llm.complete(&system_prompt, &messages).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, transient = e.is_transient(), "Language model call failed");
                // Suggestions are for the operator's log, not for the speaker.
                let message = e.to_string();
                let detail = message.lines().next().unwrap_or_default();
                format!("{LLM_ERROR_PREFIX}{detail}")
            }
        }
    }
}
