//! Podium Backends
//!
//! Concrete implementations of the orchestrator's speech and language-model
//! traits:
//!
//! - [`ChatCompletionsClient`] talks to any OpenAI-compatible
//!   `/chat/completions` endpoint (Grok by default)
//! - [`ConsoleRecognizer`] and [`ConsoleSynthesizer`] simulate the speech
//!   channel on a terminal
//! - [`OpenAiSynthesizer`] renders crowd lines to WAV files through the
//!   OpenAI speech API

pub mod console;
pub mod llm;
pub mod tts;

use podium_orchestrator::{LlmErrorKind, PodiumError};

pub use console::{ConsoleRecognizer, ConsoleSynthesizer};
pub use llm::{ChatCompletionsClient, DEFAULT_LLM_BASE_URL, DEFAULT_LLM_MODEL};
pub use tts::{normalize_voice, OpenAiSynthesizer, DEFAULT_VOICE, SUPPORTED_VOICES, TTS_MODEL};

/// Environment variable holding the language-model API key.
pub const LLM_API_KEY_VAR: &str = "GROK_API_KEY";

/// Environment variable overriding the language-model base URL.
pub const LLM_BASE_URL_VAR: &str = "PODIUM_LLM_BASE_URL";

/// Environment variable overriding the language-model name.
pub const LLM_MODEL_VAR: &str = "PODIUM_LLM_MODEL";

/// Environment variable holding the speech API key.
pub const TTS_API_KEY_VAR: &str = "OPENAI_API_KEY";

/// A specialized `Result` type for backend operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Errors raised by the HTTP backends.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The request could not be sent or the response could not be read.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The (possibly truncated) response body.
        body: String,
    },

    /// The response was well-formed but carried no usable content.
    #[error("Empty response: {0}")]
    EmptyResponse(String),

    /// A local file operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Longest response body kept in error messages.
const MAX_ERROR_BODY: usize = 500;

impl BackendError {
    /// Creates a `Status` error, truncating long bodies.
    #[must_use]
    pub fn status(status: u16, body: &str) -> Self {
        let body = if body.len() > MAX_ERROR_BODY {
            let mut end = MAX_ERROR_BODY;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &body[..end])
        } else {
            body.to_string()
        };
        Self::Status { status, body }
    }

    /// Classifies this error the way the orchestrator reports LLM failures.
    #[must_use]
    pub fn llm_kind(&self) -> LlmErrorKind {
        match self {
            Self::Http(e) if e.is_decode() => LlmErrorKind::Other,
            Self::Http(_) => LlmErrorKind::Network,
            Self::Status { status, .. } => LlmErrorKind::from_status(*status),
            Self::EmptyResponse(_) | Self::Io(_) => LlmErrorKind::Other,
        }
    }
}

impl From<BackendError> for PodiumError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Io(e) => Self::Io(e),
            BackendError::EmptyResponse(_) => Self::EmptyCompletion,
            other => Self::llm_api_error(other.llm_kind(), other.to_string()),
        }
    }
}
