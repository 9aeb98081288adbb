//! Error types for the Podium orchestrator.
//!
//! Only startup can fail hard. Everything that goes wrong inside the turn
//! loop is absorbed at the collaborator boundary, so most variants here are
//! produced by collaborators and then logged or converted by their callers.

use std::path::PathBuf;

/// A specialized `Result` type for Podium orchestrator operations.
pub type Result<T> = std::result::Result<T, PodiumError>;

/// Errors that can occur while preparing or running a practice session.
#[derive(Debug, thiserror::Error)]
pub enum PodiumError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// The settings file exists but could not be parsed.
    ///
    /// Callers fall back to default settings when they see this.
    #[error("Invalid JSON in settings file '{path}': {message}\n\nSuggestion: Validate your settings.json with a JSON linter")]
    SettingsParseError {
        /// Path to the settings file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// A credential required by a collaborator is missing.
    ///
    /// This is the only condition that aborts a session before the loop starts.
    #[error("Missing credential: {variable} is not set\n\nSuggestion: Add {variable} to your environment or .env file")]
    MissingCredential {
        /// Name of the environment variable that should hold the credential.
        variable: String,
    },

    // ========================================================================
    // Language Model Errors
    // ========================================================================
    /// The language-model API returned an error.
    #[error("LLM API error ({kind}): {message}\n\nSuggestion: {suggestion}")]
    LlmApiError {
        /// The kind of API error.
        kind: LlmErrorKind,
        /// Detailed error message from the API.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    /// The language model answered without any text content.
    #[error("LLM returned an empty completion")]
    EmptyCompletion,

    // ========================================================================
    // General I/O Errors
    // ========================================================================
    /// General I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Categories of LLM API errors for structured error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// Authentication failure (invalid API key, expired credentials).
    Authentication,
    /// Rate limit or quota exceeded.
    RateLimit,
    /// Server error (5xx responses).
    Server,
    /// Network connectivity issues.
    Network,
    /// Other unclassified errors.
    Other,
}

impl std::fmt::Display for LlmErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::RateLimit => write!(f, "rate_limit"),
            Self::Server => write!(f, "server"),
            Self::Network => write!(f, "network"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl LlmErrorKind {
    /// Classifies an HTTP status code returned by an LLM endpoint.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Authentication,
            429 => Self::RateLimit,
            500..=599 => Self::Server,
            _ => Self::Other,
        }
    }

    /// Returns a suggestion message for this error kind.
    #[must_use]
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::Authentication => "Check your API key or credentials",
            Self::RateLimit => "Wait and retry, or check your quota",
            Self::Server => "Retry later; the LLM service may be experiencing issues",
            Self::Network => "Check your network connection",
            Self::Other => "Check the LLM provider's status page",
        }
    }
}

impl PodiumError {
    /// Creates a new `SettingsParseError` with the given path and message.
    #[must_use]
    pub fn settings_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::SettingsParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `MissingCredential` error.
    #[must_use]
    pub fn missing_credential(variable: impl Into<String>) -> Self {
        Self::MissingCredential {
            variable: variable.into(),
        }
    }

    /// Creates a new `LlmApiError` with automatic suggestion based on error kind.
    #[must_use]
    pub fn llm_api_error(kind: LlmErrorKind, message: impl Into<String>) -> Self {
        let suggestion = kind.suggestion().to_string();
        Self::LlmApiError {
            kind,
            message: message.into(),
            suggestion,
        }
    }

    /// Returns `true` if this error is transient and a later turn may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::LlmApiError {
                kind: LlmErrorKind::RateLimit | LlmErrorKind::Server | LlmErrorKind::Network,
                ..
            } | Self::EmptyCompletion
        )
    }

    /// Returns `true` if this error must abort the session before it starts.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::MissingCredential { .. })
    }
}
