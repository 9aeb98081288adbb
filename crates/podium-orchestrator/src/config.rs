//! Session settings for the Podium orchestrator.
//!
//! Settings are read once when a session starts. A missing or malformed
//! settings file never stops a session. Every field has a default and a
//! bad value only costs its own field. Enum values parse case-insensitively
//! and unrecognized enum strings map to the fallback branch the prompt
//! builder uses for them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::collaborators::SettingsSource;
use crate::error::{PodiumError, Result};

/// The default settings file name.
pub const SETTINGS_FILE_NAME: &str = "settings.json";

const fn default_fixed_interval_seconds() -> f64 {
    30.0
}

const fn default_max_interruptions_per_minute() -> u32 {
    3
}

const fn default_max_speaking_seconds() -> f64 {
    15.0
}

/// Settings for one practice session.
///
/// Keys are snake_case in JSON, matching the files written by the control
/// panel. Unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// How cognitively demanding the crowd's questions are.
    #[serde(default)]
    pub question_difficulty: Difficulty,

    /// Whether interruptions happen on a fixed cadence or at random.
    #[serde(default)]
    pub interruption_mode: InterruptionMode,

    /// Seconds between interruptions in fixed mode.
    #[serde(default = "default_fixed_interval_seconds")]
    pub fixed_interval_seconds: f64,

    /// Hard interruptions allowed per trailing minute (0 disables the limit).
    #[serde(default = "default_max_interruptions_per_minute")]
    pub max_interruptions_per_minute: u32,

    /// Emotional stance of the simulated audience.
    #[serde(default)]
    pub audience_attitude: AudienceAttitude,

    /// How sharp the crowd's challenges may get.
    #[serde(default)]
    pub max_aggressiveness: Aggressiveness,

    /// Session length in minutes (0 = unlimited).
    #[serde(default)]
    pub total_session_minutes: f64,

    /// Initial span in seconds during which the crowd never interrupts.
    #[serde(default)]
    pub warmup_seconds: f64,

    /// Upper bound for a single listening phase, in seconds.
    #[serde(default = "default_max_speaking_seconds")]
    pub max_speaking_seconds: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            question_difficulty: Difficulty::default(),
            interruption_mode: InterruptionMode::default(),
            fixed_interval_seconds: default_fixed_interval_seconds(),
            max_interruptions_per_minute: default_max_interruptions_per_minute(),
            audience_attitude: AudienceAttitude::default(),
            max_aggressiveness: Aggressiveness::default(),
            total_session_minutes: 0.0,
            warmup_seconds: 0.0,
            max_speaking_seconds: default_max_speaking_seconds(),
        }
    }
}

impl Settings {
    /// Loads settings from a file, falling back to defaults on any problem.
    ///
    /// A missing file silently yields defaults; an unreadable or malformed
    /// file logs a warning first.
    pub fn load_from_file(path: &Path) -> Self {
        match Self::try_load_from_file(path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Falling back to default settings");
                Self::default()
            }
        }
    }

    /// Loads settings from a file, reporting parse failures.
    ///
    /// If the file does not exist, returns default settings. Values that
    /// parse but are out of range are replaced by their defaults.
    ///
    /// # Errors
    ///
    /// Returns `PodiumError::SettingsParseError` if the file cannot be read
    /// or does not contain a valid settings object.
    pub fn try_load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(PodiumError::settings_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let value: Value = serde_json::from_str(&contents)
            .map_err(|e| PodiumError::settings_parse(path, e.to_string()))?;
        let Value::Object(fields) = value else {
            return Err(PodiumError::settings_parse(path, "expected a JSON object"));
        };
        Ok(Self::from_fields(&fields).sanitized())
    }

    /// Builds settings from a JSON object one field at a time.
    ///
    /// A field that is missing or fails to parse keeps its default; the
    /// other fields are unaffected. Unknown keys are ignored.
    #[must_use]
    pub fn from_fields(fields: &Map<String, Value>) -> Self {
        let mut settings = Self::default();
        take_field(fields, "question_difficulty", &mut settings.question_difficulty);
        take_field(fields, "interruption_mode", &mut settings.interruption_mode);
        take_field(fields, "fixed_interval_seconds", &mut settings.fixed_interval_seconds);
        take_field(
            fields,
            "max_interruptions_per_minute",
            &mut settings.max_interruptions_per_minute,
        );
        take_field(fields, "audience_attitude", &mut settings.audience_attitude);
        take_field(fields, "max_aggressiveness", &mut settings.max_aggressiveness);
        take_field(fields, "total_session_minutes", &mut settings.total_session_minutes);
        take_field(fields, "warmup_seconds", &mut settings.warmup_seconds);
        take_field(fields, "max_speaking_seconds", &mut settings.max_speaking_seconds);
        settings
    }

    /// Replaces out-of-range numeric values with their defaults.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        if !(self.fixed_interval_seconds.is_finite() && self.fixed_interval_seconds > 0.0) {
            warn!(
                value = self.fixed_interval_seconds,
                "fixed_interval_seconds must be positive; using default"
            );
            self.fixed_interval_seconds = default_fixed_interval_seconds();
        }
        if !(self.max_speaking_seconds.is_finite() && self.max_speaking_seconds > 0.0) {
            warn!(
                value = self.max_speaking_seconds,
                "max_speaking_seconds must be positive; using default"
            );
            self.max_speaking_seconds = default_max_speaking_seconds();
        }
        if !(self.warmup_seconds.is_finite() && self.warmup_seconds >= 0.0) {
            warn!(value = self.warmup_seconds, "warmup_seconds must be non-negative; using 0");
            self.warmup_seconds = 0.0;
        }
        if !(self.total_session_minutes.is_finite() && self.total_session_minutes >= 0.0) {
            warn!(
                value = self.total_session_minutes,
                "total_session_minutes must be non-negative; using 0 (unlimited)"
            );
            self.total_session_minutes = 0.0;
        }
        self
    }

    /// Upper bound for one listening phase.
    #[must_use]
    pub fn max_speaking_duration(&self) -> Duration {
        Duration::from_secs_f64(self.max_speaking_seconds)
    }

    /// Total session budget, or `None` when the session is unlimited.
    #[must_use]
    pub fn session_budget(&self) -> Option<Duration> {
        (self.total_session_minutes > 0.0)
            .then(|| Duration::from_secs_f64(self.total_session_minutes * 60.0))
    }
}

/// Overwrites `slot` with `fields[key]` if it parses as `T`.
fn take_field<T: DeserializeOwned>(fields: &Map<String, Value>, key: &str, slot: &mut T) {
    let Some(value) = fields.get(key) else {
        return;
    };
    match T::deserialize(value) {
        Ok(parsed) => *slot = parsed,
        Err(e) => warn!(key, value = %value, error = %e, "Invalid setting, using default"),
    }
}

/// Reads settings from a JSON file each time the session asks for them.
#[derive(Debug, Clone)]
pub struct FileSettings {
    path: PathBuf,
}

impl FileSettings {
    /// Creates a settings source backed by the given file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a settings source for `settings.json` inside `dir`.
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(SETTINGS_FILE_NAME))
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsSource for FileSettings {
    fn load(&self) -> Settings {
        Settings::load_from_file(&self.path)
    }
}

impl SettingsSource for Settings {
    fn load(&self) -> Settings {
        self.clone()
    }
}

// ============================================================================
// Enumerated settings
// ============================================================================

/// How cognitively demanding the crowd's questions are.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Difficulty {
    /// Simple clarifying questions and encouragement.
    Easy,
    /// A balance of support and challenge. Unrecognized values land here.
    Medium,
    /// Pointed questions that push the speaker (default).
    #[default]
    Hard,
}

impl Difficulty {
    /// Parses a string case-insensitively; unknown values map to `Medium`.
    #[must_use]
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "easy" => Self::Easy,
            "hard" => Self::Hard,
            _ => Self::Medium,
        }
    }

    /// The canonical lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

/// Cadence of crowd interruptions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InterruptionMode {
    /// Interrupt whenever the fixed interval has elapsed.
    Fixed,
    /// Interrupt with a fixed probability after a minimum gap (default).
    /// Unrecognized values land here.
    #[default]
    Random,
}

impl InterruptionMode {
    /// Parses a string case-insensitively; unknown values map to `Random`.
    #[must_use]
    pub fn parse_lenient(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("fixed") {
            Self::Fixed
        } else {
            Self::Random
        }
    }

    /// The canonical lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Random => "random",
        }
    }
}

/// Emotional stance of the simulated audience.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AudienceAttitude {
    /// Wants the speaker to succeed.
    Supportive,
    /// Wants clear, convincing arguments (default). Unrecognized values land here.
    #[default]
    Neutral,
    /// Doubts claims and asks for evidence.
    Skeptical,
    /// Impatient and quick to question.
    Hostile,
}

impl AudienceAttitude {
    /// Parses a string case-insensitively; unknown values map to `Neutral`.
    #[must_use]
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "supportive" => Self::Supportive,
            "skeptical" => Self::Skeptical,
            "hostile" => Self::Hostile,
            _ => Self::Neutral,
        }
    }

    /// The canonical lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Supportive => "supportive",
            Self::Neutral => "neutral",
            Self::Skeptical => "skeptical",
            Self::Hostile => "hostile",
        }
    }
}

/// How sharp the crowd's challenges may get.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Aggressiveness {
    /// Soft, polite challenges.
    Low,
    /// Moderately direct (default). Unrecognized values land here.
    #[default]
    Medium,
    /// Sharp and direct, still about content.
    High,
}

impl Aggressiveness {
    /// Parses a string case-insensitively; unknown values map to `Medium`.
    #[must_use]
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            _ => Self::Medium,
        }
    }

    /// The canonical lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl<'de> Deserialize<'de> for Difficulty {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer).map(|s| Self::parse_lenient(&s))
    }
}

impl Serialize for Difficulty {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for InterruptionMode {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer).map(|s| Self::parse_lenient(&s))
    }
}

impl Serialize for InterruptionMode {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AudienceAttitude {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer).map(|s| Self::parse_lenient(&s))
    }
}

impl Serialize for AudienceAttitude {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Aggressiveness {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer).map(|s| Self::parse_lenient(&s))
    }
}

impl Serialize for Aggressiveness {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}
