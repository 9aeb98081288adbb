//! Speech synthesis through the OpenAI `/audio/speech` endpoint.
//!
//! Each crowd line is rendered to a numbered WAV file in an output
//! directory (`crowd_0001.wav`, `crowd_0002.wav`, ...). Playing the files
//! is left to whatever player watches that directory.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use podium_orchestrator::{PodiumError, SpeechSynthesizer};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{BackendError, TTS_API_KEY_VAR};

/// Speech model used for every request.
pub const TTS_MODEL: &str = "gpt-4o-mini-tts";

/// Voice used when the requested one is not supported.
pub const DEFAULT_VOICE: &str = "onyx";

/// Voices the speech endpoint accepts.
pub const SUPPORTED_VOICES: [&str; 13] = [
    "alloy", "echo", "fable", "onyx", "nova", "shimmer", "coral", "verse", "ballad", "ash", "sage",
    "marin", "cedar",
];

const DEFAULT_TTS_BASE_URL: &str = "https://api.openai.com/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Maps a requested voice onto a supported one, falling back to `onyx`.
#[must_use]
pub fn normalize_voice(raw: &str) -> &'static str {
    let requested = raw.trim();
    if let Some(voice) = SUPPORTED_VOICES.iter().copied().find(|v| *v == requested) {
        return voice;
    }
    if !requested.is_empty() {
        warn!(
            requested,
            fallback = DEFAULT_VOICE,
            supported = ?SUPPORTED_VOICES,
            "Unsupported voice"
        );
    }
    DEFAULT_VOICE
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    response_format: &'a str,
}

/// [`SpeechSynthesizer`] that renders crowd lines to WAV files.
#[derive(Debug)]
pub struct OpenAiSynthesizer {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    voice: &'static str,
    output_dir: PathBuf,
    counter: AtomicU32,
}

impl OpenAiSynthesizer {
    /// Creates a synthesizer writing into `output_dir`.
    pub fn new(api_key: SecretString, output_dir: impl Into<PathBuf>) -> crate::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: DEFAULT_TTS_BASE_URL.to_string(),
            api_key,
            voice: DEFAULT_VOICE,
            output_dir: output_dir.into(),
            counter: AtomicU32::new(0),
        })
    }

    /// Creates a synthesizer using `OPENAI_API_KEY` from the environment.
    pub fn from_env(output_dir: impl Into<PathBuf>) -> podium_orchestrator::Result<Self> {
        let api_key = std::env::var(TTS_API_KEY_VAR)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| PodiumError::missing_credential(TTS_API_KEY_VAR))?;
        Ok(Self::new(SecretString::from(api_key), output_dir)?)
    }

    /// Points the synthesizer at another OpenAI-compatible server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Selects the voice, normalized against [`SUPPORTED_VOICES`].
    #[must_use]
    pub fn with_voice(mut self, voice: &str) -> Self {
        self.voice = normalize_voice(voice);
        self
    }

    /// The voice sent with every request.
    #[must_use]
    pub const fn voice(&self) -> &'static str {
        self.voice
    }

    /// Directory the WAV files are written to.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Fetches WAV audio for `text`.
    pub async fn synthesize(&self, text: &str) -> crate::Result<Vec<u8>> {
        let request = SpeechRequest {
            model: TTS_MODEL,
            voice: self.voice,
            input: text,
            response_format: "wav",
        };

        let response = self
            .http
            .post(format!("{}/audio/speech", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::status(status.as_u16(), &body));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(BackendError::EmptyResponse("no audio returned".to_string()));
        }
        Ok(bytes.to_vec())
    }

    /// Synthesizes `text` and writes it to the next numbered file.
    pub async fn render(&self, text: &str) -> crate::Result<PathBuf> {
        let audio = self.synthesize(text).await?;

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let index = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let path = self.output_dir.join(format!("crowd_{index:04}.wav"));
        tokio::fs::write(&path, &audio).await?;

        Ok(path)
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSynthesizer {
    async fn speak(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        debug!(voice = self.voice, model = TTS_MODEL, "Synthesizing crowd line");
        match self.render(text).await {
            Ok(path) => info!(path = %path.display(), "Crowd line rendered"),
            Err(e) => warn!(error = %e, "Speech synthesis failed"),
        }
    }
}
