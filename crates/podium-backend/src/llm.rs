//! OpenAI-compatible chat-completions client.

use std::time::Duration;

use async_trait::async_trait;
use podium_orchestrator::{ConversationTurn, LanguageModel, PodiumError};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{BackendError, LLM_API_KEY_VAR, LLM_BASE_URL_VAR, LLM_MODEL_VAR};

/// Base URL used when `PODIUM_LLM_BASE_URL` is not set.
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.x.ai/v1";

/// Model used when `PODIUM_LLM_MODEL` is not set.
pub const DEFAULT_LLM_MODEL: &str = "grok-2-latest";

/// Request timeout for completions.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// [`LanguageModel`] over an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct ChatCompletionsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    model: String,
}

impl ChatCompletionsClient {
    /// Creates a client for `base_url` (e.g. `https://api.x.ai/v1`).
    pub fn new(
        base_url: impl Into<String>,
        api_key: SecretString,
        model: impl Into<String>,
    ) -> crate::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        })
    }

    /// Creates a client from the process environment.
    ///
    /// `GROK_API_KEY` is required. `PODIUM_LLM_BASE_URL` and
    /// `PODIUM_LLM_MODEL` override the defaults.
    pub fn from_env() -> podium_orchestrator::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Creates a client from an arbitrary variable lookup.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> podium_orchestrator::Result<Self> {
        let api_key = lookup(LLM_API_KEY_VAR)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| PodiumError::missing_credential(LLM_API_KEY_VAR))?;
        let base_url = lookup(LLM_BASE_URL_VAR).unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string());
        let model = lookup(LLM_MODEL_VAR).unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string());

        Ok(Self::new(base_url, SecretString::from(api_key), model)?)
    }

    /// The endpoint completions are posted to.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// The model name sent with every request.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, system_prompt: &str, messages: &[ConversationTurn]) -> crate::Result<String> {
        let request = build_request(&self.model, system_prompt, messages);

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::status(status.as_u16(), &body));
        }

        let body: ChatResponse = response.json().await?;
        extract_content(body)
    }
}

fn build_request<'a>(
    model: &'a str,
    system_prompt: &'a str,
    messages: &'a [ConversationTurn],
) -> ChatRequest<'a> {
    let mut chat = Vec::with_capacity(messages.len() + 1);
    chat.push(ChatMessage {
        role: "system",
        content: system_prompt,
    });
    chat.extend(messages.iter().map(|turn| ChatMessage {
        role: turn.role.as_str(),
        content: &turn.content,
    }));
    ChatRequest {
        model,
        messages: chat,
    }
}

fn extract_content(response: ChatResponse) -> crate::Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or_else(|| BackendError::EmptyResponse("no completion text".to_string()))
}

#[async_trait]
impl LanguageModel for ChatCompletionsClient {
    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[ConversationTurn],
    ) -> podium_orchestrator::Result<String> {
        debug!(model = %self.model, messages = messages.len(), "Sending chat completion");
        Ok(self.chat(system_prompt, messages).await?)
    }
}
