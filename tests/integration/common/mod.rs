//! Fakes shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use podium_orchestrator::{
    Collaborators, ControlSource, ConversationTurn, LanguageModel, SpeechRecognizer,
    SpeechSynthesizer, StateSink, TranscriptSink,
};

/// Returns scripted lines after a fixed delay, then `goodbye`.
pub struct ScriptedRecognizer {
    lines: Mutex<VecDeque<String>>,
    delay: Duration,
}

impl ScriptedRecognizer {
    pub fn new(lines: &[&str], delay: Duration) -> Self {
        Self {
            lines: Mutex::new(lines.iter().map(|l| (*l).to_string()).collect()),
            delay,
        }
    }
}

#[async_trait]
impl SpeechRecognizer for ScriptedRecognizer {
    async fn transcribe(&self, _max_duration: Duration, _language: &str) -> String {
        tokio::time::sleep(self.delay).await;
        self.lines
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "goodbye".to_string())
    }
}

/// Keeps talking about the same thing until the session is stopped.
pub struct EndlessRecognizer {
    pub delay: Duration,
}

#[async_trait]
impl SpeechRecognizer for EndlessRecognizer {
    async fn transcribe(&self, _max_duration: Duration, _language: &str) -> String {
        tokio::time::sleep(self.delay).await;
        "urban forests lower summer temperatures".to_string()
    }
}

/// Remembers everything it was asked to say.
#[derive(Default)]
pub struct RecordingSynthesizer {
    pub spoken: Mutex<Vec<String>>,
}

impl RecordingSynthesizer {
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for RecordingSynthesizer {
    async fn speak(&self, text: &str) {
        self.spoken.lock().unwrap().push(text.to_string());
    }
}

/// Answers every request with the same line and keeps the requests.
pub struct StubModel {
    pub reply: String,
    pub requests: Mutex<Vec<(String, Vec<ConversationTurn>)>>,
}

impl StubModel {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<(String, Vec<ConversationTurn>)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for StubModel {
    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[ConversationTurn],
    ) -> podium_orchestrator::Result<String> {
        self.requests
            .lock()
            .unwrap()
            .push((system_prompt.to_string(), messages.to_vec()));
        Ok(self.reply.clone())
    }
}

/// Builds the collaborator set for a session.
pub fn collaborators(
    recognizer: Arc<dyn SpeechRecognizer>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    llm: Arc<dyn LanguageModel>,
    control: Arc<dyn ControlSource>,
    state_sinks: Vec<Arc<dyn StateSink>>,
    transcript_sinks: Vec<Arc<dyn TranscriptSink>>,
) -> Collaborators {
    Collaborators {
        recognizer,
        synthesizer,
        llm,
        control,
        state_sink: Arc::new(state_sinks),
        transcript: Arc::new(transcript_sinks),
    }
}
