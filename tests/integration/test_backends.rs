//! Integration tests for the HTTP backends against a local mock server.

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use podium_backend::{ChatCompletionsClient, OpenAiSynthesizer};
use podium_orchestrator::{
    ConversationTurn, EventType, LanguageModel, LlmErrorKind, PodiumError, ReactionGenerator,
    Settings, SpeechSynthesizer, LLM_ERROR_PREFIX,
};
use secrecy::SecretString;
use serde_json::{json, Value};

/// What the mock server saw and how it should answer.
#[derive(Clone)]
struct Mock {
    status: StatusCode,
    requests: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

impl Mock {
    fn answering(status: StatusCode) -> Self {
        Self {
            status,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn record(&self, headers: &HeaderMap, body: Value) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.requests.lock().unwrap().push((auth, body));
    }

    fn requests(&self) -> Vec<(Option<String>, Value)> {
        self.requests.lock().unwrap().clone()
    }
}

async fn chat_completions(
    State(mock): State<Mock>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    mock.record(&headers, body);
    if mock.status.is_success() {
        (
            mock.status,
            Json(json!({
                "choices": [{"message": {"role": "assistant", "content": "  How many degrees?  "}}]
            })),
        )
    } else {
        (mock.status, Json(json!({"error": {"message": "slow down"}})))
    }
}

async fn audio_speech(
    State(mock): State<Mock>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    mock.record(&headers, body);
    (mock.status, b"RIFF0000WAVEfmt ".to_vec())
}

/// Spawns the mock and returns its `/v1` base URL.
async fn spawn_mock(mock: Mock) -> String {
    let router = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .route("/v1/audio/speech", post(audio_speech))
        .with_state(mock);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Mock server failed");
    });

    format!("http://{addr}/v1")
}

fn client(base_url: &str) -> ChatCompletionsClient {
    ChatCompletionsClient::new(
        base_url,
        SecretString::from("xai-test".to_string()),
        "grok-test",
    )
    .expect("Failed to build client")
}

// ============================================================================
// Chat Completions
// ============================================================================

/// Tests a successful completion and the request that produced it.
#[tokio::test]
async fn test_chat_completion_round_trip() {
    let mock = Mock::answering(StatusCode::OK);
    let base = spawn_mock(mock.clone()).await;

    let messages = vec![
        ConversationTurn::user("Trees cool cities"),
        ConversationTurn::assistant("By how much?"),
        ConversationTurn::user("A few degrees"),
    ];
    let reply = client(&base)
        .complete("You are a crowd", &messages)
        .await
        .unwrap();

    assert_eq!(reply, "How many degrees?");

    let requests = mock.requests();
    assert_eq!(requests.len(), 1);
    let (auth, body) = &requests[0];
    assert_eq!(auth.as_deref(), Some("Bearer xai-test"));
    assert_eq!(body["model"], "grok-test");
    let sent = body["messages"].as_array().unwrap();
    assert_eq!(sent.len(), 4);
    assert_eq!(sent[0]["role"], "system");
    assert_eq!(sent[3]["content"], "A few degrees");
}

/// Tests that error statuses become classified language-model errors.
#[tokio::test]
async fn test_chat_completion_rate_limited() {
    let base = spawn_mock(Mock::answering(StatusCode::TOO_MANY_REQUESTS)).await;

    let err = client(&base)
        .complete("You are a crowd", &[ConversationTurn::user("Hello")])
        .await
        .unwrap_err();

    match &err {
        PodiumError::LlmApiError { kind, message, .. } => {
            assert_eq!(*kind, LlmErrorKind::RateLimit);
            assert!(message.contains("429"));
        }
        other => panic!("Expected LlmApiError, got: {other:?}"),
    }
    assert!(err.is_transient());
}

/// Tests that a failing model yields a spoken error line instead of an error.
#[tokio::test]
async fn test_reaction_generator_fails_soft() {
    let base = spawn_mock(Mock::answering(StatusCode::UNAUTHORIZED)).await;
    let generator = ReactionGenerator::new(Arc::new(client(&base)));

    let reply = generator
        .generate(
            "they cool the streets",
            Some("why cities need more trees"),
            EventType::InterruptionQuestion,
            &Settings::default(),
            &[],
        )
        .await;

    assert!(reply.starts_with(LLM_ERROR_PREFIX), "got: {reply}");
    assert!(!reply.contains('\n'));
}

// ============================================================================
// Speech Synthesis
// ============================================================================

/// Tests that rendered lines land in numbered WAV files.
#[tokio::test]
async fn test_speech_rendered_to_numbered_files() {
    let mock = Mock::answering(StatusCode::OK);
    let base = spawn_mock(mock.clone()).await;
    let dir = tempfile::tempdir().unwrap();

    let synthesizer = OpenAiSynthesizer::new(SecretString::from("sk-test".to_string()), dir.path())
        .unwrap()
        .with_base_url(base)
        .with_voice("nova");

    synthesizer.speak("Where is the data?").await;
    synthesizer.speak("And the cost?").await;

    assert!(dir.path().join("crowd_0001.wav").exists());
    assert!(dir.path().join("crowd_0002.wav").exists());
    let audio = std::fs::read(dir.path().join("crowd_0001.wav")).unwrap();
    assert!(audio.starts_with(b"RIFF"));

    let requests = mock.requests();
    assert_eq!(requests.len(), 2);
    let (auth, body) = &requests[0];
    assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
    assert_eq!(body["voice"], "nova");
    assert_eq!(body["input"], "Where is the data?");
    assert_eq!(body["response_format"], "wav");
}

/// Tests that a failing speech endpoint writes nothing and does not panic.
#[tokio::test]
async fn test_speech_failure_is_swallowed() {
    let base = spawn_mock(Mock::answering(StatusCode::INTERNAL_SERVER_ERROR)).await;
    let dir = tempfile::tempdir().unwrap();

    let synthesizer = OpenAiSynthesizer::new(SecretString::from("sk-test".to_string()), dir.path())
        .unwrap()
        .with_base_url(base);

    synthesizer.speak("Where is the data?").await;

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
