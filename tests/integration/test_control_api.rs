//! Integration tests for the HTTP control API.
//!
//! These tests run the router on a real socket and drive it with an HTTP
//! client, the way a control panel would while a session is running.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{collaborators, EndlessRecognizer, RecordingSynthesizer, StubModel};
use podium_orchestrator::{
    create_router, AppState, ControlSignal, EndReason, ErrorResponse, InterruptionMode,
    Orchestrator, RobotState, SessionStatus, Settings, Speaker, StateSink, TranscriptSink,
    GOODBYE,
};
use tokio::time::timeout;

/// Spawns the server on an ephemeral port and returns its base URL.
async fn spawn_test_server(state: AppState) -> (String, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local addr");

    let router = create_router(state);
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server failed");
    });

    (format!("http://{addr}"), handle)
}

async fn get_status(client: &reqwest::Client, base: &str) -> SessionStatus {
    client
        .get(format!("{base}/api/status"))
        .send()
        .await
        .expect("Status request failed")
        .json()
        .await
        .expect("Failed to parse status")
}

async fn post_signal(client: &reqwest::Client, base: &str, signal: &str) -> reqwest::Response {
    client
        .post(format!("{base}/api/control"))
        .json(&serde_json::json!({ "signal": signal }))
        .send()
        .await
        .expect("Control request failed")
}

// ============================================================================
// Status and Control
// ============================================================================

/// Tests the status of a server with no session activity.
#[tokio::test]
async fn test_status_starts_idle_and_running() {
    let (base, _handle) = spawn_test_server(AppState::new()).await;
    let client = reqwest::Client::new();

    let status = get_status(&client, &base).await;

    assert_eq!(status.state, RobotState::Idle);
    assert_eq!(status.control, ControlSignal::Running);
    assert_eq!(status.utterances, 0);
    assert!(status.last_utterance.is_none());
}

/// Tests that posted signals are visible to the orchestrator's control source.
#[tokio::test]
async fn test_control_signal_round_trip() {
    let state = AppState::new();
    let control = state.control.clone();
    let (base, _handle) = spawn_test_server(state).await;
    let client = reqwest::Client::new();

    let response = post_signal(&client, &base, "paused").await;
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let status: SessionStatus = response.json().await.unwrap();
    assert_eq!(status.control, ControlSignal::Paused);
    assert_eq!(
        podium_orchestrator::ControlSource::read(&control),
        ControlSignal::Paused
    );

    post_signal(&client, &base, "running").await;
    assert_eq!(get_status(&client, &base).await.control, ControlSignal::Running);
}

/// Tests that malformed control requests are rejected without changing state.
#[tokio::test]
async fn test_control_rejects_bad_requests() {
    let (base, _handle) = spawn_test_server(AppState::new()).await;
    let client = reqwest::Client::new();

    let response = post_signal(&client, &base, "restart").await;
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let error: ErrorResponse = response.json().await.unwrap();
    assert!(!error.error.is_empty());

    let response = client
        .post(format!("{base}/api/control"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    assert_eq!(get_status(&client, &base).await.control, ControlSignal::Running);
}

// ============================================================================
// Live Session
// ============================================================================

/// Tests a running session observed and stopped through the API.
#[tokio::test]
async fn test_session_stopped_through_api() {
    let state = AppState::new();
    let (board, broadcaster) = state.sinks();
    let control = state.control.clone();
    let (base, _handle) = spawn_test_server(state).await;
    let client = reqwest::Client::new();

    let synthesizer = Arc::new(RecordingSynthesizer::default());
    let settings = Settings {
        interruption_mode: InterruptionMode::Fixed,
        fixed_interval_seconds: 1000.0,
        ..Settings::default()
    };
    let state_sinks: Vec<Arc<dyn StateSink>> =
        vec![Arc::new(board.clone()), Arc::new(broadcaster.clone())];
    let transcript_sinks: Vec<Arc<dyn TranscriptSink>> =
        vec![Arc::new(board), Arc::new(broadcaster)];

    let mut orchestrator = Orchestrator::new(
        &settings,
        collaborators(
            Arc::new(EndlessRecognizer {
                delay: Duration::from_millis(20),
            }),
            synthesizer.clone(),
            Arc::new(StubModel::new("unused")),
            Arc::new(control),
            state_sinks,
            transcript_sinks,
        ),
    );
    let session = tokio::spawn(async move { orchestrator.run().await });

    // Wait until the speaker has been heard at least once
    let heard = timeout(Duration::from_secs(5), async {
        loop {
            let status = get_status(&client, &base).await;
            if status.utterances >= 2 {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("Session never produced utterances");
    assert_eq!(heard.control, ControlSignal::Running);

    post_signal(&client, &base, "end").await;

    let summary = timeout(Duration::from_secs(5), session)
        .await
        .expect("Session did not stop")
        .expect("Session task failed");
    assert_eq!(summary.ended_by, EndReason::ControlSignal);
    assert!(summary.turns >= 1);

    let status = get_status(&client, &base).await;
    assert_eq!(status.state, RobotState::Idle);
    assert_eq!(status.control, ControlSignal::End);
    let last = status.last_utterance.expect("No utterance recorded");
    assert_eq!(last.speaker, Speaker::Robot);
    assert_eq!(last.text, GOODBYE);
    assert_eq!(status.utterances as u32, summary.turns + 2);
}
