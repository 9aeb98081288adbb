//! Integration tests for the WebSocket session stream.
//!
//! These tests validate the connected snapshot, forwarding of state
//! changes and utterances, and fan-out to several clients.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use podium_orchestrator::{
    create_router, AppState, ControlSignal, LogEntry, RobotState, SessionEvent, Speaker,
    StateSink, TranscriptSink,
};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tungstenite::Message;

/// Helper type for WebSocket client
type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Spawns the test server and returns the WebSocket URL.
async fn spawn_test_server(state: AppState) -> (String, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local addr");

    let router = create_router(state);
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server failed");
    });

    (format!("ws://{addr}/ws"), handle)
}

async fn connect_client(url: &str) -> WsClient {
    let (ws_stream, _) = connect_async(url)
        .await
        .expect("Failed to connect to WebSocket");
    ws_stream
}

/// Receives the next event, answering pings along the way.
async fn receive_event(client: &mut WsClient) -> SessionEvent {
    loop {
        let msg = timeout(Duration::from_secs(5), client.next())
            .await
            .expect("Timeout waiting for message")
            .expect("Stream ended")
            .expect("WebSocket error");

        match msg {
            Message::Text(text) => {
                return serde_json::from_str(&text).expect("Failed to parse event");
            }
            Message::Ping(data) => {
                client
                    .send(Message::Pong(data))
                    .await
                    .expect("Failed to send pong");
            }
            Message::Pong(_) => {}
            other => panic!("Expected text message, got: {other:?}"),
        }
    }
}

/// Waits until `count` clients are subscribed to the broadcaster.
async fn wait_for_subscribers(state: &AppState, count: usize) {
    timeout(Duration::from_secs(5), async {
        while state.broadcaster.receiver_count() < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("Clients never subscribed");
}

// ============================================================================
// Connection
// ============================================================================

/// Tests that a client receives the current status on connect.
#[tokio::test]
async fn test_connected_event_carries_status() {
    let state = AppState::new();
    state.control.set(ControlSignal::Paused);
    let (board, _) = state.sinks();
    board.publish(RobotState::Listening);
    board.append(&LogEntry::new(Speaker::User, "why cities need more trees"));

    let (ws_url, _handle) = spawn_test_server(state).await;
    let mut client = connect_client(&ws_url).await;

    match receive_event(&mut client).await {
        SessionEvent::Connected(payload) => {
            assert_eq!(payload.status.state, RobotState::Listening);
            assert_eq!(payload.status.control, ControlSignal::Paused);
            assert_eq!(payload.status.utterances, 1);
            let last = payload.status.last_utterance.expect("No last utterance");
            assert_eq!(last.text, "why cities need more trees");
        }
        other => panic!("Expected Connected event, got: {other:?}"),
    }
}

// ============================================================================
// Forwarding
// ============================================================================

/// Tests that state changes and utterances reach the client in order.
#[tokio::test]
async fn test_session_events_are_forwarded_in_order() {
    let state = AppState::new();
    let (_, broadcaster) = state.sinks();
    let (ws_url, _handle) = spawn_test_server(state.clone()).await;

    let mut client = connect_client(&ws_url).await;
    assert!(matches!(
        receive_event(&mut client).await,
        SessionEvent::Connected(_)
    ));
    wait_for_subscribers(&state, 1).await;

    broadcaster.publish(RobotState::Thinking);
    broadcaster.append(&LogEntry::new(Speaker::Robot, "Where is the data?"));
    broadcaster.publish(RobotState::Speaking);

    match receive_event(&mut client).await {
        SessionEvent::StateChanged(payload) => assert_eq!(payload.state, RobotState::Thinking),
        other => panic!("Expected StateChanged, got: {other:?}"),
    }
    match receive_event(&mut client).await {
        SessionEvent::Utterance(entry) => {
            assert_eq!(entry.speaker, Speaker::Robot);
            assert_eq!(entry.text, "Where is the data?");
        }
        other => panic!("Expected Utterance, got: {other:?}"),
    }
    match receive_event(&mut client).await {
        SessionEvent::StateChanged(payload) => assert_eq!(payload.state, RobotState::Speaking),
        other => panic!("Expected StateChanged, got: {other:?}"),
    }
}

/// Tests that every connected client receives each event.
#[tokio::test]
async fn test_events_fan_out_to_all_clients() {
    let state = AppState::new();
    let (_, broadcaster) = state.sinks();
    let (ws_url, _handle) = spawn_test_server(state.clone()).await;

    let mut first = connect_client(&ws_url).await;
    let mut second = connect_client(&ws_url).await;
    receive_event(&mut first).await;
    receive_event(&mut second).await;
    wait_for_subscribers(&state, 2).await;

    broadcaster.publish(RobotState::Listening);

    for client in [&mut first, &mut second] {
        match receive_event(client).await {
            SessionEvent::StateChanged(payload) => {
                assert_eq!(payload.state, RobotState::Listening);
            }
            other => panic!("Expected StateChanged, got: {other:?}"),
        }
    }
}

/// Tests that a closed client is dropped from the broadcaster.
#[tokio::test]
async fn test_closed_client_unsubscribes() {
    let state = AppState::new();
    let (ws_url, _handle) = spawn_test_server(state.clone()).await;

    let mut client = connect_client(&ws_url).await;
    receive_event(&mut client).await;
    wait_for_subscribers(&state, 1).await;

    client.close(None).await.expect("Failed to close");

    timeout(Duration::from_secs(5), async {
        while state.broadcaster.receiver_count() > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("Subscriber was never dropped");
}
