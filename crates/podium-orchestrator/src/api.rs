//! HTTP control API for a running session.
//!
//! The API never touches session state. It shares exactly three things
//! with the orchestrator: the [`SharedControl`] signal it can flip, the
//! [`StatusBoard`] the orchestrator publishes into, and the
//! [`EventBroadcaster`] that feeds WebSocket clients.
//!
//! # Endpoints
//!
//! - `GET /api/status` - Current robot state, control signal and transcript size
//! - `POST /api/control` - Set the control signal (`running`, `paused`, `end`)
//! - `GET /ws` - WebSocket event stream
//!
//! # Example
//!
//! ```no_run
//! use podium_orchestrator::{create_router, AppState};
//!
//! # async fn example() {
//! let state = AppState::new();
//! let router = create_router(state);
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await.unwrap();
//! axum::serve(listener, router).await.unwrap();
//! # }
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::collaborators::{ControlSignal, ControlSource, LogEntry, StateSink, TranscriptSink};
use crate::control::SharedControl;
use crate::session_state::RobotState;
use crate::websocket::{ws_handler, EventBroadcaster};

// ============================================================================
// Status Board
// ============================================================================

#[derive(Debug, Default)]
struct Board {
    state: RobotState,
    utterances: usize,
    last_utterance: Option<LogEntry>,
}

/// Latest robot state and transcript summary, kept for status queries.
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    inner: Arc<Mutex<Board>>,
}

impl StatusBoard {
    /// Creates an empty board in the `idle` state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_board<T>(&self, f: impl FnOnce(&mut Board) -> T) -> T {
        let mut board = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut board)
    }

    /// The most recently published robot state.
    #[must_use]
    pub fn state(&self) -> RobotState {
        self.with_board(|b| b.state)
    }

    /// Number of utterances logged so far.
    #[must_use]
    pub fn utterances(&self) -> usize {
        self.with_board(|b| b.utterances)
    }

    /// The most recent utterance, if any.
    #[must_use]
    pub fn last_utterance(&self) -> Option<LogEntry> {
        self.with_board(|b| b.last_utterance.clone())
    }
}

impl StateSink for StatusBoard {
    fn publish(&self, state: RobotState) {
        self.with_board(|b| b.state = state);
    }
}

impl TranscriptSink for StatusBoard {
    fn append(&self, entry: &LogEntry) {
        self.with_board(|b| {
            b.utterances += 1;
            b.last_utterance = Some(entry.clone());
        });
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Response body for the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    /// Current robot state.
    pub state: RobotState,
    /// Current control signal.
    pub control: ControlSignal,
    /// Utterances logged so far, from both sides.
    pub utterances: usize,
    /// The most recent utterance.
    pub last_utterance: Option<LogEntry>,
}

/// Request body for the control endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ControlRequest {
    /// The signal to set.
    pub signal: ControlSignal,
}

/// Error response body returned on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Description of the error.
    pub error: String,
}

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for the HTTP server.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Control signal read by the orchestrator.
    pub control: SharedControl,
    /// Status snapshot written by the orchestrator.
    pub board: StatusBoard,
    /// Event stream for WebSocket clients.
    pub broadcaster: EventBroadcaster,
}

impl AppState {
    /// Creates state with a `running` signal, an idle board and a default
    /// broadcaster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current status.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.board.state(),
            control: self.control.read(),
            utterances: self.board.utterances(),
            last_utterance: self.board.last_utterance(),
        }
    }

    /// Sinks the orchestrator should publish to so this API stays current.
    #[must_use]
    pub fn sinks(&self) -> (StatusBoard, EventBroadcaster) {
        (self.board.clone(), self.broadcaster.clone())
    }
}

// ============================================================================
// API Error Type
// ============================================================================

/// Internal error type for API handlers.
#[derive(Debug)]
enum ApiError {
    /// The request body could not be parsed.
    InvalidBody(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::InvalidBody(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidBody(rejection.body_text())
    }
}

// ============================================================================
// Router Setup
// ============================================================================

/// Creates the HTTP router with the control API and the WebSocket stream.
///
/// The router carries CORS middleware for local dashboards and tracing
/// middleware for request logging.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/status", get(handle_status))
        .route("/control", post(handle_control));

    Router::new()
        .nest("/api", api_routes)
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

// ============================================================================
// Handlers
// ============================================================================

/// Handler for `GET /api/status`.
async fn handle_status(State(state): State<Arc<AppState>>) -> Json<SessionStatus> {
    Json(state.status())
}

/// Handler for `POST /api/control`.
async fn handle_control(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ControlRequest>, JsonRejection>,
) -> Result<Json<SessionStatus>, ApiError> {
    let Json(request) = body?;
    state.control.set(request.signal);
    info!(signal = %request.signal, "Control signal set via API");
    Ok(Json(state.status()))
}

// ============================================================================
// Tests
// ============================================================================
