//! Podium CLI
//!
//! Main entry point for running a simulated-audience practice session.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use podium_backend::{ChatCompletionsClient, ConsoleRecognizer, ConsoleSynthesizer, OpenAiSynthesizer};
use podium_orchestrator::{
    create_router, AppState, Collaborators, ControlSource, FileControl, FileSettings,
    FileStateSink, JsonlTranscript, Orchestrator, SessionSummary, Settings, SettingsSource,
    SpeechSynthesizer, StateSink, TranscriptSink, SETTINGS_FILE_NAME,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Subdirectory of the data directory that receives rendered audio.
const AUDIO_DIR: &str = "audio";

/// How the crowd's voice and the speaker's words travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// Type your talk and read the crowd's lines in the terminal.
    Console,
    /// Type your talk; the crowd's lines are rendered to WAV files.
    Voice,
}

/// Podium - Public Speaking Practice
///
/// Rehearse a talk in front of a simulated crowd that reacts and
/// interrupts with questions according to your settings.
#[derive(Parser, Debug)]
#[command(name = "podium")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the settings file (default: settings.json in the data directory)
    #[arg(short, long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Directory for the control flag, state file, transcript and audio
    #[arg(short, long, value_name = "DIR", default_value = ".", env = "PODIUM_DATA_DIR")]
    data_dir: PathBuf,

    /// Speech backend
    #[arg(short, long, value_enum, default_value_t = Backend::Console)]
    backend: Backend,

    /// Crowd voice for the voice backend
    #[arg(long, default_value = podium_backend::DEFAULT_VOICE)]
    voice: String,

    /// Serve the control API on this port instead of polling the control file
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Podium starting");
    tracing::debug!(data_dir = %args.data_dir.display(), backend = ?args.backend, "Arguments");

    match run_session(args).await {
        Ok(Some(summary)) => {
            println!();
            print_summary(&summary);
            ExitCode::SUCCESS
        }
        Ok(None) => {
            println!();
            println!("Session interrupted");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Runs one practice session.
///
/// 1. Prepare the data directory and load settings
/// 2. Build the language model (fails fast without a key)
/// 3. Build the speech backend, sinks and control source
/// 4. Start the control API if requested
/// 5. Run the session until it ends or Ctrl+C
async fn run_session(args: Args) -> anyhow::Result<Option<SessionSummary>> {
    std::fs::create_dir_all(&args.data_dir).map_err(|e| {
        anyhow::anyhow!(
            "Failed to create data directory: {e}\n\nPath: {}",
            args.data_dir.display()
        )
    })?;

    let settings_path = args
        .settings
        .clone()
        .unwrap_or_else(|| args.data_dir.join(SETTINGS_FILE_NAME));
    let settings = FileSettings::new(settings_path).load();
    print_settings(&settings);

    let llm = Arc::new(ChatCompletionsClient::from_env()?);
    tracing::info!(endpoint = %llm.endpoint(), model = %llm.model(), "Language model ready");

    let synthesizer = build_synthesizer(args.backend, &args.voice, &args.data_dir)?;

    let mut state_sinks: Vec<Arc<dyn StateSink>> =
        vec![Arc::new(FileStateSink::in_dir(&args.data_dir))];
    let mut transcript_sinks: Vec<Arc<dyn TranscriptSink>> =
        vec![Arc::new(JsonlTranscript::in_dir(&args.data_dir))];

    let (control, server_handle) = if let Some(port) = args.port {
        let app_state = AppState::new();
        let (board, broadcaster) = app_state.sinks();
        state_sinks.push(Arc::new(board.clone()));
        state_sinks.push(Arc::new(broadcaster.clone()));
        transcript_sinks.push(Arc::new(board));
        transcript_sinks.push(Arc::new(broadcaster));
        let control: Arc<dyn ControlSource> = Arc::new(app_state.control.clone());

        let addr: SocketAddr = ([127, 0, 0, 1], port).into();
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            anyhow::anyhow!(
                "Failed to bind to {addr}: {e}\n\nSuggestion: Try a different port with --port"
            )
        })?;
        let router = create_router(app_state);
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!(error = %e, "HTTP server error");
            }
        });
        println!("Control API running on http://{addr}");
        (control, Some(handle))
    } else {
        let file_control = FileControl::in_dir(&args.data_dir);
        file_control.reset();
        println!("Control file: {}", file_control.path().display());
        let control: Arc<dyn ControlSource> = Arc::new(file_control);
        (control, None)
    };

    let collaborators = Collaborators {
        recognizer: Arc::new(ConsoleRecognizer::stdin()),
        synthesizer,
        llm,
        control,
        state_sink: Arc::new(state_sinks),
        transcript: Arc::new(transcript_sinks),
    };
    let mut orchestrator = Orchestrator::new(&settings, collaborators);

    println!();
    println!("Type what you would say and press Enter. Say \"goodbye\" to finish.");
    println!("Press Ctrl+C to stop");
    println!();

    let summary = tokio::select! {
        summary = orchestrator.run() => Some(summary),
        Ok(()) = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, shutting down");
            None
        }
    };

    if let Some(handle) = server_handle {
        handle.abort();
    }

    Ok(summary)
}

/// Builds the crowd's voice for the selected backend.
fn build_synthesizer(
    backend: Backend,
    voice: &str,
    data_dir: &Path,
) -> anyhow::Result<Arc<dyn SpeechSynthesizer>> {
    match backend {
        Backend::Console => Ok(Arc::new(ConsoleSynthesizer::stdout())),
        Backend::Voice => {
            let synthesizer = OpenAiSynthesizer::from_env(data_dir.join(AUDIO_DIR))?.with_voice(voice);
            println!(
                "Rendering crowd audio to {} (voice: {})",
                synthesizer.output_dir().display(),
                synthesizer.voice()
            );
            Ok(Arc::new(synthesizer))
        }
    }
}

/// Prints the settings the session runs with.
fn print_settings(settings: &Settings) {
    println!("Settings loaded:");
    println!("  Difficulty: {}", settings.question_difficulty.as_str());
    println!("  Attitude: {}", settings.audience_attitude.as_str());
    println!("  Aggressiveness: {}", settings.max_aggressiveness.as_str());
    println!("  Interruptions: {}", settings.interruption_mode.as_str());
    println!(
        "  Max interruptions per minute: {}",
        settings.max_interruptions_per_minute
    );
    match settings.session_budget() {
        Some(budget) => println!("  Session length: {}s", budget.as_secs()),
        None => println!("  Session length: unlimited"),
    }
}

/// Prints a summary of the finished session.
fn print_summary(summary: &SessionSummary) {
    println!("=== Podium Session Summary ===");
    println!("Ended by: {}", summary.ended_by);
    println!("Turns: {}", summary.turns);
    println!("Interruptions: {}", summary.interruptions);
    if let Some(ref topic) = summary.main_topic {
        println!("Main topic: {topic}");
    }

    let secs = summary.duration.as_secs();
    println!("Duration: {}m {}s", secs / 60, secs % 60);
}
