//! Terminal simulation of the speech channel.
//!
//! The speaker types instead of talking and the crowd's lines are printed
//! instead of played. Useful for rehearsing without a microphone and for
//! exercising the turn loop end to end.

use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use podium_orchestrator::{SpeechRecognizer, SpeechSynthesizer};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{debug, info, warn};

/// Returned once input is exhausted, so a closed terminal ends the session.
const END_OF_INPUT_PHRASE: &str = "goodbye";

/// Reads one typed line per turn.
pub struct ConsoleRecognizer<R = BufReader<Stdin>> {
    lines: tokio::sync::Mutex<Lines<R>>,
}

impl<R> std::fmt::Debug for ConsoleRecognizer<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleRecognizer").finish_non_exhaustive()
    }
}

impl ConsoleRecognizer {
    /// Creates a recognizer reading from standard input.
    #[must_use]
    pub fn stdin() -> Self {
        Self::from_reader(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin> ConsoleRecognizer<R> {
    /// Creates a recognizer reading from any buffered reader.
    #[must_use]
    pub fn from_reader(reader: R) -> Self {
        Self {
            lines: tokio::sync::Mutex::new(reader.lines()),
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> SpeechRecognizer for ConsoleRecognizer<R> {
    async fn transcribe(&self, max_duration: Duration, language: &str) -> String {
        debug!(language, max_secs = max_duration.as_secs_f64(), "Waiting for typed input");
        let mut lines = self.lines.lock().await;

        match tokio::time::timeout(max_duration, lines.next_line()).await {
            Ok(Ok(Some(line))) => line.trim().to_string(),
            Ok(Ok(None)) => {
                info!("Input closed, ending the conversation");
                END_OF_INPUT_PHRASE.to_string()
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to read input");
                String::new()
            }
            Err(_) => {
                debug!("No input before the speaking limit");
                String::new()
            }
        }
    }
}

/// Prints each crowd line.
pub struct ConsoleSynthesizer {
    out: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for ConsoleSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleSynthesizer").finish_non_exhaustive()
    }
}

impl Default for ConsoleSynthesizer {
    fn default() -> Self {
        Self::stdout()
    }
}

impl ConsoleSynthesizer {
    /// Creates a synthesizer printing to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::to_writer(std::io::stdout())
    }

    /// Creates a synthesizer printing to any writer.
    #[must_use]
    pub fn to_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(writer)),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for ConsoleSynthesizer {
    async fn speak(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        let mut out = self
            .out
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Err(e) = writeln!(out, "[CROWD] {text}").and_then(|()| out.flush()) {
            warn!(error = %e, "Failed to print crowd line");
        }
    }
}
