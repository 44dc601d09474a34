//! Speech collaborators.
//!
//! `SpeechOutput` is fire-and-forget: failures are logged, never returned.
//! `SpeechInput` yields one utterance per call, lowercased.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines, Stdin};
use tokio::process::Command;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, warn};

use crate::config::{SpeechBackend, SpeechConfig};

#[async_trait]
pub trait SpeechOutput: Send + Sync {
    async fn speak(&self, text: &str);
}

/// Result of one listen call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Heard {
    Text(String),
    /// Timed out or nothing intelligible.
    Nothing,
    /// The input source is gone for good.
    Closed,
}

#[async_trait]
pub trait SpeechInput: Send {
    async fn listen(&mut self) -> Heard;
}

/// Build the configured speech output.
pub fn build_speaker(config: &SpeechConfig) -> Arc<dyn SpeechOutput> {
    match config.backend {
        SpeechBackend::Console => Arc::new(ConsoleSpeaker),
        SpeechBackend::Command => Arc::new(CommandSpeaker::new(&config.command, &config.args)),
    }
}

/// Prints replies to stdout.
pub struct ConsoleSpeaker;

#[async_trait]
impl SpeechOutput for ConsoleSpeaker {
    async fn speak(&self, text: &str) {
        println!("Assistant: {text}");
    }
}

/// Prints replies, then voices them through an external program such as
/// `espeak-ng` or `spd-say` (text passed as the last argument).
pub struct CommandSpeaker {
    program: String,
    args: Vec<String>,
    // Watcher and foreground share one voice; utterances must not overlap.
    voice: AsyncMutex<()>,
}

impl CommandSpeaker {
    pub fn new(program: &str, args: &[String]) -> Self {
        Self {
            program: program.to_string(),
            args: args.to_vec(),
            voice: AsyncMutex::new(()),
        }
    }
}

#[async_trait]
impl SpeechOutput for CommandSpeaker {
    async fn speak(&self, text: &str) {
        let _voice = self.voice.lock().await;
        println!("Assistant: {text}");

        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => debug!("Spoke {} chars via {}", text.len(), self.program),
            Ok(status) => warn!("{} exited with {status}", self.program),
            Err(e) => warn!("Failed to run {}: {e}", self.program),
        }
    }
}

/// Reads utterances line by line, e.g. from stdin or a transcript pipe.
pub struct LineListener<R> {
    lines: Lines<BufReader<R>>,
    timeout: Option<Duration>,
    prompt: bool,
}

impl LineListener<Stdin> {
    /// Interactive stdin listener that prints a prompt before each capture.
    pub fn stdin(timeout: Option<Duration>) -> Self {
        Self {
            prompt: true,
            ..Self::new(tokio::io::stdin(), timeout)
        }
    }
}

impl<R: AsyncRead + Unpin + Send> LineListener<R> {
    pub fn new(reader: R, timeout: Option<Duration>) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
            timeout,
            prompt: false,
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> SpeechInput for LineListener<R> {
    async fn listen(&mut self) -> Heard {
        if self.prompt {
            println!("\nListening...");
        }

        let line = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.lines.next_line()).await {
                Ok(line) => line,
                Err(_) => {
                    debug!("Listening timed out");
                    return Heard::Nothing;
                }
            },
            None => self.lines.next_line().await,
        };

        match line {
            Ok(Some(line)) => {
                let text = line.trim().to_lowercase();
                if text.is_empty() {
                    Heard::Nothing
                } else {
                    debug!("Heard: {text}");
                    Heard::Text(text)
                }
            }
            Ok(None) => Heard::Closed,
            Err(e) => {
                warn!("Input error: {e}");
                Heard::Closed
            }
        }
    }
}
