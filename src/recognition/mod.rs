//! Speech recognition adapter.
//!
//! Normalizes a continuous speech-recognition backend into one uniform
//! event contract: interim/final results, a closed set of error kinds, and
//! an end-of-stream signal. The backend itself is a black box: the bundled
//! `CommandRecognizer` talks to an external recognizer process over
//! line-delimited JSON, and `ScriptedRecognizer` replays a fixed event
//! sequence for tests and demos.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

mod command;
mod scripted;

pub use command::CommandRecognizer;
pub use scripted::ScriptedRecognizer;

use crate::config::RecognitionConfig;

/// Error kinds reported by a recognition backend.
///
/// `NoSpeechDetected` is transient; the recording controller recovers from
/// it locally. The other kinds are fatal to the current recording attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecognitionErrorKind {
    NoSpeechDetected,
    PermissionDenied,
    ServiceUnavailable,
}

impl RecognitionErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoSpeechDetected => "no-speech-detected",
            Self::PermissionDenied => "permission-denied",
            Self::ServiceUnavailable => "service-unavailable",
        }
    }

    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::NoSpeechDetected)
    }
}

/// A single event from the recognition backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// A recognition result. Interim results (`is_final == false`) may be
    /// revised by the backend; only final results become transcript
    /// segments.
    Result { transcript: String, is_final: bool },
    Error(RecognitionErrorKind),
    /// The backend ended the stream on its own (e.g. silence timeout).
    End,
}

/// A final recognition result, stamped at capture time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub timestamp: String,
    pub text: String,
    #[serde(rename = "final")]
    pub is_final: bool,
}

impl TranscriptSegment {
    /// Build a final segment stamped with the current wall-clock time.
    pub fn final_now(text: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Local::now().format("%H:%M:%S").to_string(),
            text: text.into(),
            is_final: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("speech recognition is not available on this system")]
    Unavailable,
    #[error("failed to start recognition backend: {0}")]
    Start(#[from] anyhow::Error),
}

/// An open recognition stream.
///
/// Events arrive asynchronously on an internal channel. `stop()` halts the
/// stream synchronously: once it returns, `next_event()` yields `None` and
/// no further event is delivered, even if the backend produced more.
pub struct RecognitionHandle {
    events: mpsc::UnboundedReceiver<RecognitionEvent>,
    task: Option<tokio::task::JoinHandle<()>>,
    stopped: bool,
}

impl RecognitionHandle {
    pub fn new(
        events: mpsc::UnboundedReceiver<RecognitionEvent>,
        task: Option<tokio::task::JoinHandle<()>>,
    ) -> Self {
        Self {
            events,
            task,
            stopped: false,
        }
    }

    /// Next event from the backend, or `None` once the stream is stopped
    /// or exhausted.
    pub async fn next_event(&mut self) -> Option<RecognitionEvent> {
        if self.stopped {
            return None;
        }
        self.events.recv().await
    }

    /// Halt the stream. Buffered and in-flight events are discarded.
    pub fn stop(&mut self) {
        self.stopped = true;
        self.events.close();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for RecognitionHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A speech-recognition backend.
pub trait SpeechRecognizer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the backend can capture speech on this system. Callers must
    /// degrade gracefully (hide recording controls) when this is false.
    fn is_available(&self) -> bool;

    fn start(&self) -> Result<RecognitionHandle, RecognitionError>;
}

/// Recognizer that is never available. Used when voice capture is disabled.
pub struct NullRecognizer;

impl SpeechRecognizer for NullRecognizer {
    fn name(&self) -> &'static str {
        "none"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn start(&self) -> Result<RecognitionHandle, RecognitionError> {
        Err(RecognitionError::Unavailable)
    }
}

/// Build the recognizer selected by config.
pub fn build_recognizer(config: &RecognitionConfig) -> Result<Arc<dyn SpeechRecognizer>> {
    match config.provider.as_str() {
        "command" => Ok(Arc::new(CommandRecognizer::new(
            config.command.clone(),
            config.language.clone(),
        ))),
        "none" => Ok(Arc::new(NullRecognizer)),
        other => anyhow::bail!(
            "Unknown recognition provider '{}'. Supported providers: command, none",
            other
        ),
    }
}
