//! Recording controller state machine.
//!
//! One controller exists per meeting-room session. It owns the recognition
//! handle, the 1-second elapsed timer, and the live transcript buffer.
//!
//! States: Idle → Recording → {Paused ⇄ Recording} → Stopped. Every
//! transition is total over its valid preconditions and a reported no-op
//! otherwise; no error path leaves the session in an undefined state.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::recognition::{
    RecognitionError, RecognitionErrorKind, RecognitionEvent, RecognitionHandle,
    SpeechRecognizer, TranscriptSegment,
};

use super::transcript::TranscriptBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    Idle,
    Recording,
    Paused,
    Stopped,
}

impl RecordingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
        }
    }
}

#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("speech recognition is not available")]
    RecognitionUnavailable,
    #[error("cannot {action} while {}", state.as_str())]
    InvalidTransition {
        action: &'static str,
        state: RecordingState,
    },
    #[error(transparent)]
    Recognition(#[from] RecognitionError),
}

/// What the controller did with one recognition event. Exposed so the
/// caller can surface fatal errors; transient recovery stays internal.
#[derive(Debug, PartialEq, Eq)]
pub enum EventOutcome {
    /// A final segment was appended to the transcript.
    Appended,
    /// An interim result updated the live preview only.
    Preview,
    /// Transient failure; the recognition handle was reopened in place.
    Restarted,
    /// Fatal recognition error. State is unchanged; the caller decides
    /// whether to stop.
    Fatal(RecognitionErrorKind),
    /// Event arrived outside `Recording` and was dropped.
    Ignored,
}

pub struct RecordingController {
    recognizer: Arc<dyn SpeechRecognizer>,
    state: RecordingState,
    elapsed_seconds: u64,
    buffer: TranscriptBuffer,
    interim: String,
    handle: Option<RecognitionHandle>,
}

impl RecordingController {
    pub fn new(recognizer: Arc<dyn SpeechRecognizer>) -> Self {
        Self::with_transcript(recognizer, String::new())
    }

    /// Resume over a previously saved transcript.
    pub fn with_transcript(recognizer: Arc<dyn SpeechRecognizer>, transcript: String) -> Self {
        Self {
            recognizer,
            state: RecordingState::Idle,
            elapsed_seconds: 0,
            buffer: TranscriptBuffer::from_existing(transcript),
            interim: String::new(),
            handle: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.recognizer.is_available()
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn transcript(&self) -> &str {
        self.buffer.as_str()
    }

    /// Latest interim (not yet final) recognition text, for live display.
    pub fn interim(&self) -> &str {
        &self.interim
    }

    /// Format elapsed time as HH:MM:SS.
    pub fn elapsed_display(&self) -> String {
        let hrs = self.elapsed_seconds / 3600;
        let mins = (self.elapsed_seconds % 3600) / 60;
        let secs = self.elapsed_seconds % 60;
        format!("{:02}:{:02}:{:02}", hrs, mins, secs)
    }

    pub fn start(&mut self) -> Result<(), RecordingError> {
        match self.state {
            RecordingState::Idle | RecordingState::Stopped => {}
            state => {
                return Err(RecordingError::InvalidTransition {
                    action: "start",
                    state,
                })
            }
        }

        if !self.recognizer.is_available() {
            return Err(RecordingError::RecognitionUnavailable);
        }

        self.handle = Some(self.recognizer.start()?);
        self.state = RecordingState::Recording;
        info!("Recording started ({})", self.recognizer.name());
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), RecordingError> {
        if self.state != RecordingState::Recording {
            return Err(RecordingError::InvalidTransition {
                action: "pause",
                state: self.state,
            });
        }

        self.halt_handle();
        self.state = RecordingState::Paused;
        info!("Recording paused at {}", self.elapsed_display());
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), RecordingError> {
        if self.state != RecordingState::Paused {
            return Err(RecordingError::InvalidTransition {
                action: "resume",
                state: self.state,
            });
        }

        self.handle = Some(self.recognizer.start()?);
        self.state = RecordingState::Recording;
        info!("Recording resumed");
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), RecordingError> {
        match self.state {
            RecordingState::Recording | RecordingState::Paused => {}
            state => {
                return Err(RecordingError::InvalidTransition {
                    action: "stop",
                    state,
                })
            }
        }

        self.halt_handle();
        self.state = RecordingState::Stopped;
        info!(
            "Recording stopped after {} ({} transcript chars)",
            self.elapsed_display(),
            self.buffer.as_str().len()
        );
        Ok(())
    }

    /// One second of wall-clock time. Counts only while `Recording`.
    pub fn tick(&mut self) {
        if self.state == RecordingState::Recording {
            self.elapsed_seconds += 1;
        }
    }

    /// Await the next event from the open recognition handle. Pends forever
    /// when no handle is open, which makes it safe to poll in a select loop.
    pub async fn next_event(&mut self) -> RecognitionEvent {
        match self.handle.as_mut() {
            Some(handle) => match handle.next_event().await {
                Some(event) => event,
                // Stream exhausted without an explicit end marker.
                None => RecognitionEvent::End,
            },
            None => std::future::pending().await,
        }
    }

    /// Apply one recognition event.
    ///
    /// The state check here is the late-callback guard: events that arrive
    /// after `pause()`/`stop()` returned are dropped, so nothing appends
    /// once the session has logically stopped.
    pub fn handle_event(&mut self, event: RecognitionEvent) -> EventOutcome {
        if self.state != RecordingState::Recording {
            debug!("Dropping recognition event while {}", self.state.as_str());
            return EventOutcome::Ignored;
        }

        match event {
            RecognitionEvent::Result {
                transcript,
                is_final: false,
            } => {
                self.interim = transcript;
                EventOutcome::Preview
            }
            RecognitionEvent::Result {
                transcript,
                is_final: true,
            } => {
                self.interim.clear();
                let segment = TranscriptSegment::final_now(transcript.trim());
                self.buffer.append(&segment);
                EventOutcome::Appended
            }
            RecognitionEvent::Error(kind) if kind.is_fatal() => {
                warn!("Fatal recognition error: {}", kind.as_str());
                EventOutcome::Fatal(kind)
            }
            RecognitionEvent::Error(kind) => {
                debug!("Transient recognition error ({}), restarting", kind.as_str());
                self.reopen(kind)
            }
            RecognitionEvent::End => {
                debug!("Recognition stream ended while recording, restarting");
                self.reopen(RecognitionErrorKind::ServiceUnavailable)
            }
        }
    }

    /// Auto-restart path: reopen the handle without a state transition.
    fn reopen(&mut self, fallback: RecognitionErrorKind) -> EventOutcome {
        self.halt_handle();
        match self.recognizer.start() {
            Ok(handle) => {
                self.handle = Some(handle);
                EventOutcome::Restarted
            }
            Err(e) => {
                warn!("Failed to restart recognition: {}", e);
                EventOutcome::Fatal(fallback)
            }
        }
    }

    fn halt_handle(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.stop();
        }
        self.interim.clear();
    }
}
