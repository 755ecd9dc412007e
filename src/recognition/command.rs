//! External recognizer process backend.
//!
//! Spawns a configured command and reads recognition events from its stdout
//! as line-delimited JSON:
//!
//! ```json
//! {"transcript": "we need to fix the login flow", "isFinal": true}
//! {"error": "no-speech"}
//! {"event": "end"}
//! ```
//!
//! The process is killed when the handle is stopped or dropped.

use anyhow::Context;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{RecognitionError, RecognitionErrorKind, RecognitionEvent, RecognitionHandle, SpeechRecognizer};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireEvent {
    Result {
        transcript: String,
        #[serde(default, rename = "isFinal")]
        is_final: bool,
    },
    Error {
        error: String,
    },
    End {
        event: String,
    },
}

fn map_error_kind(code: &str) -> RecognitionErrorKind {
    match code {
        "no-speech" => RecognitionErrorKind::NoSpeechDetected,
        "not-allowed" | "permission-denied" | "audio-capture" => {
            RecognitionErrorKind::PermissionDenied
        }
        _ => RecognitionErrorKind::ServiceUnavailable,
    }
}

pub struct CommandRecognizer {
    command: Option<String>,
    language: String,
}

impl CommandRecognizer {
    pub fn new(command: Option<String>, language: String) -> Self {
        Self { command, language }
    }
}

impl SpeechRecognizer for CommandRecognizer {
    fn name(&self) -> &'static str {
        "command"
    }

    fn is_available(&self) -> bool {
        self.command.is_some()
    }

    fn start(&self) -> Result<RecognitionHandle, RecognitionError> {
        let command = self
            .command
            .as_ref()
            .ok_or(RecognitionError::Unavailable)?;

        let mut child = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .env("SCRUMSCRIBE_LANGUAGE", &self.language)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .context("Failed to spawn recognizer process")?;

        let stdout = child
            .stdout
            .take()
            .context("Recognizer process has no stdout")?;

        let (tx, rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            // Owning the child here keeps kill_on_drop armed until the
            // reader task is aborted.
            let _child = child;
            let mut lines = BufReader::new(stdout).lines();

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        let event = match serde_json::from_str::<WireEvent>(line) {
                            Ok(WireEvent::Result {
                                transcript,
                                is_final,
                            }) => RecognitionEvent::Result {
                                transcript,
                                is_final,
                            },
                            Ok(WireEvent::Error { error }) => {
                                RecognitionEvent::Error(map_error_kind(&error))
                            }
                            Ok(WireEvent::End { event }) if event == "end" => {
                                RecognitionEvent::End
                            }
                            Ok(WireEvent::End { event }) => {
                                warn!("Unknown recognizer event '{}', ignoring", event);
                                continue;
                            }
                            Err(e) => {
                                warn!("Malformed recognizer line '{}': {}", line, e);
                                continue;
                            }
                        };

                        debug!("Recognizer event: {:?}", event);
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        let _ = tx.send(RecognitionEvent::End);
                        break;
                    }
                    Err(e) => {
                        warn!("Failed to read from recognizer process: {}", e);
                        let _ = tx.send(RecognitionEvent::Error(
                            RecognitionErrorKind::ServiceUnavailable,
                        ));
                        break;
                    }
                }
            }
        });

        Ok(RecognitionHandle::new(rx, Some(task)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_event_parsing() {
        let parsed: WireEvent =
            serde_json::from_str(r#"{"transcript": "hello", "isFinal": true}"#).unwrap();
        assert!(matches!(
            parsed,
            WireEvent::Result { ref transcript, is_final: true } if transcript == "hello"
        ));

        let parsed: WireEvent = serde_json::from_str(r#"{"error": "no-speech"}"#).unwrap();
        assert!(matches!(parsed, WireEvent::Error { ref error } if error == "no-speech"));

        let parsed: WireEvent = serde_json::from_str(r#"{"event": "end"}"#).unwrap();
        assert!(matches!(parsed, WireEvent::End { ref event } if event == "end"));
    }

    #[test]
    fn test_error_kind_mapping() {
        assert_eq!(
            map_error_kind("no-speech"),
            RecognitionErrorKind::NoSpeechDetected
        );
        assert_eq!(
            map_error_kind("not-allowed"),
            RecognitionErrorKind::PermissionDenied
        );
        assert_eq!(
            map_error_kind("network"),
            RecognitionErrorKind::ServiceUnavailable
        );
    }

    #[test]
    fn test_unavailable_without_command() {
        let recognizer = CommandRecognizer::new(None, "en-US".to_string());
        assert!(!recognizer.is_available());
    }

    #[tokio::test]
    async fn test_reads_events_from_process() {
        let recognizer = CommandRecognizer::new(
            Some(
                r#"printf '{"transcript":"first","isFinal":true}\n{"event":"end"}\n'"#.to_string(),
            ),
            "en-US".to_string(),
        );

        let mut handle = recognizer.start().unwrap();
        assert_eq!(
            handle.next_event().await,
            Some(RecognitionEvent::Result {
                transcript: "first".to_string(),
                is_final: true,
            })
        );
        assert_eq!(handle.next_event().await, Some(RecognitionEvent::End));
    }
}
