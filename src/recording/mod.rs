//! Recording controller, transcript buffer, and transcript export.

mod controller;
mod transcript;

pub use controller::{EventOutcome, RecordingController, RecordingError, RecordingState};
pub use transcript::{export_transcript, TranscriptBuffer};
