//! Deterministic recognizer for tests and demos.
//!
//! Each `start()` call consumes the next scripted event batch, which lets
//! tests observe the controller's auto-restart path: the batch that ends in
//! a `no-speech` error is followed by a fresh handle serving the next batch.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;

use super::{RecognitionError, RecognitionEvent, RecognitionHandle, SpeechRecognizer};

pub struct ScriptedRecognizer {
    batches: Mutex<VecDeque<Vec<RecognitionEvent>>>,
    starts: AtomicUsize,
}

impl ScriptedRecognizer {
    pub fn new(batches: Vec<Vec<RecognitionEvent>>) -> Self {
        Self {
            batches: Mutex::new(batches.into()),
            starts: AtomicUsize::new(0),
        }
    }

    /// Convenience: one batch of final results, one per utterance.
    pub fn with_utterances(utterances: &[&str]) -> Self {
        let batch = utterances
            .iter()
            .map(|text| RecognitionEvent::Result {
                transcript: text.to_string(),
                is_final: true,
            })
            .collect();
        Self::new(vec![batch])
    }

    /// How many times `start()` has been called. Each auto-restart opens a
    /// new handle, so this counts restarts too.
    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }
}

impl SpeechRecognizer for ScriptedRecognizer {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn start(&self) -> Result<RecognitionHandle, RecognitionError> {
        self.starts.fetch_add(1, Ordering::SeqCst);

        let batch = self
            .batches
            .lock()
            .expect("scripted recognizer lock poisoned")
            .pop_front()
            .unwrap_or_default();

        let (tx, rx) = mpsc::unbounded_channel();
        for event in batch {
            let _ = tx.send(event);
        }

        Ok(RecognitionHandle::new(rx, None))
    }
}
