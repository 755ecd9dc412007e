//! Append-only transcript buffer and plain-text export.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::recognition::TranscriptSegment;

/// The live transcript of one recording session.
///
/// Segments are appended in arrival order and never altered afterwards;
/// callers see the buffer read-only.
#[derive(Debug, Default, Clone)]
pub struct TranscriptBuffer {
    text: String,
}

impl TranscriptBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume a session over a previously saved transcript.
    pub fn from_existing(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Append a final segment as `"[{timestamp}] {text}\n"`.
    pub fn append(&mut self, segment: &TranscriptSegment) {
        self.text
            .push_str(&format!("[{}] {}\n", segment.timestamp, segment.text));
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Make a meeting title safe for a filename. Falls back to `untitled`.
fn sanitize_title(title: &str) -> String {
    let cleaned: String = title
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    let cleaned = cleaned.trim_matches('-').to_string();

    if cleaned.is_empty() {
        "untitled".to_string()
    } else {
        cleaned
    }
}

/// Write the transcript to
/// `{dir}/meeting-transcript-{title}-{isoTimestamp}.txt`.
///
/// An empty buffer produces a zero-length file.
pub fn export_transcript(transcript: &str, title: &str, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).context("Failed to create export directory")?;

    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H-%M-%S%.3fZ");
    let filename = format!(
        "meeting-transcript-{}-{}.txt",
        sanitize_title(title),
        timestamp
    );
    let path = dir.join(filename);

    std::fs::write(&path, transcript).context("Failed to write transcript file")?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn segment(timestamp: &str, text: &str) -> TranscriptSegment {
        TranscriptSegment {
            timestamp: timestamp.to_string(),
            text: text.to_string(),
            is_final: true,
        }
    }

    #[test]
    fn test_append_only_concatenation() {
        let mut buffer = TranscriptBuffer::new();
        buffer.append(&segment("10:00:01", "we need to fix the login flow"));
        buffer.append(&segment("10:00:05", "assign it to dev@example.com"));

        assert_eq!(
            buffer.as_str(),
            "[10:00:01] we need to fix the login flow\n\
             [10:00:05] assign it to dev@example.com\n"
        );
    }

    #[test]
    fn test_from_existing_preserves_prior_text() {
        let mut buffer = TranscriptBuffer::from_existing("[09:59:00] earlier\n");
        buffer.append(&segment("10:00:00", "later"));
        assert!(buffer.as_str().starts_with("[09:59:00] earlier\n"));
        assert!(buffer.as_str().ends_with("[10:00:00] later\n"));
    }

    #[test]
    fn test_sanitize_title() {
        assert_eq!(sanitize_title("Sprint Planning #4"), "Sprint-Planning--4");
        assert_eq!(sanitize_title(""), "untitled");
        assert_eq!(sanitize_title("///"), "untitled");
    }

    #[test]
    fn test_export_writes_file() {
        let dir = TempDir::new().unwrap();
        let path = export_transcript("[10:00:01] hello\n", "Standup", dir.path()).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("meeting-transcript-Standup-"));
        assert!(name.ends_with(".txt"));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "[10:00:01] hello\n"
        );
    }

    #[test]
    fn test_export_empty_buffer_is_zero_length() {
        let dir = TempDir::new().unwrap();
        let path = export_transcript("", "", dir.path()).unwrap();

        let metadata = std::fs::metadata(&path).unwrap();
        assert_eq!(metadata.len(), 0);
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("meeting-transcript-untitled-"));
    }
}
