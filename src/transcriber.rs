use std::future::Future;
use std::path::Path;

use crate::Result;
use crate::segments::{SegmentBoundary, boundaries_from_json};

/// Pluggable source of sentence boundaries used by [`crate::Splitter`].
///
/// A transcriber receives the original encoded audio bytes (not the decoded buffer) plus
/// their MIME type, and returns boundaries in playback order. Any failure should be reported
/// as [`crate::Error::Transcription`] with the collaborator's message attached.
pub trait Transcriber: Send + Sync {
    fn transcribe(
        &self,
        audio: &[u8],
        mime_type: &str,
    ) -> impl Future<Output = Result<Vec<SegmentBoundary>>> + Send;
}

/// A transcriber that always returns the same boundaries.
///
/// Useful when boundaries were computed ahead of time (e.g. a JSON file produced by a
/// separate transcription run) and for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticTranscriber {
    boundaries: Vec<SegmentBoundary>,
}

impl StaticTranscriber {
    pub fn new(boundaries: Vec<SegmentBoundary>) -> Self {
        Self { boundaries }
    }

    /// Parse a JSON array of `{text, start, end}` objects.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        Ok(Self::new(boundaries_from_json(bytes)?))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_json_slice(&bytes)
    }

    pub fn boundaries(&self) -> &[SegmentBoundary] {
        &self.boundaries
    }
}

impl Transcriber for StaticTranscriber {
    fn transcribe(
        &self,
        _audio: &[u8],
        _mime_type: &str,
    ) -> impl Future<Output = Result<Vec<SegmentBoundary>>> + Send {
        let boundaries = self.boundaries.clone();
        async move { Ok(boundaries) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_transcriber_ignores_audio() -> anyhow::Result<()> {
        let t = StaticTranscriber::from_json_slice(br#"[{"text": "a", "start": 0, "end": 1}]"#)?;
        let out = t.transcribe(b"not even audio", "audio/wav").await?;
        assert_eq!(out, vec![SegmentBoundary::new("a", 0.0, 1.0)]);
        Ok(())
    }

    #[test]
    fn exposes_loaded_boundaries_in_order() -> anyhow::Result<()> {
        let t = StaticTranscriber::from_json_slice(
            br#"[{"text": "b", "start_seconds": 1, "end_seconds": 2}, {"text": "a", "start": 0, "end": 1}]"#,
        )?;
        let texts: Vec<_> = t.boundaries().iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, ["b", "a"]);
        assert!(StaticTranscriber::default().boundaries().is_empty());
        Ok(())
    }

    #[test]
    fn from_json_file_reports_missing_file() {
        assert!(StaticTranscriber::from_json_file("tests/fixtures/does-not-exist.json").is_err());
    }
}
