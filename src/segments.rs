use serde::{Deserialize, Serialize};

use crate::audio_format::AudioFormat;
use crate::{Error, Result};

/// One sentence-level sub-range of the source audio, as reported by a transcriber.
///
/// Accepts both `start`/`end` and `start_seconds`/`end_seconds` keys so the JSON output of a
/// Whisper-style transcription server can be fed in unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentBoundary {
    pub text: String,

    #[serde(alias = "start_seconds")]
    pub start: f64,

    #[serde(alias = "end_seconds")]
    pub end: f64,
}

impl SegmentBoundary {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }
}

/// Parse a JSON array of boundaries.
///
/// Unknown keys (e.g. `language_code`, `tokens`) are ignored. Non-finite timestamps are
/// rejected; inverted or out-of-range times are kept as-is and resolve to minimal clips.
pub fn boundaries_from_json(bytes: &[u8]) -> Result<Vec<SegmentBoundary>> {
    let boundaries: Vec<SegmentBoundary> = serde_json::from_slice(bytes)?;
    validate_boundaries(&boundaries)?;
    Ok(boundaries)
}

pub(crate) fn validate_boundaries(boundaries: &[SegmentBoundary]) -> Result<()> {
    match boundaries
        .iter()
        .position(|b| !b.start.is_finite() || !b.end.is_finite())
    {
        Some(i) => Err(Error::Transcription(format!(
            "boundary {i} has a non-finite timestamp"
        ))),
        None => Ok(()),
    }
}

/// An encoded clip for one boundary.
#[derive(Clone, PartialEq)]
pub struct EncodedSegment {
    pub boundary: SegmentBoundary,
    pub format: AudioFormat,
    pub bytes: Vec<u8>,
}

impl EncodedSegment {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// File name for this segment at 0-based position `index`.
    pub fn file_name(&self, index: usize, naming: &NamingScheme) -> String {
        naming.file_name(index, self.format)
    }
}

// Clips can be megabytes; keep `{:?}` output readable.
impl std::fmt::Debug for EncodedSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodedSegment")
            .field("boundary", &self.boundary)
            .field("format", &self.format)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// How output files are named: `{prefix}-{1-based index}.{ext}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingScheme {
    pub prefix: String,
}

impl NamingScheme {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn file_name(&self, index: usize, format: AudioFormat) -> String {
        format!("{}-{}.{}", self.prefix, index + 1, format.extension())
    }
}

impl Default for NamingScheme {
    fn default() -> Self {
        Self::new("sentence")
    }
}
