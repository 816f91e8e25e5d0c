use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

use crate::segments::EncodedSegment;

/// Scissors' crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// The pipeline stage an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decode,
    Transcribe,
    Slice,
    Encode,
    Archive,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Decode => "decode",
            Stage::Transcribe => "transcribe",
            Stage::Slice => "slice",
            Stage::Encode => "encode",
            Stage::Archive => "archive",
        };
        f.write_str(name)
    }
}

/// Scissors' crate-wide error type.
///
/// This is intentionally decoupled from `anyhow` so downstream libraries aren't forced to
/// adopt `anyhow` in their own public APIs.
#[derive(Debug, Error)]
pub enum Error {
    /// The source bytes are not a parseable audio container.
    #[error("decode failed: {0}")]
    Decode(String),

    /// The transcription collaborator failed or returned something unusable.
    #[error("transcription failed: {0}")]
    Transcription(String),

    /// The codec could not be constructed, or a block failed to encode.
    #[error("encode failed: {0}")]
    Encode(String),

    /// A batch aborted on one segment. `index` is the 0-based boundary position.
    #[error("segment {index} failed during {stage}: {source}")]
    Segment {
        index: usize,
        stage: Stage,
        #[source]
        source: Box<Error>,
    },

    #[error("archive failed: {0}")]
    Archive(String),

    /// The batch was cancelled between segments.
    ///
    /// `partial` holds every segment finished before cancellation, in input order.
    #[error("batch cancelled after {completed} segment(s)")]
    Cancelled {
        completed: usize,
        partial: Vec<EncodedSegment>,
    },

    #[error("invalid audio buffer: {0}")]
    InvalidBuffer(String),

    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Other(#[from] Box<dyn StdError + Send + Sync>),
}

impl Error {
    pub(crate) fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Wrap `self` as the failure of segment `index` during `stage`.
    pub(crate) fn at_segment(self, index: usize, stage: Stage) -> Self {
        Self::Segment {
            index,
            stage,
            source: Box::new(self),
        }
    }

    /// The stage this error belongs to, when it maps to one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::Decode(_) => Some(Stage::Decode),
            Error::Transcription(_) => Some(Stage::Transcribe),
            Error::Encode(_) => Some(Stage::Encode),
            Error::Segment { stage, .. } => Some(*stage),
            Error::Archive(_) => Some(Stage::Archive),
            _ => None,
        }
    }

    /// The failing segment index for batch errors.
    pub fn segment_index(&self) -> Option<usize> {
        match self {
            Error::Segment { index, .. } => Some(*index),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Message(format!("{err:#}"))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Other(Box::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Other(Box::new(err))
    }
}
