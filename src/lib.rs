//! `scissors`: cut one recording into per-sentence WAV or MP3 clips.
//!
//! This crate provides:
//! - Decoding of common containers (WAV, MP3, FLAC, Ogg, MP4/AAC, ...) into a planar buffer
//! - Time-range slicing on frame boundaries
//! - Segment encoders (16-bit PCM WAV, constant-bitrate MP3)
//! - A batch orchestrator with cancellation, progress, and per-segment error reporting
//! - Archive bundling (ZIP) for handing a whole batch to a client
//!
//! Sentence boundaries come from a pluggable [`Transcriber`]; most consumers should start
//! with [`Splitter`].

// High-level API (most consumers should start here).
pub mod opts;
pub mod splitter;

// Errors shared by every stage.
pub mod error;

// Audio representation, decoding, and slicing.
pub mod audio;
pub mod decoder;
pub mod demux;
pub mod slicer;

// Output selection and encoder interfaces.
pub mod audio_format;
pub mod segment_encoder;

// Encoders that serialize one buffer into a file format.
pub mod mp3;
pub mod pcm;
pub mod wav;

// Boundaries, batches, and bundling.
pub mod archive;
pub mod batch;
pub mod segments;

// Boundary sources.
pub mod transcriber;
pub mod transcribers;

// Logging configuration and control.
#[cfg(feature = "logging")]
pub mod logging;

pub use archive::{ArchiveEntry, Archiver, ZipArchiver};
pub use audio::AudioBuffer;
pub use audio_format::AudioFormat;
pub use batch::BatchProgress;
pub use error::{Error, Result, Stage};
pub use mp3::Mp3Bitrate;
pub use opts::Opts;
pub use segments::{EncodedSegment, NamingScheme, SegmentBoundary};
pub use splitter::{Split, Splitter};
pub use transcriber::{StaticTranscriber, Transcriber};
pub use tokio_util::sync::CancellationToken;

#[cfg(feature = "http-transcriber")]
pub use transcribers::http::HttpTranscriber;

#[cfg(feature = "logging")]
pub use logging::init as init_logging;
