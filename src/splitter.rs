//! High-level API: one recording in, one clip per sentence out.
//!
//! `Splitter` wires the pieces together:
//! - decode the upload once into a canonical buffer (on a blocking thread)
//! - ask the transcriber for sentence boundaries
//! - slice + encode every boundary via the batch orchestrator
//!
//! It also exposes the two follow-up operations a frontend needs once a split exists:
//! re-encoding a single clip in another format, and bundling all clips into an archive.
//! The lower-level pieces stay usable (and testable) in their own modules.

use tokio::task::{spawn_blocking, yield_now};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::archive::{Archiver, ZipArchiver};
use crate::audio::AudioBuffer;
use crate::audio_format::AudioFormat;
use crate::batch::{BatchProgress, archive_all, process_all_with_progress, reencode};
use crate::decoder::decode_owned;
use crate::opts::Opts;
use crate::segments::{EncodedSegment, SegmentBoundary, validate_boundaries};
use crate::transcriber::Transcriber;
use crate::{Error, Result};

/// The result of one split: the decoded source, its boundaries, and the encoded clips.
///
/// The source is kept so clips can be re-encoded later without decoding again.
#[derive(Debug, Clone)]
pub struct Split {
    pub source: AudioBuffer,
    pub boundaries: Vec<SegmentBoundary>,
    pub segments: Vec<EncodedSegment>,
}

/// The main entry point.
///
/// `Splitter` owns the long-lived collaborators:
/// - a [`Transcriber`] that finds sentence boundaries
/// - an [`Archiver`] used to bundle clips
/// - the [`Opts`] every split is encoded with
///
/// Construct once and call [`Splitter::split`] for as many recordings as needed; nothing
/// is shared between calls except these read-only collaborators.
pub struct Splitter<T: Transcriber, A: Archiver = ZipArchiver> {
    transcriber: T,
    archiver: A,
    opts: Opts,
}

impl<T: Transcriber> Splitter<T> {
    /// Create a splitter that archives as ZIP.
    pub fn new(transcriber: T, opts: Opts) -> Self {
        Self::with_archiver(transcriber, ZipArchiver, opts)
    }
}

impl<T: Transcriber, A: Archiver> Splitter<T, A> {
    pub fn with_archiver(transcriber: T, archiver: A, opts: Opts) -> Self {
        Self {
            transcriber,
            archiver,
            opts,
        }
    }

    pub fn opts(&self) -> &Opts {
        &self.opts
    }

    /// Decode, transcribe, and encode every sentence of `audio`.
    ///
    /// `mime_type` is forwarded to the transcriber and used as a probing hint.
    pub async fn split(
        &self,
        audio: &[u8],
        mime_type: &str,
        cancel: &CancellationToken,
    ) -> Result<Split> {
        self.split_with_progress(audio, mime_type, cancel, |_| {}).await
    }

    /// Like [`Splitter::split`], reporting per-segment progress.
    #[instrument(skip_all, fields(mime_type = %mime_type, bytes = audio.len()))]
    pub async fn split_with_progress(
        &self,
        audio: &[u8],
        mime_type: &str,
        cancel: &CancellationToken,
        on_progress: impl FnMut(BatchProgress) + Send,
    ) -> Result<Split> {
        let source = decode_in_background(audio.to_vec(), mime_type.to_owned()).await?;
        info!(
            sample_rate = source.sample_rate(),
            channels = source.channel_count(),
            seconds = source.duration_seconds(),
            "decoded source"
        );

        if cancel.is_cancelled() {
            return Err(Error::Cancelled {
                completed: 0,
                partial: Vec::new(),
            });
        }

        let boundaries = self.transcriber.transcribe(audio, mime_type).await?;
        validate_boundaries(&boundaries)?;
        info!(boundaries = boundaries.len(), "received sentence boundaries");

        let segments =
            process_all_with_progress(&source, &boundaries, &self.opts, cancel, on_progress)
                .await?;

        Ok(Split {
            source,
            boundaries,
            segments,
        })
    }

    /// Re-encode clip `index` of `split` in `format`.
    pub async fn reencode(
        &self,
        split: &Split,
        index: usize,
        format: AudioFormat,
    ) -> Result<EncodedSegment> {
        let boundary = split.boundaries.get(index).ok_or_else(|| {
            Error::msg(format!(
                "segment index {index} out of range (have {})",
                split.boundaries.len()
            ))
        })?;

        reencode(&split.source, boundary, format, &self.opts).await
    }

    /// Bundle `segments` (all in `format`) into one archive using the configured naming.
    pub async fn archive(
        &self,
        segments: &[EncodedSegment],
        format: AudioFormat,
    ) -> Result<Vec<u8>> {
        yield_now().await;
        archive_all(segments, format, &self.opts.naming, &self.archiver)
    }
}

async fn decode_in_background(bytes: Vec<u8>, mime_type: String) -> Result<AudioBuffer> {
    spawn_blocking(move || decode_owned(bytes, Some(&mime_type)))
        .await
        .map_err(|e| Error::Decode(format!("decoder task failed: {e}")))?
}
