//! Drive slice → encode over a list of boundaries.
//!
//! Segments are processed sequentially, in input order. Each slice is an independent copy of
//! the source, so nothing here needs locking; the source buffer is only ever borrowed shared.
//!
//! Scheduling contract:
//! - we yield to the async runtime once before the batch and before every MP3 encode, so a
//!   long batch on a shared runtime doesn't starve other tasks
//! - cancellation is checked between segments; an in-flight encode always runs to completion

use tokio::task::yield_now;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::archive::{ArchiveEntry, Archiver};
use crate::audio::AudioBuffer;
use crate::audio_format::AudioFormat;
use crate::error::Stage;
use crate::opts::Opts;
use crate::segment_encoder::{SegmentEncoder, encoder_for};
use crate::segments::{EncodedSegment, NamingScheme, SegmentBoundary};
use crate::slicer::slice;
use crate::{Error, Result};

/// Reported after every finished segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
}

/// Slice and encode every boundary in `opts.format`, preserving input order.
pub async fn process_all(
    source: &AudioBuffer,
    boundaries: &[SegmentBoundary],
    opts: &Opts,
    cancel: &CancellationToken,
) -> Result<Vec<EncodedSegment>> {
    process_all_with_progress(source, boundaries, opts, cancel, |_| {}).await
}

/// Like [`process_all`], calling `on_progress` after each segment.
pub async fn process_all_with_progress(
    source: &AudioBuffer,
    boundaries: &[SegmentBoundary],
    opts: &Opts,
    cancel: &CancellationToken,
    on_progress: impl FnMut(BatchProgress) + Send,
) -> Result<Vec<EncodedSegment>> {
    let encoder = encoder_for(opts);
    process_with_encoder(source, boundaries, encoder.as_ref(), cancel, on_progress).await
}

/// Run a batch with an explicit encoder.
///
/// The first failing segment aborts the batch with [`Error::Segment`]. Cancellation returns
/// [`Error::Cancelled`] carrying every segment finished so far.
pub async fn process_with_encoder<E>(
    source: &AudioBuffer,
    boundaries: &[SegmentBoundary],
    encoder: &E,
    cancel: &CancellationToken,
    mut on_progress: impl FnMut(BatchProgress) + Send,
) -> Result<Vec<EncodedSegment>>
where
    E: SegmentEncoder + Sync + ?Sized,
{
    let total = boundaries.len();
    let format = encoder.format();
    debug!(segments = total, %format, "starting batch");

    yield_now().await;

    let mut out = Vec::with_capacity(total);
    for (index, boundary) in boundaries.iter().enumerate() {
        if cancel.is_cancelled() {
            warn!(completed = out.len(), total, "batch cancelled");
            return Err(Error::Cancelled {
                completed: out.len(),
                partial: out,
            });
        }

        if format == AudioFormat::Mp3 {
            yield_now().await;
        }

        let segment = encode_segment(source, boundary, encoder)
            .map_err(|(stage, err)| err.at_segment(index, stage))?;

        debug!(
            index,
            start = boundary.start,
            end = boundary.end,
            bytes = segment.bytes.len(),
            "encoded segment"
        );

        out.push(segment);
        on_progress(BatchProgress {
            completed: out.len(),
            total,
        });
    }

    info!(segments = out.len(), %format, "batch finished");
    Ok(out)
}

/// Slice one boundary out of `source` again and encode it in `format`.
///
/// This is the on-demand conversion path: a segment produced as WAV can be re-encoded as
/// MP3 (or back) without re-running the batch.
pub async fn reencode(
    source: &AudioBuffer,
    boundary: &SegmentBoundary,
    format: AudioFormat,
    opts: &Opts,
) -> Result<EncodedSegment> {
    let encoder = encoder_for(&opts.with_format(format));
    if format == AudioFormat::Mp3 {
        yield_now().await;
    }

    encode_segment(source, boundary, encoder.as_ref()).map_err(|(_, err)| err)
}

/// Name every segment and hand them to `archiver` in order.
///
/// All segments must already be in `format`; mixed batches are rejected rather than
/// silently archived under the wrong extension.
pub fn archive_all<A>(
    segments: &[EncodedSegment],
    format: AudioFormat,
    naming: &NamingScheme,
    archiver: &A,
) -> Result<Vec<u8>>
where
    A: Archiver + ?Sized,
{
    if let Some(index) = segments.iter().position(|s| s.format != format) {
        return Err(Error::Archive(format!(
            "segment {index} is {}, expected {format}; re-encode it first",
            segments[index].format
        )));
    }

    let names: Vec<String> = (0..segments.len())
        .map(|i| naming.file_name(i, format))
        .collect();
    let entries: Vec<ArchiveEntry<'_>> = names
        .iter()
        .zip(segments)
        .map(|(name, seg)| ArchiveEntry {
            name,
            bytes: &seg.bytes,
        })
        .collect();

    let bytes = archiver.bundle(&entries)?;
    info!(entries = entries.len(), bytes = bytes.len(), "archive built");
    Ok(bytes)
}

fn encode_segment<E>(
    source: &AudioBuffer,
    boundary: &SegmentBoundary,
    encoder: &E,
) -> std::result::Result<EncodedSegment, (Stage, Error)>
where
    E: SegmentEncoder + ?Sized,
{
    let clip = slice(source, boundary.start, boundary.end).map_err(|e| (Stage::Slice, e))?;
    let bytes = encoder.encode(&clip).map_err(|e| (Stage::Encode, e))?;

    Ok(EncodedSegment {
        boundary: boundary.clone(),
        format: encoder.format(),
        bytes,
    })
}
