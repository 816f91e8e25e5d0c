//! Cut a time range out of an `AudioBuffer`.
//!
//! Frame boundaries are `floor(start * rate)` and `ceil(end * rate)`, clamped to the source.
//! Samples are copied verbatim: no resampling and no fade at the cut edges, so the output is
//! bit-identical to the corresponding region of the source.

use std::ops::Range;

use tracing::debug;

use crate::Result;
use crate::audio::AudioBuffer;

/// Compute the source frame range covered by `[start_seconds, end_seconds)`.
///
/// Returns `None` when the range is empty after clamping (inverted, zero-length, entirely
/// outside the buffer, or non-finite).
pub fn frame_range(
    buffer: &AudioBuffer,
    start_seconds: f64,
    end_seconds: f64,
) -> Option<Range<usize>> {
    if !start_seconds.is_finite() || !end_seconds.is_finite() {
        return None;
    }

    let rate = f64::from(buffer.sample_rate());
    let frame_count = buffer.frame_count() as i64;

    // `as i64` saturates on overflow.
    let start_frame = ((start_seconds * rate).floor() as i64).max(0);
    let end_frame = ((end_seconds * rate).ceil() as i64).min(frame_count);

    if end_frame <= start_frame {
        return None;
    }

    Some(start_frame as usize..end_frame as usize)
}

/// Copy the frames of `[start_seconds, end_seconds)` into a new buffer.
///
/// A range that covers no frames yields one frame of silence per channel instead of an error,
/// so a malformed boundary still produces a playable clip.
pub fn slice(buffer: &AudioBuffer, start_seconds: f64, end_seconds: f64) -> Result<AudioBuffer> {
    let Some(range) = frame_range(buffer, start_seconds, end_seconds) else {
        debug!(
            start_seconds,
            end_seconds,
            source_frames = buffer.frame_count(),
            "degenerate slice range; emitting one silent frame"
        );
        return AudioBuffer::silence(buffer.sample_rate(), buffer.channel_count(), 1);
    };

    let channels = buffer
        .channels()
        .iter()
        .map(|ch| ch[range.clone()].to_vec())
        .collect();

    AudioBuffer::new(buffer.sample_rate(), channels)
}
