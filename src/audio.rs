//! The canonical in-memory audio representation.
//!
//! Every stage of the pipeline speaks `AudioBuffer`: the decoder produces one, the slicer
//! produces smaller ones, and the encoders consume them. Buffers are immutable once built,
//! so a source buffer can be shared by reference across any number of slice operations.

use crate::{Error, Result};

/// Most channels a buffer may have.
pub const MAX_CHANNELS: usize = (u16::MAX / 2) as usize;

/// Planar multi-channel `f32` audio at a fixed sample rate.
///
/// Samples are nominally in `[-1.0, 1.0]`; out-of-range values are tolerated here and
/// clamped at quantization time.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Build a buffer from planar channel data.
    ///
    /// Fails if the sample rate is zero, there are no channels, or the channels differ in length.
    /// The 16-bit PCM frame size (`channels * 2`) must fit in 16 bits and the byte rate
    /// (`rate * channels * 2`) in 32 bits, which is what a WAV header can describe.
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self> {
        if sample_rate == 0 {
            return Err(Error::InvalidBuffer("sample rate must be positive".into()));
        }

        let Some(first) = channels.first() else {
            return Err(Error::InvalidBuffer("at least one channel is required".into()));
        };

        if channels.len() > MAX_CHANNELS {
            return Err(Error::InvalidBuffer(format!(
                "{} channels exceed the maximum of {MAX_CHANNELS}",
                channels.len()
            )));
        }

        let byte_rate = u64::from(sample_rate) * channels.len() as u64 * 2;
        if byte_rate > u64::from(u32::MAX) {
            return Err(Error::InvalidBuffer(format!(
                "{sample_rate} Hz x {} channels is too high a rate for 16-bit PCM",
                channels.len()
            )));
        }

        let frames = first.len();
        if let Some((i, ch)) = channels.iter().enumerate().find(|(_, ch)| ch.len() != frames) {
            return Err(Error::InvalidBuffer(format!(
                "channel {i} has {} frames, expected {frames}",
                ch.len()
            )));
        }

        Ok(Self {
            sample_rate,
            channels,
        })
    }

    /// A buffer of `frames` zero samples on each of `channel_count` channels.
    pub fn silence(sample_rate: u32, channel_count: usize, frames: usize) -> Result<Self> {
        Self::new(sample_rate, vec![vec![0.0; frames]; channel_count])
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of frames (samples per channel).
    pub fn frame_count(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count() == 0
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn duration_seconds(&self) -> f64 {
        self.frame_count() as f64 / f64::from(self.sample_rate)
    }
}
