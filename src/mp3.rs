//! MP3 serialization for `AudioBuffer`s, backed by LAME.
//!
//! Each call builds its own encoder, feeds it the quantized samples in 1152-frame blocks
//! (one MPEG-1 Layer III frame per channel), flushes it, and returns the accumulated bytes.
//! No encoder state outlives a call, so segments never leak into each other.

use std::fmt;
use std::num::NonZeroU32;

use mp3lame_encoder::{Bitrate, Builder, DualPcm, FlushNoGap, MonoPcm, Quality};
use tracing::debug;

use crate::audio::AudioBuffer;
use crate::pcm::quantize_channel;
use crate::{Error, Result};

/// Frames per channel submitted to the encoder at a time.
pub const MP3_BLOCK_FRAMES: usize = 1152;

/// Sample rates an MP3 stream can carry (MPEG-1, MPEG-2 and MPEG-2.5).
pub const MP3_SAMPLE_RATES: [u32; 9] = [
    8_000, 11_025, 12_000, 16_000, 22_050, 24_000, 32_000, 44_100, 48_000,
];

/// The sample rate an MP3 of a `sample_rate` source is written at.
///
/// Rates MP3 can carry are kept as-is. Anything else is resampled by LAME to the next
/// higher MP3 rate, or to 48 kHz above that.
pub fn mp3_output_rate(sample_rate: u32) -> u32 {
    MP3_SAMPLE_RATES
        .iter()
        .copied()
        .find(|&rate| rate >= sample_rate)
        .unwrap_or(48_000)
}

/// A constant bitrate supported by the MP3 encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mp3Bitrate(u32);

impl Mp3Bitrate {
    /// Bitrates accepted by [`Mp3Bitrate::from_kbps`].
    pub const SUPPORTED_KBPS: [u32; 16] = [
        8, 16, 24, 32, 40, 48, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320,
    ];

    pub const DEFAULT: Self = Self(128);

    /// Validate a bitrate in kbit/s.
    pub fn from_kbps(kbps: u32) -> Result<Self> {
        if Self::SUPPORTED_KBPS.contains(&kbps) {
            Ok(Self(kbps))
        } else {
            Err(Error::Encode(format!(
                "unsupported MP3 bitrate {kbps} kbps (expected one of {:?})",
                Self::SUPPORTED_KBPS
            )))
        }
    }

    pub fn kbps(self) -> u32 {
        self.0
    }

    fn to_lame(self) -> Bitrate {
        match self.0 {
            8 => Bitrate::Kbps8,
            16 => Bitrate::Kbps16,
            24 => Bitrate::Kbps24,
            32 => Bitrate::Kbps32,
            40 => Bitrate::Kbps40,
            48 => Bitrate::Kbps48,
            64 => Bitrate::Kbps64,
            80 => Bitrate::Kbps80,
            96 => Bitrate::Kbps96,
            112 => Bitrate::Kbps112,
            160 => Bitrate::Kbps160,
            192 => Bitrate::Kbps192,
            224 => Bitrate::Kbps224,
            256 => Bitrate::Kbps256,
            320 => Bitrate::Kbps320,
            _ => Bitrate::Kbps128,
        }
    }
}

impl Default for Mp3Bitrate {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Mp3Bitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} kbps", self.0)
    }
}

/// Encode `buffer` as a constant-bitrate MP3 stream.
///
/// Only the first two channels are encoded; extra channels are dropped. The output keeps the
/// source sample rate whenever MP3 can carry it (see [`mp3_output_rate`]); if `bitrate` is
/// not allowed at that rate LAME uses the nearest one that is. Any encoder failure aborts
/// the whole call, so callers never see a truncated stream.
pub fn encode_mp3(buffer: &AudioBuffer, bitrate: Mp3Bitrate) -> Result<Vec<u8>> {
    let channel_count = buffer.channel_count().min(2);
    if buffer.channel_count() > 2 {
        debug!(
            channels = buffer.channel_count(),
            "MP3 output keeps only the first two channels"
        );
    }

    let mut builder =
        Builder::new().ok_or_else(|| Error::Encode("failed to allocate LAME encoder".into()))?;
    builder
        .set_num_channels(channel_count as u8)
        .map_err(|e| Error::Encode(format!("invalid channel count {channel_count}: {e:?}")))?;
    builder
        .set_sample_rate(buffer.sample_rate())
        .map_err(|e| {
            Error::Encode(format!(
                "invalid sample rate {}: {e:?}",
                buffer.sample_rate()
            ))
        })?;
    let output_rate = mp3_output_rate(buffer.sample_rate());
    if output_rate != buffer.sample_rate() {
        debug!(
            input_rate = buffer.sample_rate(),
            output_rate, "MP3 cannot carry the source rate; resampling"
        );
    }
    builder
        .set_output_sample_rate(NonZeroU32::new(output_rate))
        .map_err(|e| Error::Encode(format!("invalid output sample rate {output_rate}: {e:?}")))?;
    builder
        .set_brate(bitrate.to_lame())
        .map_err(|e| Error::Encode(format!("invalid bitrate {bitrate}: {e:?}")))?;
    builder
        .set_quality(Quality::Good)
        .map_err(|e| Error::Encode(format!("invalid quality: {e:?}")))?;

    let mut encoder = builder
        .build()
        .map_err(|e| Error::Encode(format!("failed to build LAME encoder: {e:?}")))?;

    let pcm: Vec<Vec<i16>> = buffer.channels()[..channel_count]
        .iter()
        .map(|ch| quantize_channel(ch))
        .collect();

    let frames = buffer.frame_count();
    // LAME's output size follows the output rate, so size buffers for the resampled block.
    let output_frames = |input_frames: usize| {
        (input_frames as u64 * u64::from(output_rate)).div_ceil(u64::from(buffer.sample_rate()))
            as usize
    };

    let mut out = Vec::new();
    let mut start = 0;
    while start < frames {
        let end = (start + MP3_BLOCK_FRAMES).min(frames);
        out.reserve(mp3lame_encoder::max_required_buffer_size(output_frames(end - start)));

        let res = match pcm.as_slice() {
            [mono] => encoder.encode_to_vec(MonoPcm(&mono[start..end]), &mut out),
            [left, right] => encoder.encode_to_vec(
                DualPcm {
                    left: &left[start..end],
                    right: &right[start..end],
                },
                &mut out,
            ),
            _ => return Err(Error::Encode("MP3 requires one or two channels".into())),
        };
        res.map_err(|e| Error::Encode(format!("block at frame {start} failed: {e:?}")))?;

        start = end;
    }

    out.reserve(mp3lame_encoder::max_required_buffer_size(output_frames(MP3_BLOCK_FRAMES)));
    encoder
        .flush_to_vec::<FlushNoGap>(&mut out)
        .map_err(|e| Error::Encode(format!("flush failed: {e:?}")))?;

    debug!(
        frames,
        channels = channel_count,
        %bitrate,
        bytes = out.len(),
        "encoded MP3 segment"
    );

    Ok(out)
}
