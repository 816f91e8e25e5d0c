//! RIFF/WAVE serialization for `AudioBuffer`s.
//!
//! Output is always the canonical 44-byte header (16-byte `fmt ` chunk, PCM tag 1,
//! 16 bits per sample) followed by frame-interleaved little-endian `i16` samples.
//! This holds for any channel count; we never emit `WAVE_FORMAT_EXTENSIBLE`.

use crate::audio::AudioBuffer;
use crate::pcm::quantize;

/// Size of the header written by [`encode_wav`].
pub const WAV_HEADER_LEN: usize = 44;

const BITS_PER_SAMPLE: u16 = 16;
const BYTES_PER_SAMPLE: u32 = (BITS_PER_SAMPLE / 8) as u32;
const FORMAT_TAG_PCM: u16 = 1;

/// Serialize `buffer` into a 16-bit PCM WAV byte stream.
///
/// This never fails: an empty buffer still produces a valid header with a zero-length
/// `data` chunk. Past 4 GiB the size fields saturate at `u32::MAX`, which readers treat as
/// "data runs to end of file".
pub fn encode_wav(buffer: &AudioBuffer) -> Vec<u8> {
    let channels = buffer.channel_count();
    let frames = buffer.frame_count();
    let data_len = frames * channels * BYTES_PER_SAMPLE as usize;

    let mut out = Vec::with_capacity(WAV_HEADER_LEN + data_len);
    // `AudioBuffer::new` caps channels at `MAX_CHANNELS`.
    let channels_field = u16::try_from(channels).unwrap_or(u16::MAX);
    write_header(&mut out, channels_field, buffer.sample_rate(), data_len);

    for frame in 0..frames {
        for ch in buffer.channels() {
            out.extend_from_slice(&quantize(ch[frame]).to_le_bytes());
        }
    }

    out
}

/// The RIFF and `data` chunk size fields for `data_len` bytes of samples.
fn chunk_sizes(data_len: usize) -> (u32, u32) {
    match u32::try_from(data_len) {
        Ok(data) if data <= u32::MAX - 36 => (36 + data, data),
        _ => (u32::MAX, u32::MAX),
    }
}

fn write_header(out: &mut Vec<u8>, channels: u16, sample_rate: u32, data_len: usize) {
    let block_align = u32::from(channels) * BYTES_PER_SAMPLE;
    let byte_rate = sample_rate.saturating_mul(block_align);
    let (riff_len, data_len) = chunk_sizes(data_len);

    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&riff_len.to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&FORMAT_TAG_PCM.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&u16::try_from(block_align).unwrap_or(u16::MAX).to_le_bytes());
    out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u16_at(bytes: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
    }

    fn u32_at(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ])
    }

    #[test]
    fn stereo_header_fields() -> anyhow::Result<()> {
        let buf = AudioBuffer::silence(44_100, 2, 100)?;
        let wav = encode_wav(&buf);

        assert_eq!(wav.len(), 444);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(u32_at(&wav, 4), 436);
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(u32_at(&wav, 16), 16);
        assert_eq!(u16_at(&wav, 20), 1);
        assert_eq!(u16_at(&wav, 22), 2);
        assert_eq!(u32_at(&wav, 24), 44_100);
        assert_eq!(u32_at(&wav, 28), 176_400);
        assert_eq!(u16_at(&wav, 32), 4);
        assert_eq!(u16_at(&wav, 34), 16);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(u32_at(&wav, 40), 400);
        Ok(())
    }

    #[test]
    fn interleaves_frames_in_channel_order() -> anyhow::Result<()> {
        let buf = AudioBuffer::new(8_000, vec![vec![1.0, -1.0], vec![0.0, 0.5]])?;
        let wav = encode_wav(&buf);

        let samples: Vec<i16> = wav[WAV_HEADER_LEN..]
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();
        assert_eq!(samples, vec![32_767, 0, -32_768, 16_383]);
        Ok(())
    }

    #[test]
    fn empty_buffer_produces_bare_header() -> anyhow::Result<()> {
        let buf = AudioBuffer::silence(16_000, 1, 0)?;
        let wav = encode_wav(&buf);
        assert_eq!(wav.len(), WAV_HEADER_LEN);
        assert_eq!(u32_at(&wav, 4), 36);
        assert_eq!(u32_at(&wav, 40), 0);
        Ok(())
    }

    #[test]
    fn many_channels_keep_plain_pcm_header() -> anyhow::Result<()> {
        let buf = AudioBuffer::silence(48_000, 6, 10)?;
        let wav = encode_wav(&buf);
        assert_eq!(wav.len(), WAV_HEADER_LEN + 10 * 6 * 2);
        assert_eq!(u32_at(&wav, 16), 16);
        assert_eq!(u16_at(&wav, 20), 1);
        assert_eq!(u16_at(&wav, 32), 12);
        Ok(())
    }

    #[test]
    fn highest_accepted_rate_fits_the_header() -> anyhow::Result<()> {
        let rate = i32::MAX as u32;
        let wav = encode_wav(&AudioBuffer::silence(rate, 1, 1)?);
        assert_eq!(u32_at(&wav, 24), rate);
        assert_eq!(u32_at(&wav, 28), rate * 2);
        Ok(())
    }

    #[test]
    fn oversized_data_saturates_chunk_sizes() {
        assert_eq!(chunk_sizes(400), (436, 400));
        assert_eq!(chunk_sizes(u32::MAX as usize - 36), (u32::MAX, u32::MAX - 36));
        assert_eq!(chunk_sizes(u32::MAX as usize - 35), (u32::MAX, u32::MAX));
        assert_eq!(chunk_sizes(usize::MAX), (u32::MAX, u32::MAX));
    }

    #[test]
    fn encoding_is_deterministic() -> anyhow::Result<()> {
        let tone = (0..500).map(|i| (i as f32 * 0.01).sin()).collect();
        let buf = AudioBuffer::new(22_050, vec![tone])?;
        assert_eq!(encode_wav(&buf), encode_wav(&buf));
        Ok(())
    }
}
