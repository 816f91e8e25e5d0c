// src/decoder.rs

//! Decode a whole in-memory audio file into an [`AudioBuffer`].
//!
//! This module is orchestration-focused:
//! - `demux` handles probing + packet iteration
//! - this module builds the codec, decodes every packet and de-interleaves the PCM
//!
//! Unlike a streaming transcoder we keep the source's sample rate and channel layout
//! untouched: slicing happens on the original samples.

use anyhow::{Context, anyhow, bail};
use symphonia::core::audio::{AudioBufferRef, SampleBuffer};
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::Track;
use tracing::debug;

use crate::audio::AudioBuffer;
use crate::demux::{next_packet, probe_bytes_and_pick_track};
use crate::{Error, Result};

/// Decode `bytes` (any container/codec Symphonia understands) into a canonical buffer.
pub fn decode(bytes: &[u8]) -> Result<AudioBuffer> {
    decode_with_hint(bytes, None)
}

/// Decode `bytes`, using `hint` (a file extension or MIME type) to help probing.
///
/// Fails with [`Error::Decode`] for empty input, unrecognized containers, streams without
/// an audio track, and streams that decode to zero frames.
pub fn decode_with_hint(bytes: &[u8], hint: Option<&str>) -> Result<AudioBuffer> {
    decode_owned(bytes.to_vec(), hint)
}

/// Like [`decode_with_hint`], taking ownership of the bytes to avoid a copy.
pub fn decode_owned(bytes: Vec<u8>, hint: Option<&str>) -> Result<AudioBuffer> {
    if bytes.is_empty() {
        return Err(Error::Decode("input is empty".into()));
    }

    let buffer = decode_impl(bytes, hint).map_err(|e| Error::Decode(format!("{e:#}")))?;

    debug!(
        sample_rate = buffer.sample_rate(),
        channels = buffer.channel_count(),
        frames = buffer.frame_count(),
        "decoded source audio"
    );

    Ok(buffer)
}

fn decode_impl(bytes: Vec<u8>, hint: Option<&str>) -> anyhow::Result<AudioBuffer> {
    let (mut format, track) = probe_bytes_and_pick_track(bytes, hint)?;
    let mut decoder = make_decoder_for_track(&track)?;
    let mut collector = PlanarCollector::new(&track);

    while let Some(packet) = next_packet(&mut format)? {
        // Ignore packets from non-audio tracks.
        if packet.track_id() != track.id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => collector.push(decoded)?,

            // Recoverable: a corrupted frame, decoding can continue.
            Err(SymphoniaError::DecodeError(err)) => {
                debug!(error = err, "skipping undecodable packet");
            }

            // The demuxer decides when the stream ends.
            Err(SymphoniaError::IoError(_)) => {}

            Err(e) => return Err(anyhow!(e)).context("decoder failure"),
        }
    }

    collector.finish()
}

fn make_decoder_for_track(track: &Track) -> anyhow::Result<Box<dyn Decoder>> {
    symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| anyhow!(e))
        .context("failed to create decoder for audio track")
}

/// Accumulates decoded packets as planar `f32` channels.
struct PlanarCollector {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,

    // Scratch buffer used to convert each decoded packet into interleaved `f32`.
    scratch: Option<SampleBuffer<f32>>,
}

impl PlanarCollector {
    fn new(track: &Track) -> Self {
        let channel_count = track
            .codec_params
            .channels
            .map_or(0, |layout| layout.count());

        Self {
            sample_rate: track.codec_params.sample_rate.unwrap_or(0),
            channels: vec![Vec::new(); channel_count],
            scratch: None,
        }
    }

    fn push(&mut self, decoded: AudioBufferRef<'_>) -> anyhow::Result<()> {
        let spec = *decoded.spec();
        let channel_count = spec.channels.count();
        if channel_count == 0 {
            bail!("decoded audio had zero channels");
        }

        // Some codecs only reveal their layout once the first packet is decoded.
        if self.channels.is_empty() {
            self.channels = vec![Vec::new(); channel_count];
        } else if self.channels.len() != channel_count {
            bail!(
                "channel count changed mid-stream ({} -> {channel_count})",
                self.channels.len()
            );
        }
        if self.sample_rate == 0 {
            self.sample_rate = spec.rate;
        }

        // Packets can grow past the first packet's capacity; reallocate when they do.
        let needed = decoded.capacity() * channel_count;
        if self.scratch.as_ref().is_none_or(|buf| buf.capacity() < needed) {
            self.scratch = Some(SampleBuffer::<f32>::new(decoded.capacity() as u64, spec));
        }
        let scratch = self
            .scratch
            .as_mut()
            .ok_or_else(|| anyhow!("sample buffer not initialized"))?;
        scratch.copy_interleaved_ref(decoded);

        for frame in scratch.samples().chunks_exact(channel_count) {
            for (ch, &sample) in self.channels.iter_mut().zip(frame) {
                ch.push(sample);
            }
        }

        Ok(())
    }

    fn finish(self) -> anyhow::Result<AudioBuffer> {
        if self.channels.first().is_none_or(Vec::is_empty) {
            bail!("stream contained no decodable audio frames");
        }

        AudioBuffer::new(self.sample_rate, self.channels).context("decoded audio is malformed")
    }
}
