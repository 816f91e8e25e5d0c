// src/demux.rs

//! Container probing and packet iteration on top of Symphonia.
//!
//! Responsibilities:
//! - Probe an in-memory source and select the audio track to decode
//! - Provide a `next_packet` helper that treats IO errors as end-of-stream

use std::io::Cursor;

use anyhow::{Context, Result, anyhow};
use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Packet, Track};
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Probe an in-memory file and pick its audio track.
///
/// Track selection policy:
/// - choose the first track that looks decodable (codec != NULL)
/// - and has a known sample rate (the canonical buffer needs one)
///
/// `hint` may be a file extension (`"mp3"`) or a MIME type (`"audio/mpeg"`).
pub fn probe_bytes_and_pick_track(
    bytes: Vec<u8>,
    hint: Option<&str>,
) -> Result<(Box<dyn FormatReader>, Track)> {
    let mss_opts = MediaSourceStreamOptions {
        // Symphonia expects a power-of-two buffer > 32KiB for good probing behavior.
        buffer_len: 256 * 1024,
    };

    // A cursor is seekable, so containers with trailing metadata (MP4 `moov`) still probe.
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), mss_opts);

    let probed = symphonia::default::get_probe()
        .format(
            &build_hint(hint),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| anyhow!(e))
        .context("failed to probe media stream")?;

    let format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL && t.codec_params.sample_rate.is_some())
        .cloned()
        .ok_or_else(|| anyhow!("no audio track found"))?;

    Ok((format, track))
}

/// Read the next packet, treating IO errors as "end of stream".
pub fn next_packet(format: &mut Box<dyn FormatReader>) -> Result<Option<Packet>> {
    match format.next_packet() {
        Ok(p) => Ok(Some(p)),
        Err(SymphoniaError::IoError(_)) => Ok(None),
        Err(e) => Err(anyhow!(e)).context("failed reading packet"),
    }
}

fn build_hint(hint: Option<&str>) -> Hint {
    let mut out = Hint::new();
    match hint.map(str::trim) {
        Some(h) if h.contains('/') => {
            // Drop MIME parameters such as `; codecs=opus`.
            let mime = h.split(';').next().unwrap_or(h).trim();
            out.mime_type(mime);
            if let Some(ext) = extension_for_mime(mime) {
                out.with_extension(ext);
            }
        }
        Some(ext) if !ext.is_empty() => {
            out.with_extension(ext.trim_start_matches('.'));
        }
        _ => {}
    }
    out
}

fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let ext = match mime.to_ascii_lowercase().as_str() {
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/wav" | "audio/wave" | "audio/x-wav" | "audio/vnd.wave" => "wav",
        "audio/flac" | "audio/x-flac" => "flac",
        "audio/ogg" | "application/ogg" => "ogg",
        "audio/webm" | "video/webm" => "webm",
        "audio/mp4" | "audio/x-m4a" | "audio/m4a" | "video/mp4" => "m4a",
        "audio/aac" => "aac",
        "audio/aiff" | "audio/x-aiff" => "aiff",
        _ => return None,
    };
    Some(ext)
}

/// The MIME type for a file extension, for callers that only know a path.
pub fn mime_type_for_extension(ext: &str) -> Option<&'static str> {
    let mime = match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
        "mp3" => "audio/mpeg",
        "wav" | "wave" => "audio/wav",
        "flac" => "audio/flac",
        "ogg" | "oga" | "opus" => "audio/ogg",
        "webm" => "audio/webm",
        "m4a" | "mp4" => "audio/mp4",
        "aac" => "audio/aac",
        "aif" | "aiff" => "audio/aiff",
        _ => return None,
    };
    Some(mime)
}
