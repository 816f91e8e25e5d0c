use crate::Result;
use crate::audio::AudioBuffer;
use crate::audio_format::AudioFormat;
use crate::mp3::{Mp3Bitrate, encode_mp3};
use crate::opts::Opts;
use crate::wav::encode_wav;

/// Turns a sliced buffer into the bytes of one playable file.
pub trait SegmentEncoder {
    fn format(&self) -> AudioFormat;
    fn encode(&self, buffer: &AudioBuffer) -> Result<Vec<u8>>;
}

/// Uncompressed 16-bit PCM WAV.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavEncoder;

impl SegmentEncoder for WavEncoder {
    fn format(&self) -> AudioFormat {
        AudioFormat::Wav
    }

    fn encode(&self, buffer: &AudioBuffer) -> Result<Vec<u8>> {
        Ok(encode_wav(buffer))
    }
}

/// Constant-bitrate MP3. A fresh LAME encoder is built for every `encode` call.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mp3Encoder {
    pub bitrate: Mp3Bitrate,
}

impl SegmentEncoder for Mp3Encoder {
    fn format(&self) -> AudioFormat {
        AudioFormat::Mp3
    }

    fn encode(&self, buffer: &AudioBuffer) -> Result<Vec<u8>> {
        encode_mp3(buffer, self.bitrate)
    }
}

/// Pick the encoder for `opts.format`.
pub fn encoder_for(opts: &Opts) -> Box<dyn SegmentEncoder + Send + Sync> {
    match opts.format {
        AudioFormat::Wav => Box::new(WavEncoder),
        AudioFormat::Mp3 => Box::new(Mp3Encoder {
            bitrate: opts.mp3_bitrate,
        }),
    }
}
