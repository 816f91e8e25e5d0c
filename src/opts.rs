use crate::audio_format::AudioFormat;
use crate::mp3::Mp3Bitrate;
use crate::segments::NamingScheme;

/// Options that control how segments are encoded and named.
///
/// This struct represents *library-level configuration*, not CLI flags directly.
/// The binaries map user input into this type so that:
/// - the library remains reusable outside of a CLI context
/// - other frontends (HTTP, tests, batch jobs) can construct options programmatically
#[derive(Debug, Clone, Default)]
pub struct Opts {
    /// The encoding every segment in a batch is written in.
    pub format: AudioFormat,

    /// Constant bitrate used when `format` is MP3. Ignored for WAV.
    pub mp3_bitrate: Mp3Bitrate,

    /// File naming for archives and on-disk output.
    pub naming: NamingScheme,
}

impl Opts {
    /// The same options with a different output format.
    pub fn with_format(&self, format: AudioFormat) -> Self {
        Self {
            format,
            ..self.clone()
        }
    }
}
