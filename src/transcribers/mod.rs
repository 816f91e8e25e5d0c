/// Remote transcription over HTTP.
#[cfg(feature = "http-transcriber")]
pub mod http;
