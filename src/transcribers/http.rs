use std::future::Future;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info};

use crate::segments::{SegmentBoundary, validate_boundaries};
use crate::transcriber::Transcriber;
use crate::{Error, Result};

/// Default overall request timeout. Transcribing long recordings is slow.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// A transcriber that POSTs the raw audio to an HTTP endpoint.
///
/// The request body is the encoded audio with its MIME type as `Content-Type`. The endpoint
/// must answer with a JSON array of `{text, start, end}` objects (`start_seconds` /
/// `end_seconds` are accepted too, so a Whisper-style server's JSON output works as-is).
#[derive(Debug, Clone)]
pub struct HttpTranscriber {
    client: reqwest::Client,
    url: String,
}

impl HttpTranscriber {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Transcription(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transcriber for HttpTranscriber {
    fn transcribe(
        &self,
        audio: &[u8],
        mime_type: &str,
    ) -> impl Future<Output = Result<Vec<SegmentBoundary>>> + Send {
        let request = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, mime_type)
            .body(audio.to_vec());
        let url = self.url.clone();
        let audio_len = audio.len();

        async move {
            debug!(%url, bytes = audio_len, "sending audio for transcription");

            let response = request
                .send()
                .await
                .map_err(|e| Error::Transcription(format!("request to {url} failed: {e}")))?;

            let status = response.status();
            let body = response
                .bytes()
                .await
                .map_err(|e| Error::Transcription(format!("failed to read response: {e}")))?;

            if !status.is_success() {
                return Err(Error::Transcription(format!(
                    "{url} returned {status}: {}",
                    String::from_utf8_lossy(&body).trim()
                )));
            }

            let boundaries: Vec<SegmentBoundary> = serde_json::from_slice(&body)
                .map_err(|e| Error::Transcription(format!("malformed response: {e}")))?;
            validate_boundaries(&boundaries)?;

            info!(%url, segments = boundaries.len(), "transcription finished");
            Ok(boundaries)
        }
    }
}
