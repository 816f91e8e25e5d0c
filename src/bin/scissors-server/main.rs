use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::middleware::from_fn;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnResponse, TraceLayer};
use tracing::{Level, error, info, warn};

mod metrics;

use scissors::segments::boundaries_from_json;
use scissors::{
    AudioFormat, CancellationToken, Error, HttpTranscriber, Mp3Bitrate, NamingScheme, Opts,
    SegmentBoundary, Splitter, StaticTranscriber, Transcriber,
};

const MAX_PREFIX_LEN: usize = 64;

#[derive(Parser, Debug)]
#[command(name = "scissors-server")]
#[command(about = "HTTP server that cuts uploads into per-sentence clips")]
struct Params {
    /// Transcription endpoint used when a request carries no `boundaries` parameter.
    #[arg(long = "transcriber-url")]
    transcriber_url: Option<String>,

    /// Host interface to bind to.
    #[arg(long = "host", default_value = "127.0.0.1")]
    host: String,

    /// TCP port to listen on.
    #[arg(long = "port", default_value_t = 8080)]
    port: u16,

    /// Maximum request body size (bytes).
    #[arg(long = "max-bytes", default_value_t = 100 * 1024 * 1024)]
    max_bytes: usize,

    /// Per-request timeout in seconds, transcription included.
    #[arg(long = "request-timeout-secs", default_value_t = 900)]
    request_timeout_secs: u64,
}

#[derive(Clone)]
struct AppState {
    transcriber: Option<HttpTranscriber>,
}

#[derive(Debug, Default, Deserialize)]
struct SplitQuery {
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    bitrate: Option<String>,
    #[serde(default)]
    prefix: Option<String>,
    /// JSON array of `{text, start, end}`; overrides the configured transcriber.
    #[serde(default)]
    boundaries: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug)]
struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::Decode(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Error::Transcription(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

/// Where one request's boundaries come from.
enum RequestTranscriber {
    Fixed(StaticTranscriber),
    Remote(HttpTranscriber),
}

impl Transcriber for RequestTranscriber {
    fn transcribe(
        &self,
        audio: &[u8],
        mime_type: &str,
    ) -> impl Future<Output = scissors::Result<Vec<SegmentBoundary>>> + Send {
        async move {
            match self {
                RequestTranscriber::Fixed(t) => t.transcribe(audio, mime_type).await,
                RequestTranscriber::Remote(t) => t.transcribe(audio, mime_type).await,
            }
        }
    }
}

#[tokio::main]
async fn main() {
    scissors::init_logging();

    if let Err(err) = run().await {
        error!(error = ?err, "scissors-server failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let params = Params::parse();
    metrics::init();

    let addr: SocketAddr = format!("{}:{}", params.host, params.port)
        .parse()
        .context("invalid host/port bind address")?;

    let transcriber = params
        .transcriber_url
        .as_deref()
        .map(HttpTranscriber::new)
        .transpose()
        .context("failed to initialize the transcriber client")?;
    if transcriber.is_none() {
        warn!("no --transcriber-url; requests must carry a `boundaries` parameter");
    }

    let app = app(
        AppState { transcriber },
        params.max_bytes,
        Duration::from_secs(params.request_timeout_secs),
    );

    let listener = TcpListener::bind(addr).await.context("bind failed")?;
    info!(%addr, "listening");
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

fn app(state: AppState, max_bytes: usize, timeout: Duration) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics::prometheus_metrics))
        .route("/v1/split", post(split))
        .route_layer(from_fn(metrics::track_http_metrics))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_bytes))
        .layer(TimeoutLayer::new(timeout))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_response(DefaultOnResponse::new().level(Level::INFO))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}

async fn root() -> &'static str {
    "scissors-server: POST /v1/split?format=wav|mp3&bitrate=128&prefix=sentence \
     (raw audio body, Content-Type set to its MIME type) -> application/zip"
}

async fn healthz() -> &'static str {
    "ok"
}

async fn split(
    State(state): State<AppState>,
    Query(query): Query<SplitQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> std::result::Result<Response, AppError> {
    let (opts, transcriber) = match parse_request(&state, &query, &body) {
        Ok(v) => v,
        Err(err) => {
            metrics::record_failure(None);
            return Err(err);
        }
    };

    let mime_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_owned();

    let format = opts.format;
    let prefix = opts.naming.prefix.clone();
    let splitter = Splitter::new(transcriber, opts);

    let result = async {
        let split = splitter
            .split(&body, &mime_type, &CancellationToken::new())
            .await?;
        let archive = splitter.archive(&split.segments, format).await?;
        Ok::<_, Error>((split.segments.len(), archive))
    }
    .await;

    let (count, archive) = match result {
        Ok(v) => v,
        Err(err) => {
            metrics::record_failure(err.stage());
            let err = AppError::from(err);
            if err.status.is_server_error() {
                error!(status = %err.status, message = %err.message, "split failed");
            }
            return Err(err);
        }
    };
    metrics::record_segments(format, count);

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{prefix}.zip\""))
        .map_err(|e| AppError::bad_request(format!("invalid prefix: {e}")))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/zip")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        [("x-scissors-segments", count.to_string())],
        archive,
    )
        .into_response())
}

fn parse_request(
    state: &AppState,
    query: &SplitQuery,
    body: &[u8],
) -> std::result::Result<(Opts, RequestTranscriber), AppError> {
    if body.is_empty() {
        return Err(AppError::bad_request("request body was empty"));
    }

    let opts = Opts {
        format: parse_format(query.format.as_deref())?,
        mp3_bitrate: parse_bitrate(query.bitrate.as_deref())?,
        naming: parse_prefix(query.prefix.as_deref())?,
    };

    let transcriber = match (&query.boundaries, &state.transcriber) {
        (Some(raw), _) => {
            let boundaries = boundaries_from_json(raw.as_bytes())
                .map_err(|e| AppError::bad_request(format!("invalid boundaries: {e}")))?;
            RequestTranscriber::Fixed(StaticTranscriber::new(boundaries))
        }
        (None, Some(remote)) => RequestTranscriber::Remote(remote.clone()),
        (None, None) => {
            return Err(AppError::bad_request(
                "no transcriber configured; pass a `boundaries` query parameter",
            ));
        }
    };

    Ok((opts, transcriber))
}

fn parse_format(raw: Option<&str>) -> std::result::Result<AudioFormat, AppError> {
    match raw {
        None => Ok(AudioFormat::Wav),
        Some(raw) => raw
            .parse()
            .map_err(|e: Error| AppError::bad_request(e.to_string())),
    }
}

fn parse_bitrate(raw: Option<&str>) -> std::result::Result<Mp3Bitrate, AppError> {
    let Some(raw) = raw else {
        return Ok(Mp3Bitrate::DEFAULT);
    };
    let kbps: u32 = raw
        .trim()
        .parse()
        .map_err(|_| AppError::bad_request(format!("bitrate '{raw}' is not a number")))?;
    Mp3Bitrate::from_kbps(kbps).map_err(|e| AppError::bad_request(e.to_string()))
}

fn parse_prefix(raw: Option<&str>) -> std::result::Result<NamingScheme, AppError> {
    let Some(raw) = raw else {
        return Ok(NamingScheme::default());
    };
    let valid = !raw.is_empty()
        && raw.len() <= MAX_PREFIX_LEN
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(AppError::bad_request(format!(
            "invalid prefix '{raw}' (1-{MAX_PREFIX_LEN} chars of [A-Za-z0-9_-])"
        )));
    }
    Ok(NamingScheme::new(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use scissors::AudioBuffer;
    use scissors::wav::encode_wav;

    fn wav_body() -> Bytes {
        let ch = (0..16_000).map(|i| 0.2 * (i as f32 * 0.03).sin()).collect();
        let buffer = AudioBuffer::new(16_000, vec![ch]).expect("valid buffer");
        Bytes::from(encode_wav(&buffer))
    }

    fn wav_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("audio/wav"));
        headers
    }

    fn no_transcriber() -> State<AppState> {
        State(AppState { transcriber: None })
    }

    #[test]
    fn parse_format_defaults_to_wav() {
        assert!(matches!(parse_format(None), Ok(AudioFormat::Wav)));
        assert!(matches!(parse_format(Some(" MP3 ")), Ok(AudioFormat::Mp3)));
        assert!(parse_format(Some("ogg")).is_err());
    }

    #[test]
    fn parse_bitrate_rejects_unsupported_values() {
        assert!(matches!(parse_bitrate(None), Ok(b) if b.kbps() == 128));
        assert!(matches!(parse_bitrate(Some("192")), Ok(b) if b.kbps() == 192));
        assert!(parse_bitrate(Some("fast")).is_err());

        let err = parse_bitrate(Some("100")).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn parse_prefix_rejects_path_characters() {
        assert!(parse_prefix(Some("take_2")).is_ok());
        assert!(parse_prefix(Some("../etc")).is_err());
        assert!(parse_prefix(Some("")).is_err());
        assert!(parse_prefix(Some("a\"b")).is_err());
    }

    #[test]
    fn errors_map_to_statuses() {
        let status = |e: Error| AppError::from(e).status;
        assert_eq!(status(Error::Decode("x".into())), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(status(Error::Transcription("x".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(status(Error::Archive("x".into())), StatusCode::INTERNAL_SERVER_ERROR);

        let segment = Error::Segment {
            index: 2,
            stage: scissors::Stage::Encode,
            source: Box::new(Error::Encode("lame".into())),
        };
        let err = AppError::from(segment);
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.message.contains("segment 2 failed during encode"));
    }

    #[tokio::test]
    async fn split_returns_a_zip_of_clips() -> anyhow::Result<()> {
        let query = SplitQuery {
            format: Some("mp3".into()),
            prefix: Some("line".into()),
            boundaries: Some(
                r#"[{"text":"a","start":0,"end":0.5},{"text":"b","start":0.5,"end":1}]"#.into(),
            ),
            ..SplitQuery::default()
        };

        let response = split(no_transcriber(), Query(query), wav_headers(), wav_body())
            .await
            .map_err(|e| anyhow::anyhow!(e.message))?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");
        assert_eq!(response.headers()["x-scissors-segments"], "2");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let archive = zip::ZipArchive::new(Cursor::new(body.to_vec()))?;
        assert_eq!(
            archive.file_names().collect::<Vec<_>>(),
            vec!["line-1.mp3", "line-2.mp3"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn split_without_boundaries_or_transcriber_is_bad_request() {
        let err = split(
            no_transcriber(),
            Query(SplitQuery::default()),
            wav_headers(),
            wav_body(),
        )
        .await
        .err()
        .expect("expected AppError");
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn split_of_garbage_is_unsupported_media() {
        let query = SplitQuery {
            boundaries: Some(r#"[{"text":"a","start":0,"end":1}]"#.into()),
            ..SplitQuery::default()
        };
        let err = split(
            no_transcriber(),
            Query(query),
            wav_headers(),
            Bytes::from_static(b"not audio at all"),
        )
        .await
        .err()
        .expect("expected AppError");
        assert_eq!(err.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn empty_body_is_bad_request() {
        let err = split(
            no_transcriber(),
            Query(SplitQuery::default()),
            wav_headers(),
            Bytes::new(),
        )
        .await
        .err()
        .expect("expected AppError");
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("empty"));
    }
}
