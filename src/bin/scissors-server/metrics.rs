use std::sync::OnceLock;
use std::time::Instant;

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::Request;
use axum::http::{HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts as PromOpts, Registry, TextEncoder,
};

use scissors::{AudioFormat, Stage};

struct Metrics {
    registry: Registry,
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    segments_encoded_total: IntCounterVec,
    split_failures_total: IntCounterVec,
}

static METRICS: OnceLock<Metrics> = OnceLock::new();

fn metrics() -> &'static Metrics {
    METRICS.get_or_init(|| {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            PromOpts::new(
                "scissors_http_requests_total",
                "Total HTTP requests served by scissors-server.",
            ),
            &["route", "status"],
        )
        .expect("metrics definition must be valid");

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "scissors_http_request_duration_seconds",
                "HTTP request latency in seconds.",
            )
            .buckets(vec![0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0]),
            &["route"],
        )
        .expect("metrics definition must be valid");

        let segments_encoded_total = IntCounterVec::new(
            PromOpts::new(
                "scissors_segments_encoded_total",
                "Clips encoded, by output format.",
            ),
            &["format"],
        )
        .expect("metrics definition must be valid");

        let split_failures_total = IntCounterVec::new(
            PromOpts::new(
                "scissors_split_failures_total",
                "Failed split requests, by pipeline stage.",
            ),
            &["stage"],
        )
        .expect("metrics definition must be valid");

        for collector in [
            Box::new(http_requests_total.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(http_request_duration_seconds.clone()),
            Box::new(segments_encoded_total.clone()),
            Box::new(split_failures_total.clone()),
        ] {
            registry.register(collector).expect("metrics must register");
        }

        Metrics {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            segments_encoded_total,
            split_failures_total,
        }
    })
}

pub fn init() {
    let _ = metrics();
}

pub fn record_segments(format: AudioFormat, count: usize) {
    metrics()
        .segments_encoded_total
        .with_label_values(&[format.extension()])
        .inc_by(count as u64);
}

/// `stage` is `None` for failures outside the pipeline (bad query, archive mismatch...).
pub fn record_failure(stage: Option<Stage>) {
    let label = stage.map_or_else(|| "request".to_owned(), |s| s.to_string());
    metrics()
        .split_failures_total
        .with_label_values(&[label.as_str()])
        .inc();
}

pub async fn prometheus_metrics() -> Response {
    let families = metrics().registry.gather();
    let mut buf = Vec::new();
    if TextEncoder::new().encode(&families, &mut buf).is_err() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "failed to encode metrics",
        )
            .into_response();
    }

    (
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
        )],
        buf,
    )
        .into_response()
}

pub async fn track_http_metrics(req: Request<Body>, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());

    if route == "/metrics" || route == "/healthz" {
        return next.run(req).await;
    }

    let start = Instant::now();
    let response = next.run(req).await;

    let status = response.status().as_u16().to_string();
    metrics()
        .http_requests_total
        .with_label_values(&[route.as_str(), status.as_str()])
        .inc();
    metrics()
        .http_request_duration_seconds
        .with_label_values(&[route.as_str()])
        .observe(start.elapsed().as_secs_f64());

    response
}
