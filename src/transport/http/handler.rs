//! Routes and endpoint handlers

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{Query, State},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONNECTION, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use futures::StreamExt;
use serde::Deserialize;
use tower::ServiceBuilder;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{debug, warn};

use crate::{
    backend::{RadioBackend, SystemProbe},
    core::{
        error::{TransportError, TransportResult},
        monitor::LinkMetrics,
        reporter::StatusReporter,
        scanner::ScanService,
        throughput::{TransferPolicy, filler_stream, requested_size},
    },
    protocol::{StatusResponse, scan_body, stations_body},
};

/// Single-page diagnostic UI
pub const INDEX_HTML: &str = include_str!("../../../assets/index.html");

const NOT_FOUND_BODY: &str = "404: Not Found";

/// Everything the endpoints read from
pub struct DiagnosticState<R: RadioBackend, P: SystemProbe> {
    radio: Arc<R>,
    reporter: StatusReporter<R, P>,
    scanner: ScanService<R>,
    transfer: TransferPolicy,
}

impl<R: RadioBackend, P: SystemProbe> DiagnosticState<R, P> {
    pub fn new(
        radio: Arc<R>,
        probe: Arc<P>,
        metrics: Arc<LinkMetrics>,
        transfer: TransferPolicy,
    ) -> Self {
        Self {
            reporter: StatusReporter::new(radio.clone(), probe, metrics),
            scanner: ScanService::new(radio.clone()),
            radio,
            transfer,
        }
    }
}

type AppState<R, P> = State<Arc<DiagnosticState<R, P>>>;

/// Build the application router
///
/// Unknown paths and known paths with the wrong method both get the plain
/// text 404. Every response is marked uncacheable and closes the connection.
pub fn router<R: RadioBackend, P: SystemProbe>(state: Arc<DiagnosticState<R, P>>) -> Router {
    Router::new()
        .route("/", get(root).fallback(not_found))
        .route("/api/status", get(status::<R, P>).fallback(not_found))
        .route("/api/scan", get(scan::<R, P>).fallback(not_found))
        .route("/api/ping", get(ping::<R, P>).fallback(not_found))
        .route("/api/download", get(download::<R, P>).fallback(not_found))
        .route("/api/upload", post(upload).fallback(not_found))
        .route("/api/clients", get(clients::<R, P>).fallback(not_found))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(SetResponseHeaderLayer::overriding(
                    CACHE_CONTROL,
                    HeaderValue::from_static("no-store"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    CONNECTION,
                    HeaderValue::from_static("close"),
                )),
        )
        .with_state(state)
}

impl IntoResponse for TransportError {
    fn into_response(self) -> Response {
        warn!("Request failed: {}", self);
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

fn json_bytes(body: Vec<u8>) -> Response {
    (
        [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        body,
    )
        .into_response()
}

async fn root() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn status<R: RadioBackend, P: SystemProbe>(
    State(state): AppState<R, P>,
) -> Json<StatusResponse> {
    Json(StatusResponse::from(state.reporter.snapshot().await))
}

async fn scan<R: RadioBackend, P: SystemProbe>(
    State(state): AppState<R, P>,
) -> TransportResult<Response> {
    let body = state.scanner.scan_with(scan_body).await?;
    Ok(json_bytes(body))
}

async fn ping<R: RadioBackend, P: SystemProbe>(State(state): AppState<R, P>) -> String {
    state.reporter.ticks_ms().to_string()
}

#[derive(Debug, Deserialize)]
struct DownloadParams {
    size: Option<String>,
}

async fn download<R: RadioBackend, P: SystemProbe>(
    State(state): AppState<R, P>,
    Query(params): Query<DownloadParams>,
) -> Response {
    let size = requested_size(params.size.as_deref());
    debug!(size, "Starting download");

    (
        [
            (
                CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            ),
            (CONTENT_LENGTH, HeaderValue::from(size)),
        ],
        Body::from_stream(filler_stream(size, &state.transfer)),
    )
        .into_response()
}

/// Read and drop the request body, however it is framed
async fn upload(body: Body) -> &'static str {
    let mut data = body.into_data_stream();
    let mut received = 0u64;

    while let Some(chunk) = data.next().await {
        match chunk {
            Ok(bytes) => received += bytes.len() as u64,
            Err(e) => {
                debug!("Upload ended early: {}", e);
                break;
            }
        }
    }

    debug!(received, "Upload discarded");
    "OK"
}

async fn clients<R: RadioBackend, P: SystemProbe>(
    State(state): AppState<R, P>,
) -> TransportResult<Response> {
    let stations = state.radio.stations().await.unwrap_or_else(|e| {
        warn!("Failed to list stations: {}", e);
        Vec::new()
    });

    Ok(json_bytes(stations_body(&stations)?))
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, NOT_FOUND_BODY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockRadioBackend, MockSystemProbe};
    use crate::core::monitor::EventMonitor;
    use crate::core::types::{AuthMode, MacAddress, RadioEvent, Station, WifiNetwork};
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    struct Fixture {
        radio: Arc<MockRadioBackend>,
        metrics: Arc<LinkMetrics>,
        app: Router,
    }

    fn fixture() -> Fixture {
        let radio = Arc::new(MockRadioBackend::new());
        let metrics = Arc::new(LinkMetrics::new());
        let state = DiagnosticState::new(
            radio.clone(),
            Arc::new(MockSystemProbe::new()),
            metrics.clone(),
            TransferPolicy::default(),
        );
        Fixture {
            radio,
            metrics,
            app: router(Arc::new(state)),
        }
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Body) -> (Response, Vec<u8>) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(body)
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();

        let (parts, body) = response.into_parts();
        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        (Response::from_parts(parts, Body::empty()), bytes.to_vec())
    }

    async fn get(app: &Router, uri: &str) -> (Response, Vec<u8>) {
        send(app, Method::GET, uri, Body::empty()).await
    }

    fn header<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
        response.headers().get(name)?.to_str().ok()
    }

    #[tokio::test]
    async fn test_download_declared_length_and_fill() {
        let f = fixture();
        let (response, body) = get(&f.app, "/api/download?size=100").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header(&response, "content-length"), Some("100"));
        assert_eq!(
            header(&response, "content-type"),
            Some("application/octet-stream")
        );
        assert_eq!(body, vec![0xAA; 100]);
    }

    #[tokio::test]
    async fn test_download_default_size() {
        let f = fixture();
        let (response, body) = get(&f.app, "/api/download").await;

        assert_eq!(header(&response, "content-length"), Some("1048576"));
        assert_eq!(body.len(), 1_048_576);
    }

    #[tokio::test]
    async fn test_download_non_numeric_size() {
        let f = fixture();
        let (response, body) = get(&f.app, "/api/download?size=lots").await;

        assert_eq!(header(&response, "content-length"), Some("0"));
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_upload_replies_ok() {
        let f = fixture();
        let (response, body) = send(
            &f.app,
            Method::POST,
            "/api/upload",
            Body::from(vec![0u8; 64 * 1024]),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body, b"OK");
    }

    #[tokio::test]
    async fn test_upload_streamed_body() {
        let f = fixture();
        let chunks = futures::stream::iter(
            (0..16).map(|_| Ok::<_, std::convert::Infallible>(vec![7u8; 4096])),
        );
        let (_, body) = send(&f.app, Method::POST, "/api/upload", Body::from_stream(chunks)).await;
        assert_eq!(body, b"OK");
    }

    #[tokio::test]
    async fn test_upload_empty_body() {
        let f = fixture();
        let (_, body) = send(&f.app, Method::POST, "/api/upload", Body::empty()).await;
        assert_eq!(body, b"OK");
    }

    #[tokio::test]
    async fn test_status_reports_disconnects() {
        let f = fixture();
        let monitor = EventMonitor::new(f.metrics.clone());
        for _ in 0..3 {
            monitor.on_event(&RadioEvent::Disconnected);
        }

        let (response, body) = get(&f.app, "/api/status").await;
        let status: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(header(&response, "content-type"), Some("application/json"));
        assert_eq!(status["disconnects"], 3);
        assert_eq!(status["ip"], "192.168.4.1");
        assert_eq!(status["cpu_freq"], 240);
        assert!(status.get("tcp_rexmit").is_none());
    }

    #[tokio::test]
    async fn test_status_ignores_query() {
        let f = fixture();
        let (response, _) = get(&f.app, "/api/status?verbose=1").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_scan_lists_networks_and_releases() {
        let f = fixture();
        f.radio
            .set_scan_results(vec![
                WifiNetwork {
                    ssid: "Lab".into(),
                    rssi: -45,
                    channel: 1,
                    auth: AuthMode::Wpa2Psk,
                },
                WifiNetwork {
                    ssid: "Guest".into(),
                    rssi: -77,
                    channel: 11,
                    auth: AuthMode::Open,
                },
            ])
            .await;

        let (response, body) = get(&f.app, "/api/scan").await;
        let networks: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(header(&response, "content-type"), Some("application/json"));
        assert_eq!(networks.as_array().unwrap().len(), 2);
        assert_eq!(networks[0]["ssid"], "Lab");
        assert_eq!(networks[1]["auth"], "Open");
        assert_eq!(f.radio.release_count().await, 1);
    }

    #[tokio::test]
    async fn test_clients_empty_roster() {
        let f = fixture();
        let (_, body) = get(&f.app, "/api/clients").await;
        assert_eq!(body, b"[]");
    }

    #[tokio::test]
    async fn test_clients_roster() {
        let f = fixture();
        f.radio
            .set_stations(vec![Station {
                mac: MacAddress::new([0x3c, 0x22, 0xfb, 0x10, 0x20, 0x30]),
                rssi: -51,
            }])
            .await;

        let (_, body) = get(&f.app, "/api/clients").await;
        assert_eq!(
            String::from_utf8(body).unwrap(),
            r#"[{"mac":"3C:22:FB:10:20:30","rssi":-51}]"#
        );
    }

    #[tokio::test]
    async fn test_ping_returns_ticks() {
        let f = fixture();
        let ticks = |body: Vec<u8>| -> u64 { String::from_utf8(body).unwrap().parse().unwrap() };

        let (response, first) = get(&f.app, "/api/ping").await;
        let (_, second) = get(&f.app, "/api/ping").await;

        assert!(header(&response, "content-type").unwrap().starts_with("text/plain"));
        assert!(ticks(second) >= ticks(first));
    }

    #[tokio::test]
    async fn test_root_serves_page() {
        let f = fixture();
        let (response, body) = get(&f.app, "/").await;

        assert!(header(&response, "content-type").unwrap().starts_with("text/html"));
        assert_eq!(body, INDEX_HTML.as_bytes());
    }

    #[tokio::test]
    async fn test_every_response_closes_and_is_uncached() {
        let f = fixture();
        for uri in ["/", "/api/ping", "/nope"] {
            let (response, _) = get(&f.app, uri).await;
            assert_eq!(header(&response, "connection"), Some("close"));
            assert_eq!(header(&response, "cache-control"), Some("no-store"));
        }
    }

    #[tokio::test]
    async fn test_not_found() {
        let f = fixture();
        for (method, uri) in [
            (Method::GET, "/foo"),
            (Method::POST, "/api/status"),
            (Method::GET, "/api/upload"),
            (Method::DELETE, "/"),
            (Method::PUT, "/api/download"),
            (Method::PATCH, "/api/clients"),
        ] {
            let (response, body) = send(&f.app, method, uri, Body::empty()).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
            assert_eq!(body, b"404: Not Found");
        }
    }
}
