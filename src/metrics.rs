/// Metrics and telemetry for the wiki service
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - HTTP request counts and latencies
/// - Search queries by backend and outcome
/// - Cache hit/miss rates
/// - Admin actions
use axum::{extract::Request, middleware::Next, response::Response};
use lazy_static::lazy_static;
use prometheus::{
    register_gauge, register_histogram_vec, register_int_counter_vec, Encoder, Gauge,
    HistogramVec, IntCounterVec, TextEncoder,
};
use std::time::Instant;

lazy_static! {
    // ========== HTTP Metrics ==========

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .expect("metric can be registered");

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("metric can be registered");

    // ========== Search Metrics ==========

    /// Search queries by backend and outcome
    pub static ref SEARCH_QUERIES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "search_queries_total",
        "Total number of search queries",
        &["backend", "outcome"]
    )
    .expect("metric can be registered");

    // ========== Cache Metrics ==========

    /// Cache hits by backend
    pub static ref CACHE_HITS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "cache_hits_total",
        "Total number of cache hits",
        &["backend"]
    )
    .expect("metric can be registered");

    /// Cache misses by backend
    pub static ref CACHE_MISSES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "cache_misses_total",
        "Total number of cache misses",
        &["backend"]
    )
    .expect("metric can be registered");

    // ========== Admin Metrics ==========

    pub static ref ADMIN_ACTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "admin_actions_total",
        "Total number of admin actions",
        &["action"]
    )
    .expect("metric can be registered");

    // ========== System Metrics ==========

    /// Application uptime in seconds
    pub static ref UPTIME_SECONDS: Gauge = register_gauge!(
        "uptime_seconds",
        "Application uptime in seconds"
    )
    .expect("metric can be registered");

    static ref STARTED_AT: Instant = Instant::now();
}

/// Pin the uptime origin to process start
pub fn init() {
    lazy_static::initialize(&STARTED_AT);
}

/// Seconds since `init`, also published as the uptime gauge
pub fn uptime_seconds() -> f64 {
    let uptime = STARTED_AT.elapsed().as_secs_f64();
    UPTIME_SECONDS.set(uptime);
    uptime
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    uptime_seconds();

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration);
}

/// Record a search query
pub fn record_search(backend: &str, outcome: &str) {
    SEARCH_QUERIES_TOTAL
        .with_label_values(&[backend, outcome])
        .inc();
}

/// Record a cache access
pub fn record_cache_access(backend: &str, hit: bool) {
    if hit {
        CACHE_HITS_TOTAL.with_label_values(&[backend]).inc();
    } else {
        CACHE_MISSES_TOTAL.with_label_values(&[backend]).inc();
    }
}

/// Record an admin action
pub fn record_admin_action(action: &str) {
    ADMIN_ACTIONS_TOTAL.with_label_values(&[action]).inc();
}

/// Collapse numeric path segments so ids don't explode label cardinality
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit()) {
                ":id"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Middleware recording request count and latency
pub async fn track_http_metrics(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());
    let start = Instant::now();

    let response = next.run(request).await;

    record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}
