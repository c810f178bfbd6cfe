/// Health check endpoints for liveness and readiness probes
///
/// Readiness requires the database to answer. A cache failure only degrades
/// the service, since every cached value can be recomputed.
use crate::{context::AppContext, metrics};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Health status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Overall status: "healthy", "degraded", or "unhealthy"
    pub status: String,
    pub version: String,
    pub uptime_seconds: f64,
    pub checks: Vec<ComponentHealth>,
}

/// Health status of individual component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: String,
    pub backend: String,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Build health check routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health_detailed))
        .route("/health/live", get(liveness_probe))
        .route("/health/ready", get(readiness_probe))
        .route("/metrics", get(metrics_endpoint))
}

/// Liveness probe; answering at all means alive
pub async fn liveness_probe() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "alive",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Readiness probe
pub async fn readiness_probe(
    State(ctx): State<AppContext>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if let Err(e) = ctx.db.ping().await {
        tracing::warn!(error = %e, "readiness_probe_failed: database check failed");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(Json(serde_json::json!({
        "status": "ready",
        "version": env!("CARGO_PKG_VERSION")
    })))
}

/// Component-level health
pub async fn health_detailed(State(ctx): State<AppContext>) -> (StatusCode, Json<HealthStatus>) {
    let checks = vec![check_database(&ctx).await, check_cache(&ctx).await];
    let overall_status = determine_overall_status(&checks);

    let status_code = match overall_status {
        "unhealthy" => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };

    (
        status_code,
        Json(HealthStatus {
            status: overall_status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: metrics::uptime_seconds(),
            checks,
        }),
    )
}

/// Prometheus text exposition
pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render_metrics(),
    )
}

async fn check_database(ctx: &AppContext) -> ComponentHealth {
    let start = Instant::now();
    let result = ctx.db.ping().await;

    ComponentHealth {
        name: "database".to_string(),
        status: if result.is_ok() { "healthy" } else { "unhealthy" }.to_string(),
        backend: ctx.db.backend_name().to_string(),
        response_time_ms: start.elapsed().as_millis() as u64,
        error: result.err().map(|_| "database unreachable".to_string()),
    }
}

async fn check_cache(ctx: &AppContext) -> ComponentHealth {
    let start = Instant::now();
    let result = ctx.cache.ping().await;

    ComponentHealth {
        name: "cache".to_string(),
        status: if result.is_ok() { "healthy" } else { "degraded" }.to_string(),
        backend: ctx.cache.backend_name().to_string(),
        response_time_ms: start.elapsed().as_millis() as u64,
        error: result.err().map(|_| "cache unreachable".to_string()),
    }
}

/// Determine overall health status from individual checks
fn determine_overall_status(checks: &[ComponentHealth]) -> &'static str {
    if checks.iter().any(|c| c.status == "unhealthy") {
        "unhealthy"
    } else if checks.iter().any(|c| c.status == "degraded") {
        "degraded"
    } else {
        "healthy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(name: &str, status: &str) -> ComponentHealth {
        ComponentHealth {
            name: name.to_string(),
            status: status.to_string(),
            backend: "sqlite".to_string(),
            response_time_ms: 1,
            error: None,
        }
    }

    #[test]
    fn test_determine_overall_status() {
        assert_eq!(
            determine_overall_status(&[component("database", "healthy"), component("cache", "healthy")]),
            "healthy"
        );
        assert_eq!(
            determine_overall_status(&[component("database", "healthy"), component("cache", "degraded")]),
            "degraded"
        );
        assert_eq!(
            determine_overall_status(&[component("database", "unhealthy"), component("cache", "degraded")]),
            "unhealthy"
        );
    }
}
