mod health;
mod metrics;
mod scan;

pub use health::{health_handler, liveness_handler, readiness_handler};
pub use metrics::metrics_handler;
pub use scan::scan_handler;

use axum::{
    Router,
    extract::{ConnectInfo, DefaultBodyLimit, Request},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::client_ip::ClientIp;
use crate::state::AppState;

// health checks and scrapes would drown out real traffic
const UNLOGGED_PATHS: [&str; 3] = ["/actuator", "/metrics", "/health"];

pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/actuator/health/liveness", get(liveness_handler))
        .route("/actuator/health/readiness", get(readiness_handler))
        .route("/scan", post(scan_handler))
        .route("/metrics", get(metrics_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

// Request log line: client, method, path, status and latency
async fn log_requests(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    if UNLOGGED_PATHS.iter().any(|prefix| path.starts_with(prefix)) {
        return next.run(request).await;
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = ClientIp::resolve(request.headers(), peer);
    let method = request.method().clone();
    let start_time = Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        client = %client.0,
        %method,
        %path,
        status = response.status().as_u16(),
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "request finished"
    );
    response
}
