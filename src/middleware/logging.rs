//! Request logging middleware.
//!
//! Logs every HTTP request with method, path, status code, client and latency.

use crate::middleware::rate_limit::client_identifier;
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::Request,
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::time::Instant;
use tracing::{info, warn, Instrument};

/// Logs at INFO for completed requests, WARN for 5xx.
///
/// The peer address is optional so the router also works under `oneshot`.
pub async fn request_logging(request: Request<Body>, next: Next) -> Response {
    let path = request.uri().path().to_string();

    // Health probes are too noisy to log
    if path == "/health" {
        return next.run(request).await;
    }

    let method = request.method().clone();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_identifier(request.headers(), peer);

    let span = tracing::info_span!("http_request", method = %method, path = %path);
    let start = Instant::now();
    let response = next.run(request).instrument(span).await;

    let latency_ms = start.elapsed().as_millis() as u64;
    let status = response.status().as_u16();

    if status >= 500 {
        warn!(
            method = %method,
            path = %path,
            status,
            latency_ms,
            client = %client,
            "Request failed (5xx)"
        );
    } else if status >= 400 {
        info!(
            method = %method,
            path = %path,
            status,
            latency_ms,
            client = %client,
            "Request completed (4xx)"
        );
    } else {
        info!(method = %method, path = %path, status, latency_ms, "Request completed");
    }

    response
}
