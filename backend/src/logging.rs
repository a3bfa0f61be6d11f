use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

/// Middleware that logs one line per HTTP request.
///
/// Server errors are logged at WARN, everything else at INFO.
pub async fn request_logger(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let duration_ms = start.elapsed().as_millis() as u64;

    if response.status().is_server_error() {
        tracing::warn!(method = %method, path = %path, status, duration_ms, "HTTP request failed");
    } else {
        tracing::info!(method = %method, path = %path, status, duration_ms, "HTTP request");
    }

    response
}
