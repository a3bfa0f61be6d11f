//! Request guards for the authenticated API surface.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::Credential;
use crate::error::ApiError;
use crate::AppState;

/// Middleware that requires a valid `Authorization: Bearer <key>` header.
///
/// The resolved [`Credential`] is stored in the request extensions for the
/// rate limiter and handlers downstream.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    match state.credentials.validate(header).await {
        Some(credential) => {
            request.extensions_mut().insert(credential);
            next.run(request).await
        }
        None => {
            tracing::warn!(path = %request.uri().path(), "Rejected request without a valid API key");
            ApiError::InvalidApiKey.into_response()
        }
    }
}

/// Middleware that applies the per-caller request limit.
///
/// Must run after [`require_api_key`].
pub async fn enforce_rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(caller_id) = request.extensions().get::<Credential>().map(|c| c.id.clone()) else {
        return ApiError::InvalidApiKey.into_response();
    };

    if state.rate_limiter.admit(&caller_id).await {
        next.run(request).await
    } else {
        tracing::warn!(caller_id = %caller_id, "Rate limit exceeded");
        ApiError::RateLimited.into_response()
    }
}
