//! HTTP surface of the gateway.

pub mod chat;
pub mod deployments;
pub mod health;
pub mod keys;
pub mod models;
pub mod usage;

use std::sync::Arc;

use axum::{http::HeaderValue, middleware, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{enforce_rate_limit, require_api_key};
use crate::config::CorsConfig;
use crate::error::ApiError;
use crate::logging::request_logger;
use crate::AppState;

/// `{"data": ...}` wrapper used by the management endpoints.
#[derive(Debug, Serialize)]
pub struct Data<T> {
    pub data: T,
}

impl<T> Data<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Build the full application router.
///
/// `/health` and `/metrics` are public. Everything under `/api` and `/v1`
/// passes the API key check first and the rate limiter second.
pub fn app(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .merge(keys::router())
        .merge(usage::router())
        .merge(models::router())
        .merge(deployments::router())
        .merge(chat::router())
        .route_layer(middleware::from_fn_with_state(state.clone(), enforce_rate_limit))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .merge(health::router())
        .merge(protected)
        .fallback(not_found)
        .with_state(state.clone())
        .layer(middleware::from_fn(request_logger))
        .layer(cors_layer(&state.config.cors))
        .layer(TraceLayer::new_for_http())
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Not found".to_string())
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if config.allows_any() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .origin_list()
        .into_iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(origins)
}
