use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Deserialize;

use super::Data;
use crate::deployments::Deployment;
use crate::error::{ApiError, Result};
use crate::extract::ApiJson;
use crate::AppState;

#[derive(Deserialize)]
struct CreateDeploymentRequest {
    #[serde(default)]
    name: Option<String>,
}

/// GET /api/deployments
async fn list_deployments(State(state): State<Arc<AppState>>) -> Json<Data<Vec<Deployment>>> {
    Json(Data::new(state.deployments.list().await))
}

/// POST /api/deployments
async fn create_deployment(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<CreateDeploymentRequest>,
) -> Result<(StatusCode, Json<Data<Deployment>>)> {
    let name = body.name.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err(ApiError::Validation("name is required".to_string()));
    }

    let deployment = state.deployments.create(name).await;
    Ok((StatusCode::CREATED, Json(Data::new(deployment))))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/deployments", get(list_deployments).post(create_deployment))
}
