//! Model listing backed by ready deployments.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::deployments::DeploymentStatus;
use crate::AppState;

/// Model entry in the response.
#[derive(Debug, Clone, Serialize)]
pub struct ModelObject {
    pub id: String,
    pub object: &'static str,
    pub owned_by: &'static str,
}

/// Compact deployment view listed next to the models.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSummary {
    pub id: String,
    pub name: String,
    pub status: DeploymentStatus,
    pub worker_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelsResponse {
    pub data: Vec<ModelObject>,
    pub deployments: Vec<DeploymentSummary>,
}

/// GET /api/models
async fn list_models(State(state): State<Arc<AppState>>) -> Json<ModelsResponse> {
    let data = state
        .deployments
        .ready_model_names()
        .await
        .into_iter()
        .map(|name| ModelObject {
            id: name,
            object: "model",
            owned_by: "gpu-cloud",
        })
        .collect();

    let deployments = state
        .deployments
        .list()
        .await
        .into_iter()
        .map(|d| DeploymentSummary {
            id: d.id,
            name: d.name,
            status: d.status,
            worker_id: d.worker_id,
        })
        .collect();

    Json(ModelsResponse { data, deployments })
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/models", get(list_models))
}
