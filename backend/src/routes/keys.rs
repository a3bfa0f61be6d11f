//! API key management (`/api/keys`).

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Data;
use crate::auth::Credential;
use crate::error::{ApiError, Result};
use crate::extract::ApiJson;
use crate::AppState;

#[derive(Deserialize)]
struct CreateKeyRequest {
    #[serde(default)]
    name: Option<String>,
}

/// Response for a newly issued key. The plaintext `key` is only ever shown here.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatedKey {
    id: String,
    key: String,
    name: String,
    prefix: String,
    created_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct Deleted {
    deleted: bool,
}

/// GET /api/keys
async fn list_keys(State(state): State<Arc<AppState>>) -> Json<Data<Vec<Credential>>> {
    Json(Data::new(state.credentials.list().await))
}

/// POST /api/keys
async fn create_key(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<CreateKeyRequest>,
) -> Result<(StatusCode, Json<Data<CreatedKey>>)> {
    let name = body.name.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err(ApiError::Validation("name is required".to_string()));
    }

    let issued = state.credentials.issue(name).await?;

    Ok((
        StatusCode::CREATED,
        Json(Data::new(CreatedKey {
            id: issued.id,
            key: issued.secret,
            name: issued.record.name,
            prefix: issued.record.prefix,
            created_at: issued.record.created_at,
        })),
    ))
}

/// GET /api/keys/:id
async fn get_key(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<Data<Credential>>> {
    state
        .credentials
        .get(&id)
        .await
        .map(|credential| Json(Data::new(credential)))
        .ok_or_else(|| ApiError::NotFound("API key not found".to_string()))
}

/// DELETE /api/keys/:id
async fn revoke_key(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Data<Deleted>>> {
    if state.credentials.revoke(&id).await {
        Ok(Json(Data::new(Deleted { deleted: true })))
    } else {
        Err(ApiError::NotFound("API key not found".to_string()))
    }
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/keys", get(list_keys).post(create_key))
        .route("/api/keys/:id", get(get_key).delete(revoke_key))
}
