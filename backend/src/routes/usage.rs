//! Usage reporting (`/api/usage`).

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::Data;
use crate::error::{ApiError, Result};
use crate::extract::ApiQuery;
use crate::usage::{UsageEntry, UsageSummary};
use crate::AppState;

const DEFAULT_HISTORY_LIMIT: usize = 100;
const MAX_HISTORY_LIMIT: usize = 500;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageQuery {
    key_id: Option<String>,
    since: Option<String>,
    limit: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UsageReport {
    summary: UsageSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    all_keys_summary: Option<UsageSummary>,
}

#[derive(Serialize)]
struct UsageHistory {
    history: Vec<UsageEntry>,
}

/// Parse a `since` bound given as RFC 3339 or a bare `YYYY-MM-DD` date (UTC midnight).
fn parse_since(raw: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| Some(Utc.from_utc_datetime(&midnight)))
        .ok_or_else(|| {
            ApiError::Validation("since must be an RFC 3339 timestamp or a YYYY-MM-DD date".to_string())
        })
}

/// Entries to return from history. Zero asks for everything up to the cap.
fn history_limit(requested: Option<usize>) -> usize {
    match requested {
        None => DEFAULT_HISTORY_LIMIT,
        Some(0) => MAX_HISTORY_LIMIT,
        Some(n) => n.min(MAX_HISTORY_LIMIT),
    }
}

/// GET /api/usage
async fn usage_summary(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<UsageQuery>,
) -> Result<Json<Data<UsageReport>>> {
    let since = parse_since(query.since.as_deref())?;
    let key_id = query.key_id.as_deref();

    let summary = state.usage.summarize(key_id, since).await;
    let all_keys_summary = match key_id {
        Some(_) => None,
        None => Some(summary),
    };

    Ok(Json(Data::new(UsageReport {
        summary,
        all_keys_summary,
    })))
}

/// GET /api/usage/history
async fn usage_history(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<UsageQuery>,
) -> Result<Json<Data<UsageHistory>>> {
    let since = parse_since(query.since.as_deref())?;
    let limit = history_limit(query.limit);

    let history = state.usage.history(query.key_id.as_deref(), since, limit).await;
    Ok(Json(Data::new(UsageHistory { history })))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/usage", get(usage_summary))
        .route("/api/usage/history", get(usage_history))
}
