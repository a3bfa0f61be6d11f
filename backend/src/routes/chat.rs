//! OpenAI-compatible chat completions.

use std::sync::Arc;

use axum::{
    extract::State,
    http::header::{HeaderName, CACHE_CONTROL},
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    routing::post,
    Extension, Json, Router,
};
use gpu_cloud_common::ChatCompletionRequest;

use crate::auth::Credential;
use crate::error::Result;
use crate::extract::ApiJson;
use crate::AppState;

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// POST /v1/chat/completions
///
/// Non-streaming requests get one JSON body. Streaming requests get the
/// complete frame sequence as server-sent events, ending with `[DONE]`.
async fn chat_completions(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Credential>,
    ApiJson(request): ApiJson<ChatCompletionRequest>,
) -> Result<Response> {
    state.credentials.touch(&caller.id).await;

    if !request.is_stream() {
        let response = state.inference.complete(&caller.id, &request).await?;
        return Ok(Json(response).into_response());
    }

    let frames = state.inference.stream(&caller.id, &request).await?;
    let events = frames
        .into_iter()
        .map(|frame| frame.data().map(|data| Event::default().data(data)));

    Ok((
        [(CACHE_CONTROL, "no-cache"), (X_ACCEL_BUFFERING, "no")],
        Sse::new(tokio_stream::iter(events)),
    )
        .into_response())
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/v1/chat/completions", post(chat_completions))
}
