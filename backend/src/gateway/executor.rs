//! Inference executor abstraction.
//!
//! Workers hand each job's payload to an [`InferenceExecutor`]. The gateway
//! ships with [`SimulatedExecutor`], a deterministic stand-in that produces an
//! echo-style reply and token counts; a real model backend implements the same
//! trait and plugs into the worker pool unchanged.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use gpu_cloud_common::{ChatCompletionRequest, ChatMessage};

/// Token ceiling used when a payload has none (or zero).
pub const DEFAULT_MAX_TOKENS: u32 = 256;

/// Sampling temperature used when a request has none.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Characters of the last message echoed by the simulated reply.
const ECHO_CHARS: usize = 50;

/// What a worker needs to run one completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPayload {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl JobPayload {
    /// Build a payload from a request, normalizing roles and filling defaults.
    pub fn from_request(request: &ChatCompletionRequest) -> Self {
        Self {
            model: request.model_or_default().to_string(),
            messages: request
                .messages
                .iter()
                .map(|m| ChatMessage::new(m.normalized_role(), m.content_or_empty()))
                .collect(),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: request.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        }
    }
}

/// Output of one completed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub content: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub finish_reason: String,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ExecutorError {
    #[error("Inference failed: {0}")]
    Failed(String),

    #[error("Inference panicked: {0}")]
    Panicked(String),
}

/// Runs a payload on a worker.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InferenceExecutor: Send + Sync {
    /// Identifier for logs (e.g., "simulated").
    fn name(&self) -> &'static str;

    async fn execute(&self, worker_id: &str, payload: &JobPayload) -> Result<JobResult, ExecutorError>;
}

/// Deterministic executor standing in for a model runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedExecutor;

impl SimulatedExecutor {
    /// Pure completion logic, exposed for direct testing.
    pub fn simulate(payload: &JobPayload) -> JobResult {
        let prompt_tokens: u32 = payload
            .messages
            .iter()
            .map(|m| estimate_tokens(m.content_or_empty()))
            .sum();

        let last = payload
            .messages
            .last()
            .map(|m| m.content_or_empty())
            .unwrap_or("");
        let echoed: String = last.chars().take(ECHO_CHARS).collect();
        let content = format!("[Simulated GPU response for: \"{}...\"]", echoed);

        let completion_raw = estimate_tokens(&content);
        let ceiling = if payload.max_tokens == 0 {
            DEFAULT_MAX_TOKENS
        } else {
            payload.max_tokens
        };
        let total = (prompt_tokens + completion_raw).min(ceiling);
        let completion_tokens = total.saturating_sub(prompt_tokens);

        JobResult {
            content,
            prompt_tokens,
            completion_tokens,
            finish_reason: "stop".to_string(),
        }
    }
}

#[async_trait]
impl InferenceExecutor for SimulatedExecutor {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn execute(&self, worker_id: &str, payload: &JobPayload) -> Result<JobResult, ExecutorError> {
        tracing::debug!(worker_id = %worker_id, model = %payload.model, "Simulating inference");
        Ok(Self::simulate(payload))
    }
}

/// Roughly four characters per token, rounded up.
fn estimate_tokens(text: &str) -> u32 {
    (text.chars().count() as u32).div_ceil(4)
}
