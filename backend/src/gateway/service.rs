//! Request pipeline from admitted request to assembled response.

use std::sync::Arc;

use tokio::sync::oneshot;

use gpu_cloud_common::{new_completion_id, ChatCompletionRequest, ChatCompletionResponse, ChatMessage};

use super::executor::{ExecutorError, JobPayload, JobResult};
use super::job_queue::{Job, JobQueue};
use super::stream::{self, StreamContext, StreamFrame};
use super::worker_pool::WorkerPool;
use crate::usage::{UsageEntry, UsageLedger};

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("messages array is required")]
    EmptyMessages,
    #[error("{0}")]
    Execution(#[from] ExecutorError),
    #[error("Job was dropped before completion")]
    Dropped,
}

/// A finished job plus the identity of the response it belongs to.
#[derive(Debug, Clone)]
pub struct Completion {
    pub id: String,
    pub created: i64,
    pub model: String,
    pub result: JobResult,
}

impl Completion {
    pub fn into_response(self) -> ChatCompletionResponse {
        let Completion { id, created, model, result } = self;
        ChatCompletionResponse::with_id(
            id,
            created,
            model,
            ChatMessage::new("assistant", result.content),
            Some(result.finish_reason),
        )
        .with_usage(result.prompt_tokens, result.completion_tokens)
    }

    pub fn into_frames(self) -> Vec<StreamFrame> {
        let context = StreamContext {
            id: self.id,
            created: self.created,
            model: self.model,
        };
        stream::encode(&self.result, &context)
    }
}

/// Queues, dispatches and accounts chat completion jobs.
#[derive(Clone)]
pub struct InferenceService {
    queue: Arc<JobQueue>,
    workers: Arc<WorkerPool>,
    usage: Arc<UsageLedger>,
}

impl InferenceService {
    pub fn new(queue: Arc<JobQueue>, workers: Arc<WorkerPool>, usage: Arc<UsageLedger>) -> Self {
        Self { queue, workers, usage }
    }

    /// Run one request for `caller_id` and record its usage.
    ///
    /// Enqueue, dispatch and usage accounting run on a detached task, so a
    /// caller that goes away after admission never strands its job in the
    /// queue. With concurrent callers a dispatch may pick up someone else's
    /// job; ours is then run by the dispatch paired with theirs.
    pub async fn run(&self, caller_id: &str, request: &ChatCompletionRequest) -> Result<Completion, InferenceError> {
        if request.messages.is_empty() {
            return Err(InferenceError::EmptyMessages);
        }

        let payload = JobPayload::from_request(request);
        let model = payload.model.clone();
        let (done_tx, done_rx) = oneshot::channel();

        tokio::spawn(self.clone().process(caller_id.to_string(), payload, done_tx));

        let result = done_rx.await.map_err(|_| InferenceError::Dropped)??;

        Ok(Completion {
            id: new_completion_id(),
            created: chrono::Utc::now().timestamp(),
            model,
            result,
        })
    }

    /// Enqueue a job, owe it one dispatch, and account for it once it finishes.
    async fn process(
        self,
        caller_id: String,
        payload: JobPayload,
        done_tx: oneshot::Sender<Result<JobResult, InferenceError>>,
    ) {
        let model = payload.model.clone();
        let (job, rx) = Job::new(payload);
        let job_id = self.queue.enqueue(job).await;
        tracing::debug!(job_id = %job_id, caller_id = %caller_id, model = %model, "Job enqueued");

        self.workers.dispatch_one().await;

        let outcome = match rx.await {
            Ok(outcome) => outcome.map_err(InferenceError::from),
            Err(_) => Err(InferenceError::Dropped),
        };

        if let Ok(result) = &outcome {
            self.usage
                .record(UsageEntry::new(
                    &caller_id,
                    &model,
                    result.prompt_tokens,
                    result.completion_tokens,
                ))
                .await;
        }

        if done_tx.send(outcome).is_err() {
            tracing::debug!(job_id = %job_id, caller_id = %caller_id, "Caller left before the job finished");
        }
    }

    /// Run a request and build a single JSON response.
    pub async fn complete(
        &self,
        caller_id: &str,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, InferenceError> {
        Ok(self.run(caller_id, request).await?.into_response())
    }

    /// Run a request and build its stream frames.
    pub async fn stream(&self, caller_id: &str, request: &ChatCompletionRequest) -> Result<Vec<StreamFrame>, InferenceError> {
        Ok(self.run(caller_id, request).await?.into_frames())
    }
}
