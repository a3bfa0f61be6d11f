//! FIFO queue of accepted inference jobs.
//!
//! Each job carries the sending half of a one-shot channel. Whoever dequeues
//! the job owns that sender and resolves it exactly once, with either a
//! result or a failure; the admission path awaits the receiving half.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{oneshot, Mutex};

use super::executor::{ExecutorError, JobPayload, JobResult};

pub type JobOutcome = Result<JobResult, ExecutorError>;

/// A queued inference job.
#[derive(Debug)]
pub struct Job {
    id: String,
    pub payload: JobPayload,
    response_tx: oneshot::Sender<JobOutcome>,
}

impl Job {
    /// Create a job and the receiver its outcome will be delivered to.
    pub fn new(payload: JobPayload) -> (Self, oneshot::Receiver<JobOutcome>) {
        let (tx, rx) = oneshot::channel();
        let job = Self {
            id: String::new(),
            payload,
            response_tx: tx,
        };
        (job, rx)
    }

    /// Id assigned on enqueue. Empty before that.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Resolve the job with a result.
    pub fn complete(self, result: JobResult) {
        self.resolve(Ok(result));
    }

    /// Resolve the job with a failure.
    pub fn fail(self, error: ExecutorError) {
        self.resolve(Err(error));
    }

    fn resolve(self, outcome: JobOutcome) {
        // Receiver dropped means the caller went away; nothing to deliver to.
        if self.response_tx.send(outcome).is_err() {
            tracing::debug!(job_id = %self.id, "Job outcome dropped, caller is gone");
        }
    }
}

/// Unbounded FIFO of pending jobs.
#[derive(Debug, Default)]
pub struct JobQueue {
    jobs: Mutex<VecDeque<Job>>,
    next_id: AtomicU64,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a job and return its id (`job_<n>_<unix millis>`).
    pub async fn enqueue(&self, mut job: Job) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("job_{}_{}", n, chrono::Utc::now().timestamp_millis());
        job.id = id.clone();

        self.jobs.lock().await.push_back(job);
        id
    }

    /// Remove and return the oldest job.
    pub async fn dequeue(&self) -> Option<Job> {
        self.jobs.lock().await.pop_front()
    }

    /// Number of jobs waiting.
    pub async fn depth(&self) -> usize {
        self.jobs.lock().await.len()
    }
}
