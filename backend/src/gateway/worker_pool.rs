//! Logical worker pool that drains the job queue.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::FutureExt;

use super::executor::{ExecutorError, InferenceExecutor};
use super::job_queue::JobQueue;

/// Rotating `worker-<n>` label source.
#[derive(Debug)]
pub struct RoundRobin {
    worker_count: usize,
    cursor: AtomicUsize,
}

impl RoundRobin {
    /// Create a rotation over `worker_count` workers (at least one).
    pub fn new(worker_count: usize) -> Self {
        Self {
            worker_count: worker_count.max(1),
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Return the next worker label and advance.
    pub fn next_worker_id(&self) -> String {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst) % self.worker_count;
        format!("worker-{}", index)
    }
}

/// Dispatches queued jobs to logical workers.
pub struct WorkerPool {
    queue: Arc<JobQueue>,
    executor: Arc<dyn InferenceExecutor>,
    rotation: RoundRobin,
}

impl WorkerPool {
    pub fn new(worker_count: usize, queue: Arc<JobQueue>, executor: Arc<dyn InferenceExecutor>) -> Self {
        Self {
            queue,
            executor,
            rotation: RoundRobin::new(worker_count),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.rotation.worker_count()
    }

    pub fn next_worker_id(&self) -> String {
        self.rotation.next_worker_id()
    }

    /// Run the job at the head of the queue.
    ///
    /// Returns `false` if the queue was empty. Executor errors and panics are
    /// delivered to the job as failures; nothing is retried.
    pub async fn dispatch_one(&self) -> bool {
        let Some(job) = self.queue.dequeue().await else {
            return false;
        };

        let worker_id = self.next_worker_id();
        tracing::debug!(
            job_id = %job.id(),
            worker_id = %worker_id,
            executor = self.executor.name(),
            "Dispatching job"
        );

        let outcome = AssertUnwindSafe(self.executor.execute(&worker_id, &job.payload))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(ExecutorError::Panicked(panic_message(panic.as_ref()))));

        match outcome {
            Ok(result) => job.complete(result),
            Err(e) => {
                tracing::warn!(job_id = %job.id(), worker_id = %worker_id, "Job failed: {}", e);
                job.fail(e);
            }
        }

        true
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::executor::{JobPayload, JobResult, MockInferenceExecutor, SimulatedExecutor};
    use crate::gateway::job_queue::Job;
    use async_trait::async_trait;
    use gpu_cloud_common::ChatMessage;

    fn payload(content: &str) -> JobPayload {
        JobPayload {
            model: "gpt-sim".to_string(),
            messages: vec![ChatMessage::new("user", content)],
            max_tokens: 256,
            temperature: 0.7,
        }
    }

    fn pool(worker_count: usize, executor: Arc<dyn InferenceExecutor>) -> (WorkerPool, Arc<JobQueue>) {
        let queue = Arc::new(JobQueue::new());
        (WorkerPool::new(worker_count, queue.clone(), executor), queue)
    }

    #[test]
    fn test_round_robin_wraps() {
        let rotation = RoundRobin::new(3);
        let ids: Vec<String> = (0..5).map(|_| rotation.next_worker_id()).collect();
        assert_eq!(ids, vec!["worker-0", "worker-1", "worker-2", "worker-0", "worker-1"]);
    }

    #[test]
    fn test_zero_workers_clamped_to_one() {
        let rotation = RoundRobin::new(0);
        assert_eq!(rotation.worker_count(), 1);
        assert_eq!(rotation.next_worker_id(), "worker-0");
        assert_eq!(rotation.next_worker_id(), "worker-0");
    }

    #[tokio::test]
    async fn test_dispatch_on_empty_queue_is_noop() {
        let (pool, _queue) = pool(2, Arc::new(SimulatedExecutor));
        assert!(!pool.dispatch_one().await);
    }

    #[tokio::test]
    async fn test_dispatch_completes_job() {
        let (pool, queue) = pool(2, Arc::new(SimulatedExecutor));
        let (job, rx) = Job::new(payload("Hello"));
        queue.enqueue(job).await;

        assert!(pool.dispatch_one().await);
        assert_eq!(queue.depth().await, 0);

        let result = rx.await.unwrap().unwrap();
        assert_eq!(result, SimulatedExecutor::simulate(&payload("Hello")));
    }

    #[tokio::test]
    async fn test_dispatch_uses_round_robin_workers() {
        let mut executor = MockInferenceExecutor::new();
        executor.expect_name().return_const("mock");
        let mut seq = mockall::Sequence::new();
        for expected in ["worker-0", "worker-1", "worker-0"] {
            executor
                .expect_execute()
                .withf(move |worker_id, _| worker_id.to_string() == expected)
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, p| Ok(SimulatedExecutor::simulate(p)));
        }

        let (pool, queue) = pool(2, Arc::new(executor));
        let mut receivers = Vec::new();
        for _ in 0..3 {
            let (job, rx) = Job::new(payload("hi"));
            queue.enqueue(job).await;
            receivers.push(rx);
        }
        for _ in 0..3 {
            assert!(pool.dispatch_one().await);
        }
        for rx in receivers {
            assert!(rx.await.unwrap().is_ok());
        }
    }

    #[tokio::test]
    async fn test_executor_error_fails_job() {
        let mut executor = MockInferenceExecutor::new();
        executor.expect_name().return_const("mock");
        executor
            .expect_execute()
            .returning(|_, _| Err(ExecutorError::Failed("gpu on fire".to_string())));

        let (pool, queue) = pool(1, Arc::new(executor));
        let (job, rx) = Job::new(payload("hi"));
        queue.enqueue(job).await;

        assert!(pool.dispatch_one().await);
        let outcome = rx.await.unwrap();
        assert!(matches!(outcome, Err(ExecutorError::Failed(msg)) if msg == "gpu on fire"));
    }

    struct PanickingExecutor;

    #[async_trait]
    impl InferenceExecutor for PanickingExecutor {
        fn name(&self) -> &'static str {
            "panicking"
        }

        async fn execute(&self, _worker_id: &str, _payload: &JobPayload) -> Result<JobResult, ExecutorError> {
            panic!("executor exploded")
        }
    }

    #[tokio::test]
    async fn test_executor_panic_fails_job() {
        let (pool, queue) = pool(1, Arc::new(PanickingExecutor));
        let (job, rx) = Job::new(payload("hi"));
        queue.enqueue(job).await;

        assert!(pool.dispatch_one().await);
        let outcome = rx.await.unwrap();
        assert!(matches!(outcome, Err(ExecutorError::Panicked(msg)) if msg == "executor exploded"));
    }
}
