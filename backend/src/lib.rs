pub mod auth;
pub mod clock;
pub mod config;
pub mod deployments;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod logging;
pub mod routes;
pub mod test_util;
pub mod usage;

pub use config::Config;
pub use deployments::{Deployment, DeploymentRegistry, DeploymentStatus};
pub use error::ApiError;
pub use routes::app;

use std::sync::Arc;

use auth::{CredentialStore, RateLimiter};
use gateway::{InferenceExecutor, InferenceService, JobQueue, SimulatedExecutor, WorkerPool};
use usage::UsageLedger;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub credentials: CredentialStore,
    pub rate_limiter: RateLimiter,
    pub queue: Arc<JobQueue>,
    pub workers: Arc<WorkerPool>,
    pub usage: Arc<UsageLedger>,
    pub deployments: DeploymentRegistry,
    /// Queue, pool and ledger wired together for the chat endpoint.
    pub inference: InferenceService,
}

impl AppState {
    /// State backed by the simulated executor.
    pub fn new(config: Config) -> Self {
        Self::with_executor(config, Arc::new(SimulatedExecutor))
    }

    pub fn with_executor(config: Config, executor: Arc<dyn InferenceExecutor>) -> Self {
        let worker_count = config.workers.count;
        let queue = Arc::new(JobQueue::new());
        let workers = Arc::new(WorkerPool::new(worker_count, queue.clone(), executor));
        let usage = Arc::new(UsageLedger::new(config.usage.max_entries));
        let inference = InferenceService::new(queue.clone(), workers.clone(), usage.clone());

        Self {
            credentials: CredentialStore::new(config.auth.admin_key().map(str::to_string)),
            rate_limiter: RateLimiter::new(config.rate_limit.requests_per_minute, config.rate_limit.window()),
            deployments: DeploymentRegistry::new(worker_count, config.deployments.ready_delay()),
            queue,
            workers,
            usage,
            inference,
            config,
        }
    }
}
