//! Job pipeline behind the chat endpoint.
//!
//! This module provides:
//! - FIFO job queue with one completion channel per job
//! - Logical worker pool with round-robin worker assignment
//! - Pluggable inference executor (simulated by default)
//! - Stream encoder that turns a finished result into SSE frames
//! - Service tying the above to the usage ledger

mod executor;
mod job_queue;
mod service;
mod stream;
mod worker_pool;

pub use executor::{
    ExecutorError, InferenceExecutor, JobPayload, JobResult, SimulatedExecutor, DEFAULT_MAX_TOKENS,
    DEFAULT_TEMPERATURE,
};
pub use job_queue::{Job, JobOutcome, JobQueue};
pub use service::{Completion, InferenceError, InferenceService};
pub use stream::{encode, StreamContext, StreamFrame, DONE_SENTINEL};
pub use worker_pool::{RoundRobin, WorkerPool};
