//! Application layer module
//!
//! This module contains the job orchestration: the per-job executor, the
//! progress channel observers attach to, and the manager callers talk to.

pub mod job_executor;
pub mod job_manager;
pub mod progress_channel;

pub use job_executor::{ItemOutcome, ItemSource, JobContext, JobExecutor};
pub use job_manager::JobManager;
pub use progress_channel::{ProgressChannel, ProgressSubscription};
