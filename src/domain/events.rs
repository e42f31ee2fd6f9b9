//! Progress events published while a job runs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::job::{JobId, JobState, percent_complete};

/// Immutable snapshot of a job's progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub job_id: JobId,
    pub state: JobState,
    /// 0..=100, non-decreasing within a job
    pub percent: u8,
    /// 0-based index of the item this event refers to
    pub current_index: usize,
    pub completed: usize,
    pub total: usize,
    pub status: String,
    pub error: Option<String>,
    pub emitted_at: DateTime<Utc>,
}

impl ProgressEvent {
    #[must_use]
    pub fn pending(job_id: JobId, total: usize) -> Self {
        Self {
            job_id,
            state: JobState::Pending,
            percent: 0,
            current_index: 0,
            completed: 0,
            total,
            status: format!("Queued {total} ASINs"),
            error: None,
            emitted_at: Utc::now(),
        }
    }

    /// Emitted after item `index` finished, `completed` items done in total
    #[must_use]
    pub fn progress(job_id: JobId, index: usize, completed: usize, total: usize) -> Self {
        Self {
            job_id,
            state: JobState::Progress,
            percent: percent_complete(completed, total),
            current_index: index,
            completed,
            total,
            status: format!("Processing ASIN {completed} of {total}"),
            error: None,
            emitted_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn success(job_id: JobId, total: usize) -> Self {
        Self {
            job_id,
            state: JobState::Success,
            percent: 100,
            current_index: total.saturating_sub(1),
            completed: total,
            total,
            status: "Task completed!".to_string(),
            error: None,
            emitted_at: Utc::now(),
        }
    }

    /// Emitted when item `index` aborted the job
    pub fn failure(
        job_id: JobId,
        index: usize,
        completed: usize,
        total: usize,
        error: impl Into<String>,
    ) -> Self {
        let error = error.into();
        Self {
            job_id,
            state: JobState::Failure,
            percent: percent_complete(completed, total),
            current_index: index,
            completed,
            total,
            status: format!("Failed at ASIN {} of {total}: {error}", index + 1),
            error: Some(error),
            emitted_at: Utc::now(),
        }
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_status_matches_item_counter() {
        let event = ProgressEvent::progress(JobId::new(), 1, 2, 3);
        assert_eq!(event.status, "Processing ASIN 2 of 3");
        assert_eq!(event.percent, 66);
        assert!(!event.is_terminal());
    }

    #[test]
    fn test_success_is_always_complete() {
        let event = ProgressEvent::success(JobId::new(), 7);
        assert_eq!(event.percent, 100);
        assert_eq!(event.completed, 7);
        assert!(event.is_terminal());
    }

    #[test]
    fn test_failure_keeps_index_and_reason() {
        let event = ProgressEvent::failure(JobId::new(), 1, 1, 3, "Storage failure: locked");
        assert_eq!(event.state, JobState::Failure);
        assert_eq!(event.current_index, 1);
        assert_eq!(event.percent, 33);
        assert_eq!(event.error.as_deref(), Some("Storage failure: locked"));
    }
}
