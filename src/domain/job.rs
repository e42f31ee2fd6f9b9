//! # Job Entities
//!
//! A job is one batch run over a list of identifiers. Its state is driven
//! exclusively by the progress events its executor publishes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::events::ProgressEvent;
use crate::domain::identifier::Identifier;

/// Job identifier with strong typing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(Uuid);

impl JobId {
    /// Creates a new unique job ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Job state machine: `PENDING -> PROGRESS* -> (SUCCESS | FAILURE)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Pending,
    Progress,
    Success,
    Failure,
}

impl JobState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Progress => "PROGRESS",
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `floor(completed / total * 100)`, capped at 100
#[must_use]
pub fn percent_complete(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let percent = completed.saturating_mul(100) / total;
    u8::try_from(percent.min(100)).unwrap_or(100)
}

/// One batch-processing run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    /// Normalized, deduplicated input in submission order
    pub identifiers: Vec<Identifier>,
    pub state: JobState,
    pub items_completed: usize,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    #[must_use]
    pub fn new(identifiers: Vec<Identifier>) -> Self {
        Self {
            id: JobId::new(),
            identifiers,
            state: JobState::Pending,
            items_completed: 0,
            last_error: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    #[must_use]
    pub fn total_items(&self) -> usize {
        self.identifiers.len()
    }

    #[must_use]
    pub fn percent(&self) -> u8 {
        percent_complete(self.items_completed, self.total_items())
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Folds a progress event of this job into the record
    ///
    /// Events of other jobs and events arriving after a terminal state are ignored.
    pub fn apply(&mut self, event: &ProgressEvent) {
        if event.job_id != self.id || self.is_terminal() {
            return;
        }

        self.state = event.state;
        self.items_completed = event.completed;
        if event.error.is_some() {
            self.last_error.clone_from(&event.error);
        }
        if event.state.is_terminal() {
            self.finished_at = Some(event.emitted_at);
        }
    }
}
