//! # Progress Channel
//!
//! Per-job broadcast of `ProgressEvent`s. Each job keeps its latest event so
//! late subscribers start from the current state, and a broadcast sender so
//! every attached subscriber sees every later event.

use futures::Stream;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, warn};

use crate::domain::{JobId, ProgressEvent};

struct JobTopic {
    latest: Option<ProgressEvent>,
    sender: broadcast::Sender<ProgressEvent>,
}

impl JobTopic {
    fn new(buffer_size: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer_size);
        Self {
            latest: None,
            sender,
        }
    }
}

#[derive(Clone)]
pub struct ProgressChannel {
    topics: Arc<RwLock<HashMap<JobId, JobTopic>>>,
    buffer_size: usize,
}

impl ProgressChannel {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            topics: Arc::new(RwLock::new(HashMap::new())),
            buffer_size: buffer_size.max(1),
        }
    }

    /// Makes a job known before its first event, so subscribers can wait on it
    pub async fn register(&self, job_id: JobId) {
        let mut topics = self.topics.write().await;
        topics
            .entry(job_id)
            .or_insert_with(|| JobTopic::new(self.buffer_size));
    }

    /// Stores `event` as the job's latest and forwards it to current subscribers
    pub async fn publish(&self, event: ProgressEvent) {
        let mut topics = self.topics.write().await;
        let topic = topics
            .entry(event.job_id)
            .or_insert_with(|| JobTopic::new(self.buffer_size));

        topic.latest = Some(event.clone());
        let receivers = topic.sender.send(event).unwrap_or(0);
        debug!("Progress event delivered to {} subscribers", receivers);
    }

    pub async fn latest(&self, job_id: JobId) -> Option<ProgressEvent> {
        self.topics
            .read()
            .await
            .get(&job_id)
            .and_then(|topic| topic.latest.clone())
    }

    /// Attaches to a job; `None` when the job was never registered
    pub async fn subscribe(&self, job_id: JobId) -> Option<ProgressSubscription> {
        let topics = self.topics.read().await;
        let topic = topics.get(&job_id)?;

        Some(ProgressSubscription {
            job_id,
            pending: topic.latest.clone(),
            receiver: topic.sender.subscribe(),
            finished: false,
        })
    }
}

/// Lazy sequence of a job's progress events
///
/// Yields the latest known event first, then each new one, and ends after a
/// terminal event. Waits indefinitely while the job is still running; wrap
/// `next()` in `tokio::time::timeout` for bounded waiting.
pub struct ProgressSubscription {
    job_id: JobId,
    pending: Option<ProgressEvent>,
    receiver: broadcast::Receiver<ProgressEvent>,
    finished: bool,
}

impl ProgressSubscription {
    pub const fn job_id(&self) -> JobId {
        self.job_id
    }

    pub async fn next(&mut self) -> Option<ProgressEvent> {
        if self.finished {
            return None;
        }

        if let Some(event) = self.pending.take() {
            self.finished = event.is_terminal();
            return Some(event);
        }

        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    self.finished = event.is_terminal();
                    return Some(event);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(
                        "Progress subscriber for job {} lagged, skipped {} events",
                        self.job_id, skipped
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    self.finished = true;
                    return None;
                }
            }
        }
    }

    /// Drains the subscription, returning the terminal event
    pub async fn wait_for_terminal(mut self) -> Option<ProgressEvent> {
        let mut last = None;
        while let Some(event) = self.next().await {
            last = Some(event);
        }
        last.filter(ProgressEvent::is_terminal)
    }

    pub fn into_stream(self) -> impl Stream<Item = ProgressEvent> {
        futures::stream::unfold(self, |mut subscription| async move {
            subscription.next().await.map(|event| (event, subscription))
        })
    }
}
