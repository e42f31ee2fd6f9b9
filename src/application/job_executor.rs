//! # Job Executor
//!
//! Drives one job over its identifiers, strictly in order:
//! cache lookup -> (fetch + persist) -> progress event.
//!
//! Fetch problems never stop a job, they end up as the `NotFound` sentinel.
//! Storage failures stop the job with a `FAILURE` event naming the item.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::application::progress_channel::ProgressChannel;
use crate::domain::{
    CategorizerError, CategorizerResult, CategoryRecord, Identifier, JobId, ProgressEvent,
};
use crate::infrastructure::category_fetcher::CategoryFetcher;
use crate::infrastructure::category_repository::CategoryRepository;

/// Everything one job run needs to know about itself
#[derive(Debug, Clone)]
pub struct JobContext {
    pub job_id: JobId,
    pub identifiers: Vec<Identifier>,
    pub cancellation: CancellationToken,
}

impl JobContext {
    pub fn new(job_id: JobId, identifiers: Vec<Identifier>) -> Self {
        Self {
            job_id,
            identifiers,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn total(&self) -> usize {
        self.identifiers.len()
    }
}

/// Where an item's category came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemSource {
    Cache,
    Fetched,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    pub record: CategoryRecord,
    pub source: ItemSource,
}

pub struct JobExecutor {
    repository: Arc<dyn CategoryRepository>,
    fetcher: CategoryFetcher,
    channel: ProgressChannel,
}

impl JobExecutor {
    pub fn new(
        repository: Arc<dyn CategoryRepository>,
        fetcher: CategoryFetcher,
        channel: ProgressChannel,
    ) -> Self {
        Self {
            repository,
            fetcher,
            channel,
        }
    }

    pub const fn fetcher(&self) -> &CategoryFetcher {
        &self.fetcher
    }

    /// Publishes the `PENDING` event of a job about to run
    pub async fn announce(&self, context: &JobContext) {
        self.channel.register(context.job_id).await;
        self.channel
            .publish(ProgressEvent::pending(context.job_id, context.total()))
            .await;
    }

    /// Announces and executes the job, returning its terminal event
    pub async fn run(&self, context: &JobContext) -> ProgressEvent {
        self.announce(context).await;
        self.execute(context).await
    }

    /// Processes every identifier of an announced job
    pub async fn execute(&self, context: &JobContext) -> ProgressEvent {
        let job_id = context.job_id;
        let total = context.total();
        let mut completed = 0;

        info!("Job {} started with {} ASINs", job_id, total);

        for (index, identifier) in context.identifiers.iter().enumerate() {
            info!(
                "Starting to resolve category for ASIN {} (index {} of {})",
                identifier,
                index + 1,
                total
            );

            let result = tokio::select! {
                biased;
                () = context.cancellation.cancelled() => Err(CategorizerError::Cancelled),
                result = self.process_item(identifier) => result,
            };

            match result {
                Ok(outcome) => {
                    completed += 1;
                    debug!(
                        "ASIN {} -> '{}' ({:?})",
                        outcome.record.identifier, outcome.record.category, outcome.source
                    );
                    self.channel
                        .publish(ProgressEvent::progress(job_id, index, completed, total))
                        .await;
                }
                Err(e) => {
                    if e.is_storage() {
                        error!("Job {} failed at ASIN {} (index {}): {}", job_id, identifier, index, e);
                    } else {
                        warn!("Job {} stopped at ASIN {} (index {}): {}", job_id, identifier, index, e);
                    }
                    let event = ProgressEvent::failure(job_id, index, completed, total, e.to_string());
                    self.channel.publish(event.clone()).await;
                    return event;
                }
            }
        }

        info!("Job {} completed: {} ASINs processed", job_id, total);
        let event = ProgressEvent::success(job_id, total);
        self.channel.publish(event.clone()).await;
        event
    }

    /// Resolves one identifier, cache first
    pub async fn process_item(&self, identifier: &Identifier) -> CategorizerResult<ItemOutcome> {
        if let Some(category) = self.repository.get(identifier).await? {
            info!(
                "ASIN {} already exists in cache with category: {}",
                identifier, category
            );
            return Ok(ItemOutcome {
                record: CategoryRecord::new(identifier.clone(), category),
                source: ItemSource::Cache,
            });
        }

        let category = self.fetcher.resolve(identifier).await.into_category();
        self.repository.put(identifier, &category).await?;

        Ok(ItemOutcome {
            record: CategoryRecord::new(identifier.clone(), category),
            source: ItemSource::Fetched,
        })
    }
}
