//! # Job Manager
//!
//! Entry point for callers: submits batches as background jobs, answers
//! progress queries and cache lookups, and cancels running jobs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

use crate::application::job_executor::{JobContext, JobExecutor};
use crate::application::progress_channel::{ProgressChannel, ProgressSubscription};
use crate::domain::{
    CategorizerError, CategorizerResult, Category, Identifier, Job, JobId, JobState,
    ProgressEvent, normalize_batch,
};
use crate::infrastructure::category_fetcher::CategoryFetcher;
use crate::infrastructure::category_repository::CategoryRepository;
use crate::infrastructure::config::{FetcherConfig, JobsConfig};
use crate::infrastructure::html_parser::CategoryExtractor;
use crate::infrastructure::http_client::DocumentSource;

struct JobEntry {
    job: Job,
    cancellation: CancellationToken,
}

#[derive(Clone)]
pub struct JobManager {
    repository: Arc<dyn CategoryRepository>,
    source: Arc<dyn DocumentSource>,
    extractor: CategoryExtractor,
    base_url: Url,
    request_delay: Duration,
    channel: ProgressChannel,
    jobs: Arc<RwLock<HashMap<JobId, JobEntry>>>,
}

impl JobManager {
    pub fn new(
        repository: Arc<dyn CategoryRepository>,
        source: Arc<dyn DocumentSource>,
        fetcher_config: &FetcherConfig,
        jobs_config: &JobsConfig,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            repository,
            source,
            extractor: CategoryExtractor::new()?,
            base_url: Url::parse(&fetcher_config.base_url)?,
            request_delay: fetcher_config.request_delay(),
            channel: ProgressChannel::new(jobs_config.event_buffer_size),
            jobs: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Starts a background job over the normalized batch
    ///
    /// Returns as soon as the job is registered and its `PENDING` event is
    /// published. Rejects batches without a single valid identifier and
    /// batches identical to one that already finished successfully.
    pub async fn submit_job<I, S>(&self, identifiers: I) -> CategorizerResult<JobId>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let identifiers = normalize_batch(identifiers);
        if identifiers.is_empty() {
            return Err(CategorizerError::InvalidInput(
                "no valid ASINs in request".to_string(),
            ));
        }

        if let Some(previous) = self.find_completed_batch(&identifiers).await {
            return Err(CategorizerError::InvalidInput(format!(
                "batch already processed by job {previous}"
            )));
        }

        let job = Job::new(identifiers);
        let context = JobContext::new(job.id, job.identifiers.clone());
        let job_id = job.id;

        self.jobs.write().await.insert(
            job_id,
            JobEntry {
                job,
                cancellation: context.cancellation.clone(),
            },
        );

        let fetcher = CategoryFetcher::new(
            self.source.clone(),
            self.extractor.clone(),
            &self.base_url,
            self.request_delay,
        );
        let executor = JobExecutor::new(self.repository.clone(), fetcher, self.channel.clone());
        executor.announce(&context).await;

        info!("Submitted job {} with {} ASINs", job_id, context.total());
        tokio::spawn(async move {
            let terminal = executor.execute(&context).await;
            info!("Job {} finished with state {}", terminal.job_id, terminal.state);
        });

        Ok(job_id)
    }

    async fn find_completed_batch(&self, identifiers: &[Identifier]) -> Option<JobId> {
        let candidates: Vec<JobId> = self
            .jobs
            .read()
            .await
            .values()
            .filter(|entry| entry.job.identifiers == identifiers)
            .map(|entry| entry.job.id)
            .collect();

        for job_id in candidates {
            if let Some(latest) = self.channel.latest(job_id).await {
                if latest.state == JobState::Success {
                    return Some(job_id);
                }
            }
        }
        None
    }

    /// Latest event published for the job
    pub async fn get_progress(&self, job_id: JobId) -> CategorizerResult<ProgressEvent> {
        self.channel
            .latest(job_id)
            .await
            .ok_or(CategorizerError::JobNotFound(job_id))
    }

    pub async fn attach(&self, job_id: JobId) -> CategorizerResult<ProgressSubscription> {
        self.channel
            .subscribe(job_id)
            .await
            .ok_or(CategorizerError::JobNotFound(job_id))
    }

    /// Cached categories of the given identifiers; absent ones are omitted
    pub async fn lookup_categories<I, S>(
        &self,
        identifiers: I,
    ) -> CategorizerResult<HashMap<Identifier, Category>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let identifiers = normalize_batch(identifiers);
        self.repository.get_many(&identifiers).await
    }

    /// Snapshot of the job record with its latest event applied
    pub async fn job(&self, job_id: JobId) -> CategorizerResult<Job> {
        let mut job = self
            .jobs
            .read()
            .await
            .get(&job_id)
            .map(|entry| entry.job.clone())
            .ok_or(CategorizerError::JobNotFound(job_id))?;

        if let Some(latest) = self.channel.latest(job_id).await {
            job.apply(&latest);
        }
        Ok(job)
    }

    /// Requests cancellation; the job ends with `FAILURE` before its next item
    pub async fn cancel(&self, job_id: JobId) -> CategorizerResult<()> {
        let jobs = self.jobs.read().await;
        let entry = jobs
            .get(&job_id)
            .ok_or(CategorizerError::JobNotFound(job_id))?;

        warn!("Cancelling job {}", job_id);
        entry.cancellation.cancel();
        Ok(())
    }

    /// Waits for the job's terminal event
    pub async fn wait_for_completion(&self, job_id: JobId) -> CategorizerResult<ProgressEvent> {
        self.attach(job_id)
            .await?
            .wait_for_terminal()
            .await
            .ok_or(CategorizerError::JobNotFound(job_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::fetch_error::FetchFailure;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct MemoryRepository {
        records: Mutex<HashMap<Identifier, Category>>,
    }

    #[async_trait]
    impl CategoryRepository for MemoryRepository {
        async fn ensure_schema(&self) -> CategorizerResult<()> {
            Ok(())
        }

        async fn get(&self, identifier: &Identifier) -> CategorizerResult<Option<Category>> {
            Ok(self.records.lock().unwrap().get(identifier).cloned())
        }

        async fn get_many(
            &self,
            identifiers: &[Identifier],
        ) -> CategorizerResult<HashMap<Identifier, Category>> {
            let records = self.records.lock().unwrap();
            Ok(identifiers
                .iter()
                .filter_map(|id| records.get(id).map(|c| (id.clone(), c.clone())))
                .collect())
        }

        async fn put(&self, identifier: &Identifier, category: &Category) -> CategorizerResult<()> {
            self.records
                .lock()
                .unwrap()
                .insert(identifier.clone(), category.clone());
            Ok(())
        }
    }

    /// Answers every page with the same breadcrumb after `delay`
    struct SlowSource {
        delay: Duration,
        requests: AtomicUsize,
    }

    #[async_trait]
    impl DocumentSource for SlowSource {
        async fn fetch_document(&self, _url: &Url) -> Result<String, FetchFailure> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(r#"<div id="wayfinding-breadcrumbs_feature_div"><a>Kitchen</a></div>"#.to_string())
        }
    }

    fn manager(source_delay: Duration) -> (JobManager, Arc<SlowSource>) {
        let source = Arc::new(SlowSource {
            delay: source_delay,
            requests: AtomicUsize::new(0),
        });
        let fetcher_config = FetcherConfig {
            base_url: "http://shop.test".to_string(),
            request_delay_ms: 0,
            ..FetcherConfig::default()
        };
        let manager = JobManager::new(
            Arc::new(MemoryRepository::default()),
            source.clone(),
            &fetcher_config,
            &JobsConfig::default(),
        )
        .unwrap();
        (manager, source)
    }

    #[tokio::test]
    async fn test_submit_rejects_empty_and_invalid_batches() {
        let (manager, _) = manager(Duration::ZERO);

        let empty: Vec<&str> = Vec::new();
        assert!(matches!(
            manager.submit_job(empty).await,
            Err(CategorizerError::InvalidInput(_))
        ));
        assert!(matches!(
            manager.submit_job(["  ", "no-dash!"]).await,
            Err(CategorizerError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_job_completes_and_snapshot_follows_events() {
        let (manager, source) = manager(Duration::ZERO);

        let job_id = manager.submit_job(["k1", "k2"]).await.unwrap();
        let terminal = manager.wait_for_completion(job_id).await.unwrap();

        assert_eq!(terminal.state, JobState::Success);
        assert_eq!(manager.get_progress(job_id).await.unwrap().percent, 100);
        assert_eq!(source.requests.load(Ordering::SeqCst), 2);

        let job = manager.job(job_id).await.unwrap();
        assert_eq!(job.state, JobState::Success);
        assert_eq!(job.items_completed, 2);
        assert!(job.finished_at.is_some());

        let categories = manager.lookup_categories(["k1", " K2 ", "zz9"]).await.unwrap();
        assert_eq!(categories.len(), 2);
        assert_eq!(
            categories.get(&Identifier::parse("k2").unwrap()),
            Some(&Category::label("Kitchen"))
        );
    }

    #[tokio::test]
    async fn test_successful_batch_cannot_be_resubmitted() {
        let (manager, _) = manager(Duration::ZERO);

        let job_id = manager.submit_job(["d1", "d2"]).await.unwrap();
        manager.wait_for_completion(job_id).await.unwrap();

        assert!(matches!(
            manager.submit_job(["D1", "d2", "d1"]).await,
            Err(CategorizerError::InvalidInput(_))
        ));
        assert!(manager.submit_job(["d2", "d1"]).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let (manager, _) = manager(Duration::ZERO);
        let unknown = JobId::new();

        assert_eq!(
            manager.get_progress(unknown).await.unwrap_err(),
            CategorizerError::JobNotFound(unknown)
        );
        assert!(manager.attach(unknown).await.is_err());
        assert!(manager.job(unknown).await.is_err());
        assert!(manager.cancel(unknown).await.is_err());
    }

    #[tokio::test]
    async fn test_cancel_running_job() {
        let (manager, _) = manager(Duration::from_millis(200));

        let job_id = manager.submit_job(["s1", "s2", "s3", "s4"]).await.unwrap();
        manager.cancel(job_id).await.unwrap();
        let terminal = manager.wait_for_completion(job_id).await.unwrap();

        assert_eq!(terminal.state, JobState::Failure);
        assert_eq!(terminal.error.as_deref(), Some("Job cancelled"));
        assert!(terminal.completed < 4);
    }
}
