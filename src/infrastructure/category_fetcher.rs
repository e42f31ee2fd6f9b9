//! # Category Fetcher
//!
//! Resolves the category of one product by downloading its detail page and
//! reading the breadcrumb trail. Never fails: every problem becomes
//! `Resolution::Missing`, which maps to the `NotFound` sentinel.
//!
//! Consecutive fetches through the same fetcher are spaced by the configured
//! request delay, measured from the end of the previous fetch.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use crate::domain::{Category, Identifier};
use crate::infrastructure::fetch_error::FetchFailure;
use crate::infrastructure::html_parser::CategoryExtractor;
use crate::infrastructure::http_client::DocumentSource;

/// Outcome of resolving one identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(String),
    Missing(FetchFailure),
}

impl Resolution {
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    #[must_use]
    pub fn category(&self) -> Category {
        match self {
            Self::Found(label) => Category::label(label.as_str()),
            Self::Missing(_) => Category::NotFound,
        }
    }

    #[must_use]
    pub fn into_category(self) -> Category {
        match self {
            Self::Found(label) => Category::label(label),
            Self::Missing(_) => Category::NotFound,
        }
    }
}

/// Minimum spacing between consecutive fetches
#[derive(Debug)]
struct RequestThrottle {
    delay: Duration,
    last_completed: Mutex<Option<Instant>>,
}

impl RequestThrottle {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_completed: Mutex::new(None),
        }
    }

    async fn wait_turn(&self) {
        let last = *self.last_completed.lock().await;
        if let Some(last) = last {
            let ready_at = last + self.delay;
            let remaining = ready_at.saturating_duration_since(Instant::now());
            if !remaining.is_zero() {
                debug!("Rate limit: waiting {:?}", remaining);
                tokio::time::sleep_until(ready_at).await;
            }
        }
    }

    async fn mark_completed(&self) {
        *self.last_completed.lock().await = Some(Instant::now());
    }
}

/// Rate-limited category resolver for one job
pub struct CategoryFetcher {
    source: Arc<dyn DocumentSource>,
    extractor: CategoryExtractor,
    base_url: Url,
    throttle: RequestThrottle,
    fetch_count: AtomicU64,
}

impl CategoryFetcher {
    pub fn new(
        source: Arc<dyn DocumentSource>,
        extractor: CategoryExtractor,
        base_url: &Url,
        request_delay: Duration,
    ) -> Self {
        Self {
            source,
            extractor,
            base_url: with_trailing_slash(base_url),
            throttle: RequestThrottle::new(request_delay),
            fetch_count: AtomicU64::new(0),
        }
    }

    /// Product detail page of `identifier`: `{base_url}/dp/{ASIN}`
    pub fn product_url(&self, identifier: &Identifier) -> Result<Url, FetchFailure> {
        self.base_url
            .join(&format!("dp/{}", identifier.as_str()))
            .map_err(|e| FetchFailure::InvalidUrl {
                url: format!("{}dp/{}", self.base_url, identifier),
                reason: e.to_string(),
            })
    }

    /// Network fetches performed so far
    pub fn fetch_count(&self) -> u64 {
        self.fetch_count.load(Ordering::Relaxed)
    }

    pub const fn request_delay(&self) -> Duration {
        self.throttle.delay
    }

    pub async fn resolve(&self, identifier: &Identifier) -> Resolution {
        let url = match self.product_url(identifier) {
            Ok(url) => url,
            Err(failure) => {
                warn!("Cannot build product URL for ASIN {}: {}", identifier, failure);
                return Resolution::Missing(failure);
            }
        };

        self.throttle.wait_turn().await;
        self.fetch_count.fetch_add(1, Ordering::Relaxed);

        let outcome = self
            .source
            .fetch_document(&url)
            .await
            .and_then(|html| self.extractor.extract_category(&html));

        self.throttle.mark_completed().await;

        match outcome {
            Ok(label) => {
                info!("Successfully scraped category '{}' for ASIN {}", label, identifier);
                Resolution::Found(label)
            }
            Err(FetchFailure::MissingBreadcrumb) => {
                warn!("Categories not found for ASIN {}", identifier);
                Resolution::Missing(FetchFailure::MissingBreadcrumb)
            }
            Err(failure) => {
                warn!("Error scraping ASIN {}: {}", identifier, failure);
                Resolution::Missing(failure)
            }
        }
    }
}

fn with_trailing_slash(url: &Url) -> Url {
    let mut url = url.clone();
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    /// Replies with canned documents keyed by URL path
    struct StubSource {
        pages: Vec<(&'static str, Result<String, FetchFailure>)>,
        requested: StdMutex<Vec<String>>,
    }

    impl StubSource {
        fn new(pages: Vec<(&'static str, Result<String, FetchFailure>)>) -> Arc<Self> {
            Arc::new(Self {
                pages,
                requested: StdMutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl DocumentSource for StubSource {
        async fn fetch_document(&self, url: &Url) -> Result<String, FetchFailure> {
            self.requested.lock().unwrap().push(url.to_string());
            self.pages
                .iter()
                .find(|(path, _)| url.path() == *path)
                .map_or(Err(FetchFailure::HttpStatus { status: 404, url: url.to_string() }), |(_, page)| page.clone())
        }
    }

    fn page(category: &str) -> String {
        format!(
            r#"<html><div id="wayfinding-breadcrumbs_feature_div"><a href="/c">{category}</a><a href="/d">Sub</a></div></html>"#
        )
    }

    fn fetcher(source: Arc<StubSource>, delay: Duration) -> CategoryFetcher {
        CategoryFetcher::new(
            source,
            CategoryExtractor::new().unwrap(),
            &Url::parse("http://shop.test").unwrap(),
            delay,
        )
    }

    fn id(raw: &str) -> Identifier {
        Identifier::parse(raw).unwrap()
    }

    #[test]
    fn test_product_url_keeps_base_path() {
        let source = StubSource::new(vec![]);
        let fetcher = CategoryFetcher::new(
            source,
            CategoryExtractor::new().unwrap(),
            &Url::parse("http://mirror.test/amazon").unwrap(),
            Duration::ZERO,
        );
        assert_eq!(
            fetcher.product_url(&id("b00abc")).unwrap().as_str(),
            "http://mirror.test/amazon/dp/B00ABC"
        );
    }

    #[tokio::test]
    async fn test_resolve_found() {
        let source = StubSource::new(vec![("/dp/B001", Ok(page("Electronics")))]);
        let fetcher = fetcher(source.clone(), Duration::ZERO);

        let resolution = fetcher.resolve(&id("b001")).await;
        assert_eq!(resolution, Resolution::Found("Electronics".to_string()));
        assert_eq!(resolution.category(), Category::label("Electronics"));
        assert_eq!(source.requested.lock().unwrap().as_slice(), ["http://shop.test/dp/B001"]);
        assert_eq!(fetcher.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_failures_resolve_to_sentinel() {
        let source = StubSource::new(vec![
            ("/dp/T1", Err(FetchFailure::Timeout { url: "t".to_string() })),
            ("/dp/M1", Ok("<html><body>garbage".to_string())),
            ("/dp/E1", Ok(String::new())),
        ]);
        let fetcher = fetcher(source, Duration::ZERO);

        for raw in ["t1", "m1", "e1", "unknown1"] {
            let resolution = fetcher.resolve(&id(raw)).await;
            assert!(!resolution.is_found(), "{raw} should not resolve");
            assert_eq!(resolution.into_category(), Category::NotFound);
        }
    }

    #[tokio::test]
    async fn test_consecutive_fetches_are_spaced() {
        let source = StubSource::new(vec![
            ("/dp/A1", Ok(page("Books"))),
            ("/dp/A2", Ok(page("Toys"))),
        ]);
        let delay = Duration::from_millis(150);
        let fetcher = fetcher(source, delay);

        let started = Instant::now();
        fetcher.resolve(&id("a1")).await;
        let first_done = Instant::now();
        fetcher.resolve(&id("a2")).await;

        assert!(first_done - started < delay, "first fetch must not wait");
        assert!(started.elapsed() >= delay);
        assert_eq!(fetcher.fetch_count(), 2);
    }
}
