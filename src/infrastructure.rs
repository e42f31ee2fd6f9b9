//! Infrastructure layer for storage, HTTP retrieval, parsing and runtime setup
//!
//! This module provides the SQLite category cache, the rate-limited category
//! fetcher and its HTTP/HTML building blocks, plus configuration and logging.

pub mod category_fetcher;
pub mod category_repository;
pub mod config;
pub mod database_connection;
pub mod fetch_error;
pub mod html_parser;
pub mod http_client;
pub mod logging;

// Re-export commonly used items
pub use category_fetcher::{CategoryFetcher, Resolution};
pub use category_repository::{CategoryRepository, DEFAULT_LOOKUP_BATCH_SIZE, SqliteCategoryRepository};
pub use config::{AppConfig, ConfigError, DatabaseConfig, FetcherConfig, JobsConfig, LoggingConfig};
pub use database_connection::DatabaseConnection;
pub use fetch_error::FetchFailure;
pub use html_parser::{BreadcrumbSelectors, CategoryExtractor};
pub use http_client::{DocumentSource, HttpClient, HttpClientConfig};
pub use logging::{get_log_directory, init_logging, init_logging_with_config, log_system_info};
