//! ASIN Categorizer - cached product category resolution
//!
//! Resolves product identifiers (ASINs) to their top-level category by
//! reading the breadcrumb trail of each product page. Results are cached in
//! SQLite, batches run as background jobs, and observers follow each job
//! through a stream of progress events.

// Module declarations
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;

pub use application::JobManager;
pub use domain::{CategorizerError, Category, Identifier, JobId, JobState, ProgressEvent};
