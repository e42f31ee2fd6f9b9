//! Domain module - Core entities and value objects
//!
//! This module contains the identifiers, categories, jobs and progress events
//! that the categorization pipeline operates on.
//!
//! Modern Rust module organization (Rust 2018+ style):
//! - Each module is its own file in the domain/ directory
//! - Public exports are defined here for convenience

pub mod category;
pub mod errors;
pub mod events;
pub mod identifier;
pub mod job;

// Re-export commonly used items for convenience
pub use category::{Category, CategoryRecord, NO_CATEGORY};
pub use errors::{CategorizerError, CategorizerResult};
pub use events::ProgressEvent;
pub use identifier::{Identifier, normalize_batch};
pub use job::{Job, JobId, JobState, percent_complete};
