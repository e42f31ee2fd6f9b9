//! Category labels and persisted category records

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::identifier::Identifier;

/// Stored text for "the product page had no category"
pub const NO_CATEGORY: &str = "No Category";

/// Resolved category of a product
///
/// `NotFound` is the sentinel for a lookup that ran but produced no label.
/// It is different from having no cache entry at all, which callers see as
/// `Option::None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Label(String),
    NotFound,
}

impl Category {
    /// Builds a category from a label, falling back to the sentinel for blank text
    pub fn label(value: impl Into<String>) -> Self {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed == NO_CATEGORY {
            Self::NotFound
        } else {
            Self::Label(trimmed.to_string())
        }
    }

    /// Interprets a stored column value
    ///
    /// Returns `None` for empty values, which never count as a usable record.
    #[must_use]
    pub fn from_stored(value: &str) -> Option<Self> {
        if value.trim().is_empty() {
            None
        } else {
            Some(Self::label(value))
        }
    }

    /// Text persisted for this category
    #[must_use]
    pub fn as_stored(&self) -> &str {
        match self {
            Self::Label(label) => label,
            Self::NotFound => NO_CATEGORY,
        }
    }

    #[must_use]
    pub fn as_label(&self) -> Option<&str> {
        match self {
            Self::Label(label) => Some(label),
            Self::NotFound => None,
        }
    }

    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Label(_))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_stored())
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        Self::label(value)
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        match value {
            Category::Label(label) => label,
            Category::NotFound => NO_CATEGORY.to_string(),
        }
    }
}

/// One row of the category cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub identifier: Identifier,
    pub category: Category,
}

impl CategoryRecord {
    #[must_use]
    pub const fn new(identifier: Identifier, category: Category) -> Self {
        Self {
            identifier,
            category,
        }
    }
}
