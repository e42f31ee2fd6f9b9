//! Category cache repository
//!
//! Persistent `ASIN -> category` store backed by SQLite. Keys are always
//! normalized `Identifier`s, so lookups are case- and whitespace-insensitive.

use async_trait::async_trait;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

use crate::domain::{CategorizerError, CategorizerResult, Category, Identifier};

/// SQLite limits bound parameters per statement; stay well below it
pub const DEFAULT_LOOKUP_BATCH_SIZE: usize = 500;

/// `SQLITE_MAX_VARIABLE_NUMBER` of the bundled SQLite
pub const SQLITE_MAX_VARIABLES: usize = 32_766;

impl From<sqlx::Error> for CategorizerError {
    fn from(error: sqlx::Error) -> Self {
        Self::Storage(error.to_string())
    }
}

/// Category cache contract
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Creates the backing table if it is missing; safe to call repeatedly
    async fn ensure_schema(&self) -> CategorizerResult<()>;

    /// `None` means "no record", which is not the same as `Some(Category::NotFound)`
    async fn get(&self, identifier: &Identifier) -> CategorizerResult<Option<Category>>;

    /// Returns the subset of `identifiers` that has a record, each key once
    async fn get_many(
        &self,
        identifiers: &[Identifier],
    ) -> CategorizerResult<HashMap<Identifier, Category>>;

    /// Insert or replace; last writer wins
    async fn put(&self, identifier: &Identifier, category: &Category) -> CategorizerResult<()>;
}

pub struct SqliteCategoryRepository {
    pool: SqlitePool,
    lookup_batch_size: usize,
}

impl SqliteCategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_lookup_batch_size(pool, DEFAULT_LOOKUP_BATCH_SIZE)
    }

    pub fn with_lookup_batch_size(pool: SqlitePool, lookup_batch_size: usize) -> Self {
        Self {
            pool,
            lookup_batch_size: lookup_batch_size.clamp(1, SQLITE_MAX_VARIABLES),
        }
    }

    pub const fn lookup_batch_size(&self) -> usize {
        self.lookup_batch_size
    }

    async fn fetch_chunk(
        &self,
        chunk: &[&Identifier],
    ) -> CategorizerResult<Vec<(Identifier, Category)>> {
        let mut query_builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT asin, category FROM asin_categories WHERE asin IN (");
        let mut separated = query_builder.separated(", ");
        for identifier in chunk {
            separated.push_bind(identifier.as_str().to_string());
        }
        separated.push_unseparated(")");

        let rows = query_builder.build().fetch_all(&self.pool).await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let asin: String = row.try_get("asin")?;
            let stored: Option<String> = row.try_get("category")?;

            let Ok(identifier) = Identifier::parse(&asin) else {
                warn!("Ignoring malformed cache key {:?}", asin);
                continue;
            };
            if let Some(category) = stored.as_deref().and_then(Category::from_stored) {
                records.push((identifier, category));
            }
        }

        Ok(records)
    }
}

#[async_trait]
impl CategoryRepository for SqliteCategoryRepository {
    async fn ensure_schema(&self) -> CategorizerResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS asin_categories (
                asin TEXT PRIMARY KEY,
                category TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        debug!("Category cache schema ready");
        Ok(())
    }

    async fn get(&self, identifier: &Identifier) -> CategorizerResult<Option<Category>> {
        let stored: Option<Option<String>> =
            sqlx::query_scalar("SELECT category FROM asin_categories WHERE asin = ?")
                .bind(identifier.as_str())
                .fetch_optional(&self.pool)
                .await?;

        Ok(stored.flatten().as_deref().and_then(Category::from_stored))
    }

    async fn get_many(
        &self,
        identifiers: &[Identifier],
    ) -> CategorizerResult<HashMap<Identifier, Category>> {
        let unique: BTreeSet<&Identifier> = identifiers.iter().collect();
        let mut found = HashMap::new();
        if unique.is_empty() {
            return Ok(found);
        }

        let unique: Vec<&Identifier> = unique.into_iter().collect();
        for chunk in unique.chunks(self.lookup_batch_size) {
            for (identifier, category) in self.fetch_chunk(chunk).await? {
                found.entry(identifier).or_insert(category);
            }
        }

        debug!(
            "Category cache lookup: {} of {} identifiers found",
            found.len(),
            unique.len()
        );
        Ok(found)
    }

    async fn put(&self, identifier: &Identifier, category: &Category) -> CategorizerResult<()> {
        sqlx::query(
            r#"
            INSERT INTO asin_categories (asin, category) VALUES (?, ?)
            ON CONFLICT(asin) DO UPDATE SET category = excluded.category
            "#,
        )
        .bind(identifier.as_str())
        .bind(category.as_stored())
        .execute(&self.pool)
        .await?;

        info!("Category '{}' saved to cache for ASIN {}", category, identifier);
        Ok(())
    }
}
