// Database connection and pool management
// This module handles SQLite database connections using sqlx

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use crate::infrastructure::category_repository::{CategoryRepository, SqliteCategoryRepository};
use crate::infrastructure::config::DatabaseConfig;

pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let database_url = config.url.as_str();

        // Create database file directory if it doesn't exist
        let db_path = database_url
            .strip_prefix("sqlite://")
            .or_else(|| database_url.strip_prefix("sqlite:"))
            .unwrap_or(database_url);
        let db_path = db_path.split('?').next().unwrap_or(db_path);

        if db_path != ":memory:" {
            if let Some(parent) = Path::new(db_path).parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .with_context(|| format!("Failed to create database directory {parent:?}"))?;
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {database_url}"))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(config.busy_timeout());

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database: {database_url}"))?;

        tracing::info!("Connected to category cache at {}", database_url);
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Builds the category cache on top of this pool
    pub fn category_repository(&self, lookup_batch_size: usize) -> SqliteCategoryRepository {
        SqliteCategoryRepository::with_lookup_batch_size(self.pool.clone(), lookup_batch_size)
    }

    pub async fn migrate(&self) -> Result<()> {
        SqliteCategoryRepository::new(self.pool.clone())
            .ensure_schema()
            .await
            .context("Failed to create category cache schema")?;
        Ok(())
    }
}
