//! Command-line driver
//!
//! Usage: `asin-categorizer [--config <path>] [--file <path>] [--json] [ASIN ...]`

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::application::JobManager;
use crate::domain::{JobState, normalize_batch};
use crate::infrastructure::{
    AppConfig, DatabaseConnection, HttpClient, HttpClientConfig, init_logging_with_config,
    log_system_info,
};

#[derive(Debug, Default, Clone, PartialEq, Eq, Parser)]
#[command(name = "asin-categorizer")]
#[command(about = "Resolve product categories for a batch of ASINs")]
pub struct CliArgs {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short = 'c', long = "config")]
    pub config_path: Option<PathBuf>,

    /// File with ASINs, one per line or comma separated
    #[arg(short = 'f', long = "file")]
    pub input_file: Option<PathBuf>,

    /// Print progress events as JSON lines
    #[arg(long)]
    pub json: bool,

    pub identifiers: Vec<String>,
}

impl CliArgs {
    /// Identifiers from the arguments followed by those of the input file
    pub async fn collect_identifiers(&self) -> Result<Vec<String>> {
        let mut identifiers = self.identifiers.clone();
        if let Some(path) = &self.input_file {
            identifiers.extend(read_identifier_file(path).await?);
        }
        Ok(identifiers)
    }
}

/// Reads identifiers separated by newlines or commas
pub async fn read_identifier_file(path: &Path) -> Result<Vec<String>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read ASIN file {}", path.display()))?;
    Ok(split_identifiers(&content))
}

fn split_identifiers(content: &str) -> Vec<String> {
    content
        .split(['\n', ','])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Runs one job over the identifiers given on the command line
pub async fn run() -> Result<()> {
    let args = CliArgs::parse();

    let config = AppConfig::load(args.config_path.as_deref())?;
    init_logging_with_config(&config.logging)?;
    log_system_info();

    let raw = args.collect_identifiers().await?;
    if normalize_batch(&raw).is_empty() {
        bail!("no valid ASINs given, pass them as arguments or with --file");
    }

    let database = DatabaseConnection::new(&config.database).await?;
    database.migrate().await?;
    let repository = Arc::new(database.category_repository(config.database.lookup_batch_size));
    let source = Arc::new(HttpClient::new(HttpClientConfig::from(&config.fetcher))?);

    let manager = JobManager::new(repository, source, &config.fetcher, &config.jobs)?;
    let job_id = manager.submit_job(&raw).await?;
    info!("Job {} submitted", job_id);
    println!("🚀 Job {job_id} started");

    let mut subscription = manager.attach(job_id).await?;
    let mut terminal = None;
    while let Some(event) = subscription.next().await {
        if args.json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            println!("[{:>3}%] {} {}", event.percent, event.state, event.status);
        }
        if event.is_terminal() {
            terminal = Some(event);
        }
    }

    let job = manager.job(job_id).await?;
    let categories = manager.lookup_categories(&job.identifiers).await?;

    println!();
    for identifier in &job.identifiers {
        match categories.get(identifier) {
            Some(category) => println!("{identifier}\t{category}"),
            None => println!("{identifier}\t-"),
        }
    }

    match terminal {
        Some(event) if event.state == JobState::Success => {
            println!("✅ {}", event.status);
            Ok(())
        }
        Some(event) => bail!(
            "job {} failed: {}",
            job_id,
            event.error.unwrap_or_else(|| event.status.clone())
        ),
        None => bail!("job {job_id} ended without a terminal event"),
    }
}
