use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use asset_store::application::dto::MAX_PAGE_SIZE;
use asset_store::application::ports::TxScope;
use asset_store::application::services::{AttachmentStore, PhysicalFileRegistry};
use asset_store::domain::value_objects::FileId;
use asset_store::infrastructure::database;
use asset_store::infrastructure::persistence::{
    PostgresAttachmentRepository, PostgresPhysicalFileRepository,
};
use asset_store::Config;

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

/// Report reference-counter drift. Never writes.
#[derive(Parser)]
struct Cli {
    #[arg(long)]
    database_url: Option<String>,

    /// Audit a single file instead of the whole registry
    #[arg(long)]
    file: Option<FileId>,

    /// List files with no live references instead of auditing counters
    #[arg(long)]
    orphans: bool,

    /// Include consistent files in the report
    #[arg(long)]
    all: bool,

    /// Maximum rows to report, between 0 and 1000
    #[arg(
        long,
        default_value_t = MAX_PAGE_SIZE,
        value_parser = clap::value_parser!(i64).range(0..=MAX_PAGE_SIZE)
    )]
    limit: i64,

    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid configuration")?;

    let pool = database::connect(&config)
        .await
        .context("failed to connect to database")?;
    let files = Arc::new(PostgresPhysicalFileRepository::new(pool.clone()));
    let attachments = Arc::new(PostgresAttachmentRepository::new(pool));

    if cli.orphans {
        let registry = PhysicalFileRegistry::new(files);
        let limit = cli.limit.min(config.orphan_scan_limit);
        let orphans = registry
            .find_orphaned(limit, TxScope::NoTransaction)
            .await?;

        match cli.format {
            Format::Json => println!("{}", serde_json::to_string_pretty(&orphans)?),
            Format::Text => {
                println!("Orphaned files: {}", orphans.len());
                for file in &orphans {
                    println!(
                        "id: {}, ref_count: {}, provider: {}, key: {}",
                        file.id(),
                        file.ref_count(),
                        file.storage_provider(),
                        file.object_key()
                    );
                }
            }
        }
        return Ok(());
    }

    let reports = match cli.file {
        Some(file_id) => {
            let store = AttachmentStore::new(files, attachments);
            store
                .audit_ref_count(&file_id, TxScope::NoTransaction)
                .await?
                .into_iter()
                .collect::<Vec<_>>()
        }
        None => files.ref_count_reports(!cli.all, cli.limit).await?,
    };

    match cli.format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        Format::Text => {
            let drifted = reports.iter().filter(|r| !r.is_consistent()).count();
            println!("Files reported: {}, drifted: {}", reports.len(), drifted);
            for report in &reports {
                println!(
                    "id: {}, recorded: {}, live: {}, drift: {}",
                    report.file_id,
                    report.recorded,
                    report.live,
                    report.drift()
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_defaults_to_page_size() {
        let cli = Cli::try_parse_from(["audit-refcounts"]).unwrap();
        assert_eq!(cli.limit, MAX_PAGE_SIZE);
    }

    #[test]
    fn test_limit_outside_page_range_is_rejected() {
        assert!(Cli::try_parse_from(["audit-refcounts", "--limit", "0"]).is_ok());
        assert!(Cli::try_parse_from(["audit-refcounts", "--limit", "-1"]).is_err());
        assert!(Cli::try_parse_from(["audit-refcounts", "--limit", "1001"]).is_err());
    }
}
