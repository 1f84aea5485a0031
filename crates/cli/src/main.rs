//! Offline administration of the worker's cache registry.
//!
//! Operates directly on the SQLite file named by the layered configuration,
//! so it works whether or not the host is running. Output is JSON on stdout.

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;
use url::Url;

use rinkorea_client::lifecycle::purge_stale;
use rinkorea_core::{AppConfig, CacheDb, CacheNames, WorkerRequest};

#[derive(Debug, Parser)]
#[command(name = "rinkorea-cache", version, about = "Inspect and purge the rinkorea offline cache")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List partitions with entry counts and stored bytes.
    Partitions,
    /// Total stored bytes across all partitions.
    Size,
    /// List the entries of one partition.
    Keys { name: String },
    /// Delete a whole partition.
    Purge { name: String },
    /// Delete one entry from a partition.
    Evict { name: String, url: String },
    /// Delete every partition not named by the configured version.
    Activate,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load()?;
    let db = CacheDb::open(&config.db_path).await?;

    let output = run(cli.command, &db, &config).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run(command: Command, db: &CacheDb, config: &AppConfig) -> Result<Value> {
    match command {
        Command::Partitions => Ok(serde_json::to_value(db.partition_stats().await?)?),
        Command::Size => Ok(json!({ "type": "CACHE_SIZE", "size": db.total_size().await? })),
        Command::Keys { name } => {
            if !db.has_partition(&name).await? {
                bail!("no partition named {name}");
            }
            Ok(serde_json::to_value(db.partition(&name).keys().await?)?)
        }
        Command::Purge { name } => {
            let deleted = db.delete_partition(&name).await?;
            tracing::info!(partition = %name, deleted, "purge");
            Ok(json!({ "partition": name, "deleted": deleted }))
        }
        Command::Evict { name, url } => {
            let request = WorkerRequest::get(Url::parse(&url)?);
            let deleted = db.partition(&name).delete(&request).await?;
            Ok(json!({ "partition": name, "url": url, "deleted": deleted }))
        }
        Command::Activate => {
            let names = CacheNames::new(&config.cache_prefix, &config.cache_version);
            let report = purge_stale(db, &names.current()).await?;
            Ok(serde_json::to_value(report)?)
        }
    }
}
