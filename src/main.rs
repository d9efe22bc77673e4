use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use gleaner::config::Config;
use gleaner::crawl::{crawl_channel, spawn_pool, CrawlWorker};
use gleaner::feed::FeedFetcher;
use gleaner::storage::Database;

/// Get the config directory path (~/.config/gleaner/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("gleaner"))
}

#[derive(Parser, Debug)]
#[command(
    name = "gleaner",
    about = "Personal feed ingestion service: crawls every registered feed once and exits"
)]
struct Args {
    /// Config file path (defaults to ~/.config/gleaner/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Database file path (overrides the config file)
    #[arg(long, value_name = "FILE")]
    database: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
    }

    let config_path = args
        .config
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path).context("Failed to load configuration")?;

    let db_path = args
        .database
        .or_else(|| config.database_path.clone())
        .unwrap_or_else(|| {
            config_dir
                .join("gleaner.db")
                .to_string_lossy()
                .into_owned()
        });

    let db = Database::open(&db_path)
        .await
        .with_context(|| format!("Failed to open database at {}", db_path))?;

    let client = reqwest::Client::builder()
        .user_agent(concat!("gleaner/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;
    let fetcher = FeedFetcher::new(client, config.fetch_timeout());

    let (trigger, queue) = crawl_channel(config.queue_capacity);
    let handles = spawn_pool(CrawlWorker::new(db.clone(), fetcher), queue, config.workers);

    // One-shot mode: enqueue a crawl for every registered feed, then let the
    // pool drain. Recrawl cadence belongs to an external scheduler.
    let feeds = db.all_feeds().await.context("Failed to list feeds")?;
    tracing::info!(feeds = feeds.len(), workers = config.workers, "Starting crawl");

    for feed in &feeds {
        trigger
            .enqueue(feed.id)
            .await
            .context("Crawl queue closed before all feeds were enqueued")?;
    }
    drop(trigger);

    for handle in handles {
        handle.await.context("Crawl worker panicked")?;
    }

    tracing::info!("Crawl complete");
    Ok(())
}
