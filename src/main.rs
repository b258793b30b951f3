//! Imagefinder command-line interface
//!
//! Runs one crawl session against a seed URL and prints the discovered
//! images, with metadata, as JSON.

use clap::Parser;
use imagefinder::config::{load_config, validate, Config};
use imagefinder::Crawler;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Imagefinder: a polite single-site web image harvester
#[derive(Parser, Debug)]
#[command(name = "imagefinder")]
#[command(version = "1.0.0")]
#[command(about = "Crawl one site and list every image it references", long_about = None)]
struct Cli {
    /// Seed URL to crawl
    #[arg(value_name = "URL")]
    url: String,

    /// Maximum number of pages to fetch
    #[arg(long)]
    max_pages: Option<usize>,

    /// Number of concurrent workers
    #[arg(long)]
    workers: Option<usize>,

    /// Politeness delay between requests, in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)?
        }
        None => Config::default(),
    };

    if let Some(max_pages) = cli.max_pages {
        config.crawler.max_pages = max_pages;
    }
    if let Some(workers) = cli.workers {
        config.crawler.workers = workers;
    }
    if let Some(delay_ms) = cli.delay_ms {
        config.crawler.crawl_delay_ms = delay_ms;
    }
    validate(&config)?;

    let crawler = Crawler::new(&cli.url, config)?;
    let result = crawler.crawl().await;

    let records: Vec<_> = result
        .images
        .iter()
        .filter_map(|url| result.metadata.get(url))
        .collect();

    println!("{}", serde_json::to_string_pretty(&records)?);

    tracing::info!(
        "Found {} images across {} pages",
        result.images.len(),
        crawler.pages_processed()
    );

    Ok(())
}

/// Sets up the tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("imagefinder=info,warn"),
            1 => EnvFilter::new("imagefinder=debug,info"),
            2 => EnvFilter::new("imagefinder=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
