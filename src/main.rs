//! Catalog-Harvester main entry point
//!
//! This is the command-line interface for the Catalog-Harvester crawler.

use anyhow::Context;
use catalog_harvester::config::{compute_config_hash, load_config_with_hash, Config};
use catalog_harvester::crawler::run_crawl;
use catalog_harvester::output::{load_store_summary, print_statistics, print_store_summary};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Catalog-Harvester: a paginated catalog crawler
///
/// Walks every listing page of the catalog, extracts each product's detail
/// page, and appends the records to a JSON array file and a CSV file.
#[derive(Parser, Debug)]
#[command(name = "catalog-harvester")]
#[command(version = "1.0.0")]
#[command(about = "A paginated catalog crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Truncate both output stores before crawling instead of appending
    #[arg(long)]
    fresh: bool,

    /// Show the resolved configuration without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Summarize the products already in the JSON store and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => load(path)?,
        None => {
            let config = Config::default();
            let hash = compute_config_hash(&config)
                .context("failed to hash default configuration")?;
            tracing::info!("No configuration file given, using defaults (hash: {})", hash);
            config
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_harvester=info,warn"),
            1 => EnvFilter::new("catalog_harvester=debug,info"),
            2 => EnvFilter::new("catalog_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn load(path: &Path) -> anyhow::Result<Config> {
    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);
    Ok(config)
}

/// Handles the --dry-run mode
fn handle_dry_run(config: &Config) {
    println!("=== Catalog-Harvester Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Start URL: {}", config.crawler.start_url);
    println!("  Page parameter: {}", config.crawler.page_param);
    println!("  User agent: {}", config.crawler.user_agent);
    println!("  Request timeout: {}ms", config.crawler.request_timeout_ms);
    println!(
        "  End-of-pages statuses: {:?}",
        config.crawler.end_of_pages_status
    );
    match config.crawler.max_pages {
        Some(max) => println!("  Max pages: {}", max),
        None => println!("  Max pages: unbounded"),
    }

    println!("\nOutput:");
    println!("  JSON store: {}", config.output.json_path);
    println!("  CSV store: {}", config.output.csv_path);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("JSON store: {}\n", config.output.json_path);
    let summary = load_store_summary(Path::new(&config.output.json_path))
        .context("failed to read the JSON store")?;
    print_store_summary(&summary);
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh crawl (output stores will be truncated)");
    } else {
        tracing::info!("Starting crawl (appending to existing output stores)");
    }

    match run_crawl(config, fresh).await {
        Ok(stats) => {
            print_statistics(&stats);
            Ok(())
        }
        Err(e) => {
            if let Some(page) = e.last_completed_page() {
                eprintln!("Crawl halted; last completed listing page: {}", page);
            }
            Err(e).context("crawl failed")
        }
    }
}
