//! Listing-Crawler main entry point
//!
//! This is the command-line interface for the listing crawler.

use anyhow::Context;
use clap::Parser;
use listing_crawler::config::{load_config_with_hash, Config};
use listing_crawler::crawler::{load_aliases, run_crawl};
use listing_crawler::fetch::HttpFetcher;
use listing_crawler::output::{load_store_statistics, print_run_report, print_store_statistics};
use listing_crawler::schema::Schema;
use listing_crawler::storage::{CsvStorage, Storage};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Listing-Crawler: a classifieds listing harvester
///
/// Walks the paginated index pages of a listing search, extracts the
/// attributes of every listing, and appends them as rows of a fixed schema
/// to a CSV store.
#[derive(Parser, Debug)]
#[command(name = "listing-crawler")]
#[command(version = "1.0.0")]
#[command(about = "A classifieds listing harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config, alias table and store header without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics of the record store and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Override the configured index page bound
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    max_pages: Option<u32>,

    /// Also append log output to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(max_pages) = cli.max_pages {
        config.crawl.max_pages = max_pages;
    }

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// A log file, when given, receives the same events without ANSI colors.
fn setup_logging(verbose: u8, quiet: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("listing_crawler=info,warn"),
            1 => EnvFilter::new("listing_crawler=debug,info"),
            2 => EnvFilter::new("listing_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let console = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);

    let file = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();
    Ok(())
}

/// Handles the --dry-run mode: validates everything a run would touch
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Listing-Crawler Dry Run ===\n");

    println!("Crawl Configuration:");
    println!("  Entry URL: {}", config.crawl.entry_url);
    println!("  Max index pages: {}", config.crawl.max_pages);
    println!("  Request delay: {}ms", config.crawl.request_delay_ms);
    println!("  Wait timeout: {}ms", config.crawl.wait_timeout_ms);

    println!("\nFetcher:");
    println!("  User agent: {}", config.fetcher.user_agent);
    println!("  Request timeout: {}s", config.fetcher.request_timeout_secs);

    let schema = Schema::listing();
    let aliases = load_aliases(&config.output, &schema).context("Failed to load alias table")?;
    println!("\nAlias Table:");
    match &config.output.alias_path {
        Some(path) => {
            println!("  Path: {}", path);
            println!("  Version: {}", aliases.version());
            println!("  Aliases: {}", aliases.len());
            println!("  SHA-256: {}", aliases.fingerprint());
        }
        None => println!("  (none)"),
    }

    println!("\nOutput:");
    println!("  Store: {}", config.output.store_path);
    println!("  Null marker: {}", config.output.null_marker);
    println!("  Columns: {}", schema.len());

    let store_path = Path::new(&config.output.store_path);
    if store_path.exists() {
        let store = CsvStorage::open(store_path, schema, &config.output.null_marker)
            .context("Existing store is not usable")?;
        println!("  Existing rows: {}", store.row_count());
    } else {
        println!("  Existing rows: 0 (store will be created)");
    }

    println!("\nField Probes ({}):", config.selectors.probes.len());
    for probe in &config.selectors.probes {
        println!("  - {}", probe.field);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would crawl up to {} index pages from {}",
        config.crawl.max_pages, config.crawl.entry_url
    );

    Ok(())
}

/// Handles the --stats mode: shows statistics from the record store
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Store: {}\n", config.output.store_path);

    let stats = load_store_statistics(
        Path::new(&config.output.store_path),
        &config.output.null_marker,
    )
    .with_context(|| format!("Failed to read store {}", config.output.store_path))?;

    print_store_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    let fetcher = HttpFetcher::new(&config.fetcher).context("Failed to build HTTP client")?;

    // Ctrl-C closes the session; the crawl sees it as a fatal error and
    // still flushes what it has
    let session = fetcher.session_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, closing fetch session");
            session.close();
        }
    });

    match run_crawl(&config, fetcher).await {
        Ok(report) => {
            print_run_report(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
