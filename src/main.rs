//! Fedimap main entry point
//!
//! This is the command-line interface for the Fedimap federation mapper.

use clap::Parser;
use fedimap::config::{load_config_with_hash, Config};
use fedimap::shutdown::Shutdown;
use fedimap::state::{EdgeStatus, InstanceType};
use fedimap::storage::{NodeFilter, SqliteStorage, Storage};
use fedimap::{crawler, edges};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Fedimap: a federation topology mapper
///
/// Fedimap discovers the servers of a federated network by following each
/// server's declared peers, classifies them against a target protocol, and
/// derives an undirected edge list of validated inter-server links.
#[derive(Parser, Debug)]
#[command(name = "fedimap")]
#[command(version = "1.0.0")]
#[command(about = "A federation topology mapper", long_about = None)]
#[command(group(clap::ArgGroup::new("mode").multiple(false)))]
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

    /// Validate the neighbors of confirmed nodes instead of crawling
    #[arg(long, group = "mode")]
    validate_edges: bool,

    /// Write the edge list from validated nodes and exit
    #[arg(long, group = "mode")]
    export_edges: bool,

    /// Crawl, validate, then export the edge list
    #[arg(long, group = "mode")]
    pipeline: bool,

    /// Show statistics from the database and exit
    #[arg(long, group = "mode")]
    stats: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, group = "mode")]
    dry_run: bool,

    /// Put errored nodes and unfinished edge validations back in the queue
    #[arg(long, group = "mode")]
    requeue_errors: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.export_edges {
        handle_export_edges(&config)?;
    } else if cli.requeue_errors {
        handle_requeue_errors(&config)?;
    } else if cli.validate_edges {
        handle_validate(&config, &config_hash, Shutdown::on_ctrl_c()).await?;
    } else if cli.pipeline {
        handle_pipeline(&config, &config_hash).await?;
    } else {
        handle_crawl(&config, &config_hash, Shutdown::on_ctrl_c()).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("fedimap=info,warn"),
            1 => EnvFilter::new("fedimap=debug,info"),
            2 => EnvFilter::new("fedimap=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Fedimap Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Batch size: {}", config.crawler.batch_size);
    println!("  Concurrency: {}", config.crawler.concurrency);
    println!("  Protocol: {}", config.protocol.name);

    println!("\nFetch:");
    println!("  Scheme: {}", config.fetch.scheme);
    println!("  Connect timeout: {}ms", config.fetch.connect_timeout_ms);
    println!("  Request timeout: {}ms", config.fetch.read_timeout_ms);
    println!("  Hard deadline: {}ms", config.fetch.deadline_ms);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Edges: {}", config.output.edges_path);

    println!("\nSeeds ({}):", config.crawler.seeds.len());
    for seed in &config.crawler.seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
    if Path::new(&config.output.database_path).exists() {
        let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
        let frontier =
            storage.count_where(&NodeFilter::instance_type(InstanceType::Unclassified))?;
        println!("✓ Would resume with {} unclassified nodes", frontier);
    } else {
        println!(
            "✓ Would start crawling from {} seeds",
            config.crawler.seeds.len()
        );
    }

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use fedimap::output::{load_statistics, print_statistics};

    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export-edges mode: writes the edge list
fn handle_export_edges(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Exporting Edge List ===\n");
    println!("Database: {}", config.output.database_path);
    println!("Output: {}", config.output.edges_path);
    println!();

    let report = edges::export(config)?;

    println!(
        "✓ {} edges between {} nodes exported to: {}",
        report.edges,
        report.nodes,
        report.path.display()
    );

    Ok(())
}

/// Handles the --requeue-errors mode
fn handle_requeue_errors(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut storage = SqliteStorage::new(Path::new(&config.output.database_path))?;

    let nodes = storage.requeue_instances(InstanceType::Error)?;
    println!("✓ {} errored nodes returned to the frontier", nodes);

    let mut validations = 0;
    for status in EdgeStatus::all_statuses() {
        if status.is_retryable() {
            validations += storage.reset_edge_status(status)?;
        }
    }
    println!("✓ {} edge validations queued again", validations);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: &Config,
    config_hash: &str,
    shutdown: Shutdown,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Crawling for protocol '{}' with batch size {} and concurrency {}",
        config.protocol.name,
        config.crawler.batch_size,
        config.crawler.concurrency
    );

    match crawler::crawl(config, config_hash, shutdown).await {
        Ok(report) => {
            tracing::info!(
                "Crawl {}: {} nodes in {} rounds ({} confirmed, {} partial, {} not of protocol, {} failed), {} discovered",
                if report.interrupted { "interrupted" } else { "completed" },
                report.processed,
                report.rounds,
                report.confirmed,
                report.partial,
                report.not_of_protocol,
                report.failed,
                report.discovered
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

/// Handles the --validate-edges mode
async fn handle_validate(
    config: &Config,
    config_hash: &str,
    shutdown: Shutdown,
) -> Result<(), Box<dyn std::error::Error>> {
    match edges::validate(config, config_hash, shutdown).await {
        Ok(report) => {
            tracing::info!(
                "Validation {}: {} nodes against {} confirmed ({} success, {} peers unreachable, {} blocklist unreachable, {} failed)",
                if report.interrupted { "interrupted" } else { "completed" },
                report.processed,
                report.snapshot_size,
                report.success,
                report.peers_unreachable,
                report.blocklist_unreachable,
                report.failed
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Validation failed: {}", e);
            Err(e.into())
        }
    }
}

/// Handles the --pipeline mode: crawl, validate, export
async fn handle_pipeline(config: &Config, config_hash: &str) -> Result<(), Box<dyn std::error::Error>> {
    let shutdown = Shutdown::on_ctrl_c();

    handle_crawl(config, config_hash, shutdown.clone()).await?;
    if shutdown.is_triggered() {
        tracing::warn!("Stopping pipeline after interrupted crawl");
        return Ok(());
    }

    handle_validate(config, config_hash, shutdown.clone()).await?;
    if shutdown.is_triggered() {
        tracing::warn!("Stopping pipeline after interrupted validation");
        return Ok(());
    }

    handle_export_edges(config)
}
