use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use epg_combiner::{
    config::Config, generator::XmltvGenerator, ingestor::EpgIngestor, merge::GuideMerger,
};

#[derive(Parser)]
#[command(name = "epg-combiner")]
#[command(version)]
#[command(about = "Combines multiple XMLTV EPG sources into a single guide file")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Output file path (overrides config file)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Number of parallel downloads (overrides config file)
    #[arg(short = 'w', long, value_name = "N")]
    concurrency: Option<usize>,

    /// Per-source timeout in seconds (overrides config file)
    #[arg(short, long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// List the configured sources and exit
    #[arg(short, long)]
    list_sources: bool,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with specified level
    let log_filter = format!("epg_combiner={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting EPG Combiner v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config);

    // Override config with CLI arguments
    if let Some(output) = cli.output {
        config.output.path = output;
    }
    if let Some(concurrency) = cli.concurrency {
        config.fetch.concurrency = concurrency;
    }
    if let Some(timeout) = cli.timeout {
        config.fetch.timeout_seconds = timeout;
    }

    if cli.list_sources {
        println!("Configured EPG sources:");
        for source in &config.sources {
            println!("  {}: {}", source.name, source.url);
        }
        return Ok(());
    }

    let sources = config.active_sources();
    if sources.is_empty() {
        anyhow::bail!("No usable EPG sources configured in {}", cli.config);
    }

    let ingestor = EpgIngestor::new(&config.fetch)?;
    let merger = GuideMerger::new(ingestor, config.fetch.concurrency);

    let (guide, report) = merger.merge_sources(&sources).await;

    for skipped in &report.skipped {
        warn!("Skipped source '{}': {}", skipped.name, skipped.reason);
    }

    if report.all_failed() {
        anyhow::bail!(
            "All {} EPG sources failed; output file not updated",
            report.sources_total
        );
    }

    let generator = XmltvGenerator::new();
    generator.write_guide(&guide, &config.output.path).await?;

    if !report.skipped.is_empty() {
        warn!(
            "Run completed with {}/{} sources skipped",
            report.skipped.len(),
            report.sources_total
        );
    }

    Ok(())
}
