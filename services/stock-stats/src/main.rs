//! Stock Statistics replay tool
//!
//! Reads JSON-lines level-one ticks, folds them into per-window statistics
//! and writes one JSON record per window to stdout.

use anyhow::{Context, Result};
use clap::Parser;
use common::Tick;
use std::path::PathBuf;
use std::sync::Arc;
use stock_stats::{StatsConfig, StatsService};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SERVICE_NAME: &str = "stock-stats";

/// Fold level-one ticks into per-window statistics
#[derive(Debug, Parser)]
#[command(name = SERVICE_NAME, version, about)]
struct Args {
    /// JSON-lines tick file, or `-` for stdin
    #[arg(short, long, default_value = "-")]
    input: String,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;
    let args = Args::parse();

    info!("Starting Stock Stats v{}", env!("CARGO_PKG_VERSION"));

    let config = match &args.config {
        Some(path) => StatsConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => StatsConfig::default(),
    };

    let ticks = if args.input == "-" {
        read_ticks(BufReader::new(tokio::io::stdin())).await?
    } else {
        let file = tokio::fs::File::open(&args.input)
            .await
            .with_context(|| format!("opening {}", args.input))?;
        read_ticks(BufReader::new(file)).await?
    };
    info!("Read {} ticks", ticks.len());

    let service = Arc::new(StatsService::new(&config)?);
    Arc::clone(&service).ingest(ticks).await;

    let mut stdout = tokio::io::stdout();
    for record in service.snapshot().await {
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');
        stdout.write_all(&line).await?;
    }
    stdout.flush().await?;

    let stats = service.stats().await;
    info!(
        "Processed {} ticks into {} windows, rejected {}",
        stats.processed, stats.windows, stats.rejected
    );
    Ok(())
}

/// Parse JSON-lines ticks, skipping blank and malformed lines
async fn read_ticks<R: AsyncBufRead + Unpin>(reader: R) -> Result<Vec<Tick>> {
    let mut lines = reader.lines();
    let mut ticks = Vec::new();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Tick>(&line) {
            Ok(tick) => ticks.push(tick),
            Err(e) => warn!("Skipping malformed tick on line {}: {}", line_no, e),
        }
    }

    Ok(ticks)
}

/// Initialize tracing with environment filter
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=info", SERVICE_NAME.replace('-', "_")).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    Ok(())
}
