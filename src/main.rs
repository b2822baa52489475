//! # Awful Article Crawler
//!
//! A single-site news crawler. Starting from a handful of seed listing pages
//! it discovers article links, fetches each article and extracts its text,
//! title, authors, topics and publication date, then writes one text file and
//! one JSON metadata file per article.
//!
//! ## Usage
//!
//! ```sh
//! awful_article_crawler --config scrapper_config.json --site generic
//! ```
//!
//! ## Architecture
//!
//! 1. **Configuration**: load and validate the run parameters before any I/O
//! 2. **Environment**: reset the assets directory
//! 3. **Discovery**: walk seed and pagination pages, one request at a time
//! 4. **Parsing**: fetch and extract articles (optionally `--workers` at a time)
//! 5. **Output**: `{id}_raw.txt` and `{id}_meta.json` per article

use std::error::Error;
use std::time::Duration;

use clap::Parser;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod crawler;
mod environment;
mod error;
mod fetcher;
mod models;
mod outputs;
mod parser;
mod pipeline;
mod scrapers;
#[cfg(test)]
mod testing;
mod utils;

use cli::Cli;
use fetcher::{HttpFetcher, RetryFetch};
use pipeline::RunOptions;

/// First backoff delay when `--retries` is non-zero.
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("article crawler starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // ---- Validate everything before touching the network or disk ----
    let config = match config::load(&args.config).await {
        Ok(config) => config,
        Err(e) => {
            error!(path = %args.config.display(), kind = ?e.kind(), error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    let Some(schema) = scrapers::schema_for(&args.site) else {
        error!(site = %args.site, known = ?scrapers::SITES, "Unknown site schema");
        return Err(format!(
            "unknown site '{}' (expected one of: {})",
            args.site,
            scrapers::SITES.join(", ")
        )
        .into());
    };

    let fetcher = RetryFetch::new(HttpFetcher::new(&config)?, args.retries, RETRY_BASE_DELAY);
    let options = RunOptions {
        assets_dir: args.assets_dir.clone(),
        workers: usize::from(args.workers),
        deadline: args.deadline_secs.map(Duration::from_secs),
    };

    let summary = match pipeline::run(&config, &fetcher, schema.as_ref(), &options).await {
        Ok(summary) => summary,
        Err(e) => {
            error!(path = %options.assets_dir.display(), error = %e, "Output directory is unusable");
            return Err(e.into());
        }
    };

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        discovered = summary.discovered,
        parsed = summary.parsed,
        dropped = summary.dropped,
        persisted = summary.persisted,
        "Execution complete"
    );

    Ok(())
}
