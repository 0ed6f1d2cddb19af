use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::Parser;
use mopswatch_core::{RangeMode, enumerate, export_csv};
use mopswatch_sync::{
    CookieCache, CredentialProvider, HarvestConfig, MopsClient, PortalSession, RetryController,
    harvest,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod report;

/// Collect board resolutions to issue convertible bonds from MOPS disclosures.
#[derive(Parser, Debug)]
#[command(name = "mopswatch", version, about, long_about = None)]
struct Cli {
    /// Date range: `single` (today only) or `range` (start year through today)
    #[arg(short, long, env = "MOPSWATCH_MODE", default_value = "single")]
    mode: String,

    /// First ROC era year to query in `range` mode (e.g. 108 for 2019)
    #[arg(short, long, env = "MOPSWATCH_START_YEAR")]
    start_year: Option<i32>,

    /// JSON config file; flags override its values
    #[arg(short, long, env = "MOPSWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// CSV output path
    #[arg(short, long, env = "MOPSWATCH_OUTPUT")]
    output: Option<PathBuf>,

    /// Cookie cache file
    #[arg(long, env = "MOPSWATCH_COOKIE_CACHE")]
    cookie_cache: Option<PathBuf>,

    /// Portal origin
    #[arg(long, env = "MOPSWATCH_BASE_URL")]
    base_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, env = "MOPSWATCH_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Attempts per date, including the first
    #[arg(long, env = "MOPSWATCH_MAX_ATTEMPTS")]
    max_attempts: Option<u32>,

    /// Pause after each date, in milliseconds
    #[arg(long, env = "MOPSWATCH_POLITENESS_MS")]
    politeness_ms: Option<u64>,

    /// Gregorian date to treat as today (YYYY-MM-DD)
    #[arg(long)]
    today: Option<NaiveDate>,

    /// Print the date range and exit without sending requests
    #[arg(long)]
    dry_run: bool,

    /// Log filter when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, env = "MOPSWATCH_LOG", default_value = "info")]
    log_level: String,
}

impl Cli {
    /// File config (or defaults) with command-line overrides applied.
    fn resolve_config(&self) -> anyhow::Result<HarvestConfig> {
        let mut config = match &self.config {
            Some(path) => HarvestConfig::load(path)?,
            None => HarvestConfig::default(),
        };
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if let Some(cache) = &self.cookie_cache {
            config.cookie_cache = cache.clone();
        }
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        if let Some(secs) = self.timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(n) = self.max_attempts {
            config.retry.max_attempts = n;
        }
        if let Some(ms) = self.politeness_ms {
            config.retry.politeness_delay = Duration::from_millis(ms);
        }
        Ok(config)
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    info!("mopswatch v{}", env!("CARGO_PKG_VERSION"));
    run(cli).await
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let started = Instant::now();

    // Everything that can be wrong with the arguments fails here, before any request.
    let config = cli.resolve_config()?;
    let mode: RangeMode = cli.mode.parse()?;
    let today = cli.today.unwrap_or_else(|| Local::now().date_naive());
    let dates = enumerate(mode, cli.start_year, today)?;

    let (Some(first), Some(last)) = (dates.first(), dates.last()) else {
        anyhow::bail!("date range is empty");
    };
    info!(mode = %mode, first = %first, last = %last, count = dates.len(), "date range");
    if cli.dry_run {
        println!("{mode}: {} dates from {first} to {last}", dates.len());
        return Ok(());
    }

    let session = PortalSession::new(
        &config.base_url,
        CookieCache::new(&config.cookie_cache),
        config.request_timeout,
    )
    .context("building session client")?;
    let credentials = session
        .get_credentials()
        .await
        .context("acquiring session cookies")?;

    let client = MopsClient::new(&config.base_url, config.request_timeout)
        .context("building API client")?;
    let controller = RetryController::new(config.retry.clone());

    let result = harvest(&client, &credentials, &dates, &controller).await;

    report::write_summary(
        &mut std::io::stderr().lock(),
        &result,
        started.elapsed().as_secs_f64(),
    )?;

    export_csv(&config.output, &result.announcements)
        .with_context(|| format!("writing {}", config.output.display()))?;
    eprintln!(
        "Saved {} rows to {}",
        result.announcements.len(),
        config.output.display()
    );
    Ok(())
}
