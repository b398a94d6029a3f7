use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use review_notifier::{
    logging, Config, CsvLedger, Notifier, Orchestrator, Overrides, PlayStoreClient, RatingRange,
    ServiceAccountKey,
};

#[derive(Parser)]
#[command(name = "review-notifier")]
#[command(about = "Announce new Google Play reviews to a chat webhook")]
struct Cli {
    /// Only announce ratings in this inclusive range, e.g. 1-3
    range: Option<String>,

    /// Path to YAML config file
    #[arg(long, default_value = review_notifier::config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Application package to read reviews for
    #[arg(long, env = "PACKAGE_NAME")]
    package_name: Option<String>,

    /// Chat webhook endpoint
    #[arg(long, env = "WEBHOOK_URL", hide_env_values = true)]
    webhook_url: Option<String>,

    /// Service account key file
    #[arg(long, env = "KEY_PATH")]
    key_path: Option<PathBuf>,

    /// Review state file
    #[arg(long, env = "REVIEWS_CSV")]
    reviews_csv: Option<PathBuf>,

    /// Directory for daily log files
    #[arg(long, env = "LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Log notifications instead of sending them (true/false)
    #[arg(long, env = "TEST_MODE")]
    test_mode: Option<String>,

    /// Delay after each notification, in milliseconds
    #[arg(long, env = "PACING_DELAY_MS")]
    pacing_delay_ms: Option<u64>,

    /// Page size for the reviews listing
    #[arg(long, env = "MAX_RESULTS")]
    max_results: Option<u32>,

    /// Play Developer API base URL
    #[arg(long, env = "PLAY_API_BASE_URL", hide = true)]
    api_base_url: Option<String>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            package_name: self.package_name.clone(),
            webhook_url: self.webhook_url.clone(),
            key_path: self.key_path.clone(),
            reviews_csv: self.reviews_csv.clone(),
            log_dir: self.log_dir.clone(),
            test_mode: self.test_mode.clone(),
            pacing_delay_ms: self.pacing_delay_ms,
            max_results: self.max_results,
            api_base_url: self.api_base_url.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Must run before clap reads env-backed arguments
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = match Config::load(&cli.config) {
        Ok(config) => config.apply(cli.overrides()),
        Err(e) => {
            // Log to the default or overridden directory so the failure lands in the daily file
            let fallback = Config::fallback(cli.overrides());
            if logging::init(&fallback.log_dir).is_ok() {
                error!("{:#}", e);
            }
            return Err(e);
        }
    };

    let log_file = logging::init(&config.log_dir)?;

    match dotenv {
        Ok(path) => info!(path = %path.display(), "Loaded .env file"),
        Err(e) => warn!(error = %e, ".env file not found"),
    }
    info!(log_file = %log_file.display(), "Logging initialized");

    if let Err(e) = run(&cli, config).await {
        error!("{:#}", e);
        return Err(e);
    }

    Ok(())
}

async fn run(cli: &Cli, config: Config) -> Result<()> {
    let range = cli
        .range
        .as_deref()
        .map(str::parse::<RatingRange>)
        .transpose()
        .context("Failed to parse rating range")?;

    if let Some(range) = range {
        info!(start = range.start, end = range.end, "Filtering reviews by rating");
    }

    let key = ServiceAccountKey::from_file(&config.key_path)?;

    let source = PlayStoreClient::new(key, config.package_name.clone())?
        .with_base_url(&config.api_base_url)
        .with_max_results(config.max_results);
    let ledger = CsvLedger::new(&config.reviews_csv);
    let notifier = Notifier::new(config.notifier_config());

    info!(
        package = %config.package_name,
        state_file = %config.reviews_csv.display(),
        test_mode = config.test_mode,
        "Configuration loaded"
    );

    let report = Orchestrator::new(source, ledger, notifier, range).run().await?;

    println!(
        "{} new review(s) announced, {} fetched, {} stored",
        report.new_reviews().len(),
        report.fetched,
        report.stored
    );

    Ok(())
}
