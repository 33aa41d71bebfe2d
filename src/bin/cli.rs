//! Sticker Crawler CLI
//!
//! Local execution entry point.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sticker_crawler::{
    config,
    error::Result,
    models::Config,
    pipeline,
    storage::{SeenLedger, SqliteLedger},
};

/// Sticker Crawler - marketplace sticker alerts
#[derive(Parser, Debug)]
#[command(
    name = "sticker-crawler",
    version,
    about = "Scans marketplace listings for wanted stickers and sends alerts"
)]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Keyword file, one sticker keyword per line (used when present)
    #[arg(short, long, default_value = "stickers.txt")]
    keywords: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one full scrape: discover, match, alert
    Run,

    /// Validate configuration, keywords and credentials
    Validate,

    /// Show ledger location and size
    Info,
}

/// Initialize logging. `--verbose` wins over the configured level; `RUST_LOG` wins over both.
fn init_logging(verbose: bool, configured: Option<&str>) {
    let level = if verbose {
        "debug"
    } else {
        configured.unwrap_or("info")
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let configured_level = Config::load(&cli.config).ok().map(|c| c.logging.level);
    init_logging(cli.verbose, configured_level.as_deref());

    log::info!("Sticker Crawler starting...");

    match cli.command {
        Command::Run => {
            let config = config::load_all(&cli.config, &cli.keywords)?;
            let credentials = config::load_credentials()?;
            log::info!("Loaded configuration from {}", cli.config.display());

            let summary = pipeline::run_scraper(&config, credentials).await?;
            for (stage, e) in summary.failures() {
                log::debug!("{} failure: {}", stage, e);
            }

            log::info!("Run complete!");
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            let config = match config::load_all(&cli.config, &cli.keywords) {
                Ok(config) => config,
                Err(e) => {
                    log::error!("Config validation failed: {}", e);
                    return Err(e);
                }
            };
            log::info!(
                "✓ Config OK ({} keyword(s), workers {}/{}/{})",
                config.keywords.len(),
                config.workers.group,
                config.workers.item,
                config.workers.notify
            );

            if let Err(e) = config::load_credentials() {
                log::error!("Credential check failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Credentials present");

            log::info!("All validations passed!");
        }

        Command::Info => {
            let config = Config::load_or_default(&cli.config);
            log::info!("Config file: {}", cli.config.display());
            log::info!("Ledger: {}", config.ledger.path);

            let ledger = SqliteLedger::open(&config.ledger.path, config.ledger.retention()).await?;
            log::info!(
                "Items seen in the last {} day(s): {}",
                config.ledger.retention_days,
                ledger.count().await?
            );
            ledger.close().await;
        }
    }

    log::info!("Done!");

    Ok(())
}
