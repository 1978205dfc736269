//! Command-line interface

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

use crate::auth::{self, GmailCredentials};
use crate::client::ProductionGmailClient;
use crate::config::Config;
use crate::error::Result;
use crate::fetcher::MessageFetcher;
use crate::notifier::DiscordWebhookNotifier;
use crate::parser::MessageParser;
use crate::pipeline::{Pipeline, RunSummary};
use crate::rate_limiter::QuotaRateLimiter;

pub type ProductionPipeline = Pipeline<ProductionGmailClient, DiscordWebhookNotifier>;

#[derive(Parser, Debug)]
#[command(name = "ticket-counter")]
#[command(version)]
#[command(about = "Counts ticket sales from labeled Gmail messages and reports them to Discord", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan the label once and report
    Run,

    /// Scan repeatedly until interrupted
    Watch {
        /// Seconds between scans (overrides trigger.interval_secs)
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Authorize Gmail read access in a browser and write an OAuth2 token file
    Authorize {
        /// OAuth client file downloaded from the Cloud console
        #[arg(long, default_value = "credentials.json")]
        credentials: PathBuf,

        /// Where to write the authorized_user token
        #[arg(short, long, default_value = "token.json")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },

    /// Generate example configuration file
    InitConfig {
        /// Path to create config file
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run the consent flow and save the resulting token
pub async fn authorize(credentials: &Path, output: &Path) -> Result<()> {
    info!("Starting Gmail authorization with client {:?}", credentials);
    let token = auth::authorize_installed_app(credentials).await?;
    token.save(output).await
}

/// Authenticate and wire up the production pipeline
pub async fn build_pipeline(config: &Config) -> Result<ProductionPipeline> {
    let credentials = GmailCredentials::from_config(&config.auth).await?;
    info!("Authenticating with Gmail API...");
    let hub = auth::initialize_gmail_hub(credentials).await?;

    let client = ProductionGmailClient::new(hub, QuotaRateLimiter::from_config(&config.gmail));
    let fetcher = MessageFetcher::new(client, config.gmail.max_concurrent_requests);

    Ok(Pipeline::new(
        fetcher,
        MessageParser::new(&config.parser),
        DiscordWebhookNotifier::from_config(&config.notifier),
        config.gmail.label_name.clone(),
        config.trigger.function_name.clone(),
    ))
}

/// Run one scan and log the Gmail quota spent so far
pub async fn run_once(pipeline: &ProductionPipeline) -> Result<RunSummary> {
    let result = pipeline.run_once().await;

    let stats = pipeline.fetcher().client().quota().stats().await;
    info!(
        calls = stats.calls,
        units_consumed = stats.units_consumed,
        available_units = stats.available_units,
        "Gmail quota usage"
    );

    result
}

/// Run the pipeline on a fixed interval until Ctrl-C.
///
/// A failed run is logged and the next tick runs as usual.
pub async fn watch(pipeline: &ProductionPipeline, interval: Duration) -> Result<()> {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    info!("Watching for sales every {:?}", interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match run_once(pipeline).await {
                    Ok(summary) => print_summary(&summary),
                    Err(e) => error!("Run failed: {}", e),
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                info!("Interrupted, stopping watch");
                return Ok(());
            }
        }
    }
}

pub fn print_summary(summary: &RunSummary) {
    println!("\n========================================");
    println!("Ticket Sales Run Summary");
    println!("========================================");
    println!("Run ID: {}", summary.run_id);
    println!("Messages scanned: {}", summary.messages_scanned);
    println!("Valid sales: {}", summary.sales);
    println!("Messages with errors: {}", summary.errors);
    match &summary.report {
        Some(report) => {
            println!("Total tickets sold: {}", report.total_tickets_sold);
            println!(
                "Latest sale: {} ticket(s) on {} (message {})",
                report.representative_sale.ticket_count,
                report.representative_sale.date.format("%Y-%m-%d %H:%M:%S UTC"),
                report.representative_sale.message_id
            );
            println!(
                "Notification: {}",
                if summary.delivered { "delivered" } else { "FAILED" }
            );
        }
        None => println!("No new sales found"),
    }
}
