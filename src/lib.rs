//! Gmail Ticket Counter
//!
//! Scans a Gmail label for ticket order emails, extracts each sale, totals the
//! tickets sold and posts the latest sale with the running total to a Discord
//! webhook.
//!
//! # Overview
//!
//! A run flows through these stages:
//! - **Fetching**: resolve the label, list every message under it across
//!   pages, retrieve each message in full with bounded concurrency
//! - **Decoding**: flatten the multipart body tree into text
//! - **Parsing**: pull ticket count, buyer name and location out of the text,
//!   producing either a valid sale or a record of what was missing
//! - **Classification & aggregation**: split sales from errors, sum tickets,
//!   pick the first sale in retrieval order as the one to report
//! - **Notification**: post the report; delivery failures are logged only
//!
//! # Example Usage
//!
//! ```no_run
//! use gmail_ticket_counter::{cli, config::Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml".as_ref()).await?;
//!     let pipeline = cli::build_pipeline(&config).await?;
//!
//!     let summary = pipeline.run_once().await?;
//!     println!("{} tickets sold", summary.report.map_or(0, |r| r.total_tickets_sold));
//!
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`aggregator`] - Ticket totals and representative sale
//! - [`auth`] - OAuth2 credentials and Gmail hub construction
//! - [`classifier`] - Sales/error partition
//! - [`cli`] - Command-line interface and pipeline wiring
//! - [`client`] - Gmail API client trait and quota-limited implementation
//! - [`config`] - Configuration management
//! - [`decoder`] - Body tree to text
//! - [`error`] - Error types and result aliases
//! - [`fetcher`] - Label resolution, pagination and concurrent retrieval
//! - [`models`] - Core data structures
//! - [`notifier`] - Discord webhook reporting
//! - [`parser`] - Sale extraction and validation
//! - [`pipeline`] - One end-to-end run
//! - [`rate_limiter`] - Gmail quota token bucket

pub mod aggregator;
pub mod auth;
pub mod classifier;
pub mod cli;
pub mod client;
pub mod config;
pub mod decoder;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod notifier;
pub mod parser;
pub mod pipeline;
pub mod rate_limiter;

// Re-export commonly used types for convenience
pub use error::{CounterError, Result};

// Core data models
pub use models::{
    AggregateReport, BodyNode, InvalidSale, LabelInfo, MessagePage, ParsedMessage, RawMessage,
    SaleNotification, ValidSale,
};

// Pipeline stages
pub use aggregator::aggregate;
pub use classifier::{classify, ClassifiedResults};
pub use decoder::decode;
pub use fetcher::MessageFetcher;
pub use parser::MessageParser;
pub use pipeline::{Pipeline, RunSummary};

// Config types
pub use config::{AuthConfig, Config, GmailConfig, NotifierConfig, ParserConfig, TriggerConfig};

// Client and notifier traits
pub use client::{GmailClient, ProductionGmailClient};
pub use notifier::{DiscordWebhookNotifier, SalesNotifier};

// CLI types (for binary usage)
pub use cli::{Cli, Commands};
