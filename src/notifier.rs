//! Delivery of sales reports to a chat webhook

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::config::NotifierConfig;
use crate::error::{CounterError, Result};
use crate::models::{AggregateReport, SaleNotification};

pub const REPORT_TITLE: &str = ":money_mouth: New Ticket Sales! :money_mouth:";

/// Somewhere a sales report can be sent
#[async_trait]
pub trait SalesNotifier: Send + Sync {
    async fn report_new_sales(&self, report: &AggregateReport) -> Result<()>;
}

/// Posts reports as a Discord embed
pub struct DiscordWebhookNotifier {
    http: reqwest::Client,
    webhook_url: String,
    ticket_capacity: u64,
}

#[derive(Debug, Serialize)]
struct WebhookMessage {
    embeds: Vec<Embed>,
}

#[derive(Debug, Serialize)]
struct Embed {
    title: String,
    fields: Vec<EmbedField>,
    footer: EmbedFooter,
}

#[derive(Debug, Serialize)]
struct EmbedField {
    name: String,
    value: String,
    inline: bool,
}

#[derive(Debug, Serialize)]
struct EmbedFooter {
    text: String,
}

impl DiscordWebhookNotifier {
    pub fn new(webhook_url: impl Into<String>, ticket_capacity: u64) -> Self {
        Self {
            http: reqwest::Client::new(),
            webhook_url: webhook_url.into(),
            ticket_capacity,
        }
    }

    pub fn from_config(config: &NotifierConfig) -> Self {
        Self::new(config.webhook_url.clone(), config.ticket_capacity)
    }

    fn build_message(&self, sale: &SaleNotification) -> WebhookMessage {
        WebhookMessage {
            embeds: vec![Embed {
                title: REPORT_TITLE.to_string(),
                fields: vec![
                    EmbedField {
                        name: "Date".to_string(),
                        value: sale.date.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
                        inline: true,
                    },
                    EmbedField {
                        name: "# Sold".to_string(),
                        value: sale.ticket_count.to_string(),
                        inline: true,
                    },
                ],
                footer: EmbedFooter {
                    text: format!(
                        "TOTAL TICKETS SOLD: {} / {}",
                        sale.total_tickets_sold, self.ticket_capacity
                    ),
                },
            }],
        }
    }
}

#[async_trait]
impl SalesNotifier for DiscordWebhookNotifier {
    async fn report_new_sales(&self, report: &AggregateReport) -> Result<()> {
        let message = self.build_message(&SaleNotification::from(report));

        let response = self
            .http
            .post(&self.webhook_url)
            .json(&message)
            .send()
            .await
            .map_err(|e| CounterError::NotificationError(format!("Webhook request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CounterError::NotificationError(format!(
                "Webhook returned HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        debug!("Webhook accepted report with HTTP {}", status.as_u16());
        Ok(())
    }
}
