//! One end-to-end scan: label → messages → sales → report → notification

use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::aggregator::aggregate;
use crate::classifier::classify;
use crate::client::GmailClient;
use crate::decoder;
use crate::error::Result;
use crate::fetcher::MessageFetcher;
use crate::models::{AggregateReport, ParsedMessage, RawMessage};
use crate::notifier::SalesNotifier;
use crate::parser::MessageParser;

/// What a single run found and whether the report went out
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub messages_scanned: usize,
    pub sales: usize,
    pub errors: usize,
    /// `None` when the run found no valid sales
    pub report: Option<AggregateReport>,
    pub delivered: bool,
}

pub struct Pipeline<C, N> {
    fetcher: MessageFetcher<C>,
    parser: MessageParser,
    notifier: N,
    label_name: String,
    function_name: String,
}

impl<C, N> Pipeline<C, N>
where
    C: GmailClient,
    N: SalesNotifier,
{
    pub fn new(
        fetcher: MessageFetcher<C>,
        parser: MessageParser,
        notifier: N,
        label_name: impl Into<String>,
        function_name: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            parser,
            notifier,
            label_name: label_name.into(),
            function_name: function_name.into(),
        }
    }

    pub fn fetcher(&self) -> &MessageFetcher<C> {
        &self.fetcher
    }

    /// Run one scan.
    ///
    /// Retrieval failures abort the run. Messages that fail validation are
    /// logged and left out of the totals, and a failed notification is logged
    /// and reported through [`RunSummary::delivered`].
    pub async fn run_once(&self) -> Result<RunSummary> {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline_run", %run_id, function = %self.function_name);
        self.run_inner(run_id).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid) -> Result<RunSummary> {
        info!("Scanning label '{}'", self.label_name);

        let label_id = self.fetcher.resolve_label_id(&self.label_name).await?;
        let message_ids = self.fetcher.list_message_ids(&label_id).await?;

        let parsed = self
            .fetcher
            .fetch_all_with(&message_ids, |message| self.parse_message(message))
            .await?;

        let results = classify(parsed);

        for record in &results.errors {
            warn!(
                message_id = record.message_id.as_deref().unwrap_or("<missing>"),
                errors = ?record.errors,
                "Error parsing message"
            );
        }

        let mut summary = RunSummary {
            run_id,
            messages_scanned: message_ids.len(),
            sales: results.sales.len(),
            errors: results.errors.len(),
            report: None,
            delivered: false,
        };

        let Some(report) = aggregate(&results.sales) else {
            info!("No new sales found");
            return Ok(summary);
        };

        match self.notifier.report_new_sales(&report).await {
            Ok(()) => {
                info!(
                    total_sold = report.total_tickets_sold,
                    latest_sale = %report.representative_sale.message_id,
                    "Reported new sales"
                );
                summary.delivered = true;
            }
            Err(e) => error!("Error reporting sales: {}", e),
        }

        summary.report = Some(report);
        Ok(summary)
    }

    fn parse_message(&self, message: RawMessage) -> ParsedMessage {
        let text = decoder::decode(message.payload.as_ref());
        let parsed = self.parser.parse(
            message.id.as_deref(),
            message.internal_date.as_deref(),
            &text,
        );
        debug!(
            message_id = parsed.message_id().unwrap_or("<missing>"),
            valid = parsed.is_valid(),
            "Parsed message"
        );
        parsed
    }
}
