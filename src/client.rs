//! Gmail API client for label lookup, message listing and full message retrieval

use async_trait::async_trait;
use google_gmail1::api::{ListLabelsResponse, ListMessagesResponse, Message};
use std::sync::Arc;
use tracing::debug;

use crate::auth::{GmailHub, READONLY_SCOPE};
use crate::error::Result;
use crate::models::{LabelInfo, MessagePage, RawMessage};
use crate::rate_limiter::{QuotaCost, QuotaRateLimiter};

/// Largest page `messages.list` will return
pub const MAX_PAGE_SIZE: u32 = 500;

/// The retrieval calls the counter makes, kept behind a trait for testing
#[async_trait]
pub trait GmailClient: Send + Sync {
    /// Every label in the mailbox
    async fn list_labels(&self) -> Result<Vec<LabelInfo>>;

    /// One page of message ids under a label
    async fn list_messages_page(
        &self,
        label_id: &str,
        page_token: Option<&str>,
    ) -> Result<MessagePage>;

    /// A message with its full body tree
    async fn get_message(&self, id: &str) -> Result<RawMessage>;
}

/// Gmail client backed by the `google-gmail1` hub.
///
/// Every call waits for quota from a shared [`QuotaRateLimiter`]; there is no
/// retry, a failed call surfaces as [`crate::CounterError::Transport`].
pub struct ProductionGmailClient {
    hub: GmailHub,
    quota: QuotaRateLimiter,
}

impl ProductionGmailClient {
    /// Wrap an authorized hub (see [`crate::auth::initialize_gmail_hub`])
    pub fn new(hub: GmailHub, quota: QuotaRateLimiter) -> Self {
        Self { hub, quota }
    }

    /// Shared quota limiter used by this client
    pub fn quota(&self) -> &QuotaRateLimiter {
        &self.quota
    }
}

fn labels_from_api(response: ListLabelsResponse) -> Vec<LabelInfo> {
    response
        .labels
        .unwrap_or_default()
        .into_iter()
        .filter_map(|label| match (label.id, label.name) {
            (Some(id), Some(name)) => Some(LabelInfo { id, name }),
            _ => None,
        })
        .collect()
}

fn message_page_from_api(response: ListMessagesResponse) -> MessagePage {
    MessagePage {
        message_ids: response
            .messages
            .map(|messages| messages.into_iter().filter_map(|m| m.id).collect()),
        next_page_token: response.next_page_token,
    }
}

/// Re-read an API message in its wire shape.
///
/// The generated types decode bodies and timestamps; `RawMessage` keeps the
/// base64 leaves and the textual `internalDate` the parser works from.
pub(crate) fn raw_message_from_api(message: Message) -> Result<RawMessage> {
    Ok(serde_json::from_value(serde_json::to_value(message)?)?)
}

#[async_trait]
impl GmailClient for ProductionGmailClient {
    async fn list_labels(&self) -> Result<Vec<LabelInfo>> {
        self.quota.acquire(QuotaCost::LabelsList).await;

        let (_, response) = self
            .hub
            .users()
            .labels_list("me")
            .add_scope(READONLY_SCOPE)
            .doit()
            .await?;

        let labels = labels_from_api(response);

        debug!("Listed {} labels", labels.len());
        Ok(labels)
    }

    async fn list_messages_page(
        &self,
        label_id: &str,
        page_token: Option<&str>,
    ) -> Result<MessagePage> {
        self.quota.acquire(QuotaCost::MessagesList).await;

        let mut call = self
            .hub
            .users()
            .messages_list("me")
            .add_label_ids(label_id)
            .max_results(MAX_PAGE_SIZE);

        if let Some(token) = page_token {
            call = call.page_token(token);
        }

        let (_, response) = call.add_scope(READONLY_SCOPE).doit().await?;

        Ok(message_page_from_api(response))
    }

    async fn get_message(&self, id: &str) -> Result<RawMessage> {
        self.quota.acquire(QuotaCost::MessagesGet).await;

        let (_, message) = self
            .hub
            .users()
            .messages_get("me", id)
            .format("full")
            .add_scope(READONLY_SCOPE)
            .doit()
            .await?;

        raw_message_from_api(message)
    }
}

// Shared ownership, e.g. one client behind several fetchers
#[async_trait]
impl<C> GmailClient for Arc<C>
where
    C: GmailClient + ?Sized,
{
    async fn list_labels(&self) -> Result<Vec<LabelInfo>> {
        self.as_ref().list_labels().await
    }

    async fn list_messages_page(
        &self,
        label_id: &str,
        page_token: Option<&str>,
    ) -> Result<MessagePage> {
        self.as_ref().list_messages_page(label_id, page_token).await
    }

    async fn get_message(&self, id: &str) -> Result<RawMessage> {
        self.as_ref().get_message(id).await
    }
}
