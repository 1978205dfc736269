//! Label resolution, paginated listing and concurrent message retrieval

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info};

use crate::client::GmailClient;
use crate::error::{CounterError, Result};
use crate::models::{MessageId, RawMessage};

/// Resolves a label and pulls every message under it
pub struct MessageFetcher<C> {
    client: C,
    max_concurrent: usize,
}

impl<C> MessageFetcher<C>
where
    C: GmailClient,
{
    /// # Arguments
    /// * `client` - Gmail API client
    /// * `max_concurrent` - Maximum `messages.get` calls in flight (at least 1)
    pub fn new(client: C, max_concurrent: usize) -> Self {
        Self {
            client,
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Find the id of the label whose name matches exactly
    pub async fn resolve_label_id(&self, label_name: &str) -> Result<String> {
        let labels = self.client.list_labels().await?;

        labels
            .into_iter()
            .find(|label| label.name == label_name)
            .map(|label| label.id)
            .ok_or_else(|| CounterError::LabelNotFound(label_name.to_string()))
    }

    /// List every message id under a label, following continuation tokens.
    ///
    /// Pages are requested one after another and concatenated in order. Only
    /// the first page is required to carry ids; later empty pages are accepted.
    pub async fn list_message_ids(&self, label_id: &str) -> Result<Vec<MessageId>> {
        let mut all_ids = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .client
                .list_messages_page(label_id, page_token.as_deref())
                .await?;
            pages += 1;

            match page.message_ids {
                Some(ids) if !ids.is_empty() => {
                    debug!("Page {} returned {} message ids", pages, ids.len());
                    all_ids.extend(ids);
                }
                _ if pages == 1 => return Err(CounterError::EmptyResult(label_id.to_string())),
                _ => debug!("Page {} returned no message ids", pages),
            }

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        info!(
            "Listed {} messages under label {} in {} page(s)",
            all_ids.len(),
            label_id,
            pages
        );
        Ok(all_ids)
    }

    /// Retrieve one message in full
    pub async fn fetch_full_message(&self, id: &str) -> Result<RawMessage> {
        if id.is_empty() {
            return Err(CounterError::InvalidArgument(
                "No message ID provided".to_string(),
            ));
        }
        self.client.get_message(id).await
    }

    /// Fetch every message, keeping the order of `ids`
    pub async fn fetch_all(&self, ids: &[MessageId]) -> Result<Vec<RawMessage>> {
        self.fetch_all_with(ids, |message| message).await
    }

    /// Fetch every message and run `process` on each as it arrives.
    ///
    /// At most `max_concurrent` fetches are in flight. Output order matches `ids`.
    /// The first failure aborts the batch and is returned.
    pub async fn fetch_all_with<T, F>(&self, ids: &[MessageId], process: F) -> Result<Vec<T>>
    where
        F: Fn(RawMessage) -> T,
    {
        let process = &process;
        stream::iter(ids)
            .map(|id| async move {
                let message = self.fetch_full_message(id).await?;
                Ok::<_, CounterError>(process(message))
            })
            .buffered(self.max_concurrent)
            .try_collect()
            .await
    }
}
