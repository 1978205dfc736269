//! Common test utilities and fixtures

#![allow(dead_code)]

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use gmail_ticket_counter::client::GmailClient;
use gmail_ticket_counter::error::{CounterError, Result};
use gmail_ticket_counter::models::{AggregateReport, BodyNode, LabelInfo, MessagePage, RawMessage};
use gmail_ticket_counter::notifier::SalesNotifier;
use mockall::mock;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const LABEL_NAME: &str = "Ticket Sales";
pub const LABEL_ID: &str = "Label_42";

/// 2024-01-01 16:00:00 UTC
pub const INTERNAL_DATE: &str = "1704124800000";

/// Order email body laid out the way the ticket vendor renders it
pub fn order_email(name: &str, location: &str, participants: usize) -> String {
    let mut lines = vec![
        "Thanks for your order!".to_string(),
        "Billing Information".to_string(),
        String::new(),
        "Order #1042".to_string(),
        "Placed online".to_string(),
        String::new(),
        "Buyer".to_string(),
        format!("*{}*", name),
        String::new(),
        "Address".to_string(),
        String::new(),
        location.to_string(),
        String::new(),
    ];
    for i in 1..=participants {
        lines.push(format!("Participant {}: Guest {}", i, i));
    }
    lines.join("\r\n")
}

/// Base64 body leaf the way the API ships it
pub fn encoded_leaf(text: &str) -> BodyNode {
    BodyNode::leaf(STANDARD.encode(text))
}

/// Message whose body is a multipart/alternative with the text in the first part
pub fn raw_message(id: &str, internal_date: &str, text: &str) -> RawMessage {
    RawMessage {
        id: Some(id.to_string()),
        internal_date: Some(internal_date.to_string()),
        payload: Some(BodyNode::branch(vec![
            encoded_leaf(text),
            BodyNode::empty_leaf(),
        ])),
    }
}

pub fn sale_message(id: &str, name: &str, location: &str, participants: usize) -> RawMessage {
    raw_message(id, INTERNAL_DATE, &order_email(name, location, participants))
}

/// `messages.get` response as JSON, for wire-shape checks
pub fn mock_gmail_message_response(id: &str, text: &str) -> serde_json::Value {
    json!({
        "id": id,
        "threadId": format!("thread_{}", id),
        "labelIds": [LABEL_ID],
        "internalDate": INTERNAL_DATE,
        "payload": {
            "mimeType": "multipart/alternative",
            "parts": [
                {"mimeType": "text/plain", "body": {"size": text.len(), "data": STANDARD.encode(text)}},
                {"mimeType": "text/html", "body": {"size": 0}}
            ]
        }
    })
}

pub fn create_test_label_info(id: &str, name: &str) -> LabelInfo {
    LabelInfo {
        id: id.to_string(),
        name: name.to_string(),
    }
}

pub fn page(ids: &[&str], next_page_token: Option<&str>) -> MessagePage {
    MessagePage {
        message_ids: Some(ids.iter().map(|id| id.to_string()).collect()),
        next_page_token: next_page_token.map(|t| t.to_string()),
    }
}

/// Scripted Gmail client.
///
/// Pages are served in order: the first request must carry no token and each
/// following request must carry the token the previous page handed out.
#[derive(Default)]
pub struct FakeGmailClient {
    labels: Vec<LabelInfo>,
    pages: Vec<MessagePage>,
    messages: HashMap<String, RawMessage>,
    delays: HashMap<String, Duration>,
    failing_ids: HashSet<String>,
    fail_listing: bool,
    pub page_tokens_seen: Mutex<Vec<Option<String>>>,
    pub list_calls: AtomicUsize,
    pub get_calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeGmailClient {
    pub fn new() -> Self {
        Self::default().with_labels(vec![
            create_test_label_info("INBOX", "INBOX"),
            create_test_label_info(LABEL_ID, LABEL_NAME),
        ])
    }

    pub fn with_labels(mut self, labels: Vec<LabelInfo>) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_pages(mut self, pages: Vec<MessagePage>) -> Self {
        self.pages = pages;
        self
    }

    pub fn with_message(self, message: RawMessage) -> Self {
        let id = message.id.clone().unwrap_or_default();
        self.with_message_as(&id, message)
    }

    /// Serve `message` for `id` whatever id the message itself carries
    pub fn with_message_as(mut self, id: &str, message: RawMessage) -> Self {
        self.messages.insert(id.to_string(), message);
        self
    }

    /// Single page holding every given message
    pub fn with_messages(mut self, messages: Vec<RawMessage>) -> Self {
        let ids: Vec<String> = messages.iter().filter_map(|m| m.id.clone()).collect();
        self.pages = vec![MessagePage {
            message_ids: Some(ids),
            next_page_token: None,
        }];
        for message in messages {
            self = self.with_message(message);
        }
        self
    }

    pub fn with_delay(mut self, id: &str, delay: Duration) -> Self {
        self.delays.insert(id.to_string(), delay);
        self
    }

    pub fn failing_on(mut self, id: &str) -> Self {
        self.failing_ids.insert(id.to_string());
        self
    }

    pub fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }
}

#[async_trait]
impl GmailClient for FakeGmailClient {
    async fn list_labels(&self) -> Result<Vec<LabelInfo>> {
        Ok(self.labels.clone())
    }

    async fn list_messages_page(
        &self,
        label_id: &str,
        page_token: Option<&str>,
    ) -> Result<MessagePage> {
        let call = self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.page_tokens_seen
            .lock()
            .unwrap()
            .push(page_token.map(|t| t.to_string()));

        if self.fail_listing {
            return Err(CounterError::Transport {
                status: Some(503),
                message: "Backend Error".to_string(),
            });
        }
        assert_eq!(label_id, LABEL_ID, "listed with unexpected label id");

        let expected_token = match call {
            0 => None,
            n => self.pages[n - 1].next_page_token.clone(),
        };
        assert_eq!(page_token.map(|t| t.to_string()), expected_token);

        Ok(self.pages.get(call).cloned().unwrap_or_default())
    }

    async fn get_message(&self, id: &str) -> Result<RawMessage> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self
            .delays
            .get(id)
            .copied()
            .unwrap_or(Duration::from_millis(5));
        tokio::time::sleep(delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_ids.contains(id) {
            return Err(CounterError::transport(format!("Requested entity was not found: {}", id)));
        }

        self.messages
            .get(id)
            .cloned()
            .ok_or_else(|| CounterError::Transport {
                status: Some(404),
                message: format!("Requested entity was not found: {}", id),
            })
    }
}

// Mock implementation of SalesNotifier for testing
mock! {
    pub SalesNotifier {}

    #[async_trait::async_trait]
    impl SalesNotifier for SalesNotifier {
        async fn report_new_sales(&self, report: &AggregateReport) -> Result<()>;
    }
}

