use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque Gmail message handle
pub type MessageId = String;

/// Label info returned from Gmail API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelInfo {
    pub id: String,
    pub name: String,
}

/// One page of a `messages.list` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagePage {
    /// `None` when the response carried no `messages` field at all
    pub message_ids: Option<Vec<MessageId>>,
    pub next_page_token: Option<String>,
}

/// A message as returned by `messages.get` with `format=full`, in Gmail's wire shape.
///
/// Immutable once fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage {
    #[serde(default)]
    pub id: Option<MessageId>,
    /// Epoch milliseconds as text
    #[serde(default)]
    pub internal_date: Option<String>,
    #[serde(default)]
    pub payload: Option<BodyNode>,
}

/// Node of a message body tree.
///
/// Gmail marks a multipart node by the presence of `parts`; anything else is a
/// leaf whose `body.data` holds base64-encoded content.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "wire::MessagePart")]
pub enum BodyNode {
    Branch(Vec<BodyNode>),
    Leaf(Option<String>),
}

impl BodyNode {
    pub fn leaf(data: impl Into<String>) -> Self {
        BodyNode::Leaf(Some(data.into()))
    }

    pub fn empty_leaf() -> Self {
        BodyNode::Leaf(None)
    }

    pub fn branch(children: Vec<BodyNode>) -> Self {
        BodyNode::Branch(children)
    }
}

mod wire {
    use serde::Deserialize;

    #[derive(Deserialize)]
    pub struct MessagePart {
        #[serde(default)]
        pub parts: Option<Vec<MessagePart>>,
        #[serde(default)]
        pub body: Option<MessagePartBody>,
    }

    #[derive(Deserialize)]
    pub struct MessagePartBody {
        #[serde(default)]
        pub data: Option<String>,
    }

    impl From<MessagePart> for super::BodyNode {
        fn from(part: MessagePart) -> Self {
            match part.parts {
                Some(parts) => super::BodyNode::Branch(parts.into_iter().map(Into::into).collect()),
                None => super::BodyNode::Leaf(part.body.and_then(|b| b.data)),
            }
        }
    }
}

/// A parsed sale with every required field present
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidSale {
    pub message_id: MessageId,
    pub name: String,
    pub location: String,
    pub ticket_count: u32,
    pub date: DateTime<Utc>,
}

/// A message that failed validation, with whatever could still be extracted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidSale {
    pub message_id: Option<MessageId>,
    pub name: String,
    pub location: String,
    pub ticket_count: Option<u32>,
    pub date: Option<DateTime<Utc>>,
    /// Never empty
    pub errors: Vec<String>,
}

/// Parser output: a message is either a sale or a list of reasons it isn't one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParsedMessage {
    Valid(ValidSale),
    Invalid(InvalidSale),
}

impl ParsedMessage {
    pub fn message_id(&self) -> Option<&str> {
        match self {
            ParsedMessage::Valid(sale) => Some(sale.message_id.as_str()),
            ParsedMessage::Invalid(record) => record.message_id.as_deref(),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ParsedMessage::Valid(_))
    }
}

/// Running total plus the sale chosen for the notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateReport {
    pub total_tickets_sold: u64,
    pub representative_sale: ValidSale,
}

/// Payload handed to the notification sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaleNotification {
    pub total_tickets_sold: u64,
    pub date: DateTime<Utc>,
    pub ticket_count: u32,
}

impl From<&AggregateReport> for SaleNotification {
    fn from(report: &AggregateReport) -> Self {
        Self {
            total_tickets_sold: report.total_tickets_sold,
            date: report.representative_sale.date,
            ticket_count: report.representative_sale.ticket_count,
        }
    }
}
