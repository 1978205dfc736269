//! Extraction of ticket-sale facts from decoded message text

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::config::ParserConfig;
use crate::models::{InvalidSale, ParsedMessage, ValidSale};

/// One line per ticket, e.g. `Participant 2: Jane Doe`
static TICKET_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?mR)^Participant\s\d+:").unwrap());

pub const MISSING_ID: &str = "Could not find email id";
pub const MISSING_DATE: &str = "Could not find email date";
pub const MISSING_NAME: &str = "Could not find buyer name in email";
pub const MISSING_LOCATION: &str = "Could not find buyer location in email";
pub const MISSING_TICKET_COUNT: &str = "Could not find ticket count in email";

/// Buyer fields pulled from the fixed-offset section of an order email
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuyerDetails {
    pub name: String,
    pub location: String,
}

/// Turns decoded message text into a [`ParsedMessage`]
#[derive(Debug, Clone)]
pub struct MessageParser {
    section_marker: String,
    name_line: usize,
    location_line: usize,
}

impl MessageParser {
    pub fn new(config: &ParserConfig) -> Self {
        Self {
            section_marker: config.section_marker.clone(),
            name_line: config.name_line,
            location_line: config.location_line,
        }
    }

    /// Parse one message.
    ///
    /// Every validation runs regardless of the others, so an invalid result lists
    /// all of its problems in a fixed order: id, date, name, location, tickets.
    pub fn parse(&self, id: Option<&str>, internal_date: Option<&str>, text: &str) -> ParsedMessage {
        let message_id = id.filter(|id| !id.is_empty()).map(str::to_string);
        let date = internal_date.and_then(parse_internal_date);
        let ticket_count = count_tickets(text);
        let buyer = self.extract_buyer(text).unwrap_or_else(|| {
            debug!(
                "Section marker {:?} not found in message {:?}",
                self.section_marker, message_id
            );
            BuyerDetails::default()
        });

        let mut errors = Vec::new();
        if message_id.is_none() {
            errors.push(MISSING_ID.to_string());
        }
        // An unparseable timestamp is reported the same way as a missing one
        if date.is_none() {
            errors.push(MISSING_DATE.to_string());
        }
        if buyer.name.is_empty() {
            errors.push(MISSING_NAME.to_string());
        }
        if buyer.location.is_empty() {
            errors.push(MISSING_LOCATION.to_string());
        }
        if ticket_count.is_none() {
            errors.push(MISSING_TICKET_COUNT.to_string());
        }

        match (errors.is_empty(), message_id, ticket_count, date) {
            (true, Some(message_id), Some(ticket_count), Some(date)) => {
                ParsedMessage::Valid(ValidSale {
                    message_id,
                    name: buyer.name,
                    location: buyer.location,
                    ticket_count,
                    date,
                })
            }
            (_, message_id, ticket_count, date) => ParsedMessage::Invalid(InvalidSale {
                message_id,
                name: buyer.name,
                location: buyer.location,
                ticket_count,
                date,
                errors,
            }),
        }
    }

    /// Read the buyer name and location at fixed line offsets after the section marker.
    ///
    /// Returns `None` when the marker does not occur in `text`.
    pub fn extract_buyer(&self, text: &str) -> Option<BuyerDetails> {
        let section = text.split(self.section_marker.as_str()).nth(1)?;
        let lines: Vec<&str> = section.split("\r\n").collect();

        let name = lines
            .get(self.name_line)
            .map(|line| strip_emphasis(line))
            .unwrap_or_default();
        let location = lines
            .get(self.location_line)
            .map(|line| line.trim().to_string())
            .unwrap_or_default();

        Some(BuyerDetails { name, location })
    }
}

/// Number of `Participant N:` lines, or `None` when there are none
pub fn count_tickets(text: &str) -> Option<u32> {
    let count = TICKET_LINE.find_iter(text).count();
    if count == 0 {
        None
    } else {
        Some(count as u32)
    }
}

/// Parse Gmail's `internalDate` (epoch milliseconds as text)
pub fn parse_internal_date(raw: &str) -> Option<DateTime<Utc>> {
    let millis = raw.trim().parse::<i64>().ok()?;
    DateTime::from_timestamp_millis(millis)
}

fn strip_emphasis(line: &str) -> String {
    line.trim()
        .trim_matches(|c| c == '*' || c == '_')
        .trim()
        .to_string()
}
