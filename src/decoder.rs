//! Flattening of a message body tree into plain text

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use tracing::warn;

use crate::models::BodyNode;

/// Gmail sends URL-safe base64, usually padded; hand-built fixtures tend to use
/// the standard alphabet. Both are accepted after normalising to URL-safe.
const BODY_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode a body tree into one string, concatenating leaves in pre-order.
///
/// An absent tree or a leaf without data contributes nothing.
pub fn decode(body: Option<&BodyNode>) -> String {
    let mut text = String::new();
    if let Some(node) = body {
        decode_into(node, &mut text);
    }
    text
}

fn decode_into(node: &BodyNode, out: &mut String) {
    match node {
        BodyNode::Branch(children) => {
            for child in children {
                decode_into(child, out);
            }
        }
        BodyNode::Leaf(Some(data)) => out.push_str(&decode_leaf(data)),
        BodyNode::Leaf(None) => {}
    }
}

/// Decode one base64 leaf as text. Malformed data decodes to nothing.
pub fn decode_leaf(data: &str) -> String {
    let normalized: String = data
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();

    match BODY_ENGINE.decode(normalized.as_bytes()) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            warn!("Skipping body part with invalid base64 data: {}", e);
            String::new()
        }
    }
}
