//! Decoding of vendor error bodies.
//!
//! The vendor's error bodies are inconsistent: `message` may be a string,
//! an array of strings, or missing, and the body may not be JSON at all.
//! Only `message` is read; everything else is kept verbatim as `details`.

use serde::Deserialize;
use serde_json::Value;

/// The part of a vendor error body the client reads. Other fields are
/// ignored here; callers keep the whole body through `raw_details`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VendorErrorBody {
    #[serde(default)]
    pub message: Option<VendorMessage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum VendorMessage {
    Text(String),
    List(Vec<Value>),
    Other(Value),
}

impl VendorMessage {
    fn render(&self) -> Option<String> {
        match self {
            VendorMessage::Text(text) => Some(text.clone()),
            VendorMessage::List(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect();
                Some(parts.join(", "))
            }
            VendorMessage::Other(_) => None,
        }
    }
}

/// Extract the human-readable message from a vendor error body.
pub fn parse_vendor_message(body: &Value) -> Option<String> {
    let decoded = VendorErrorBody::deserialize(body).ok()?;
    decoded
        .message
        .as_ref()
        .and_then(VendorMessage::render)
        .filter(|m| !m.trim().is_empty())
}

/// Parse a raw response body for diagnostics. Non-JSON text is kept as a
/// JSON string; an empty body yields `None`.
pub fn raw_details(body: &str) -> Option<Value> {
    if body.trim().is_empty() {
        return None;
    }
    Some(serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string())))
}
