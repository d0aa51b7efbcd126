//! Error types for the GHL client.
//!
//! # Design
//! Three kinds of failure are kept as three types so the distinction shows
//! up in signatures:
//! - `ConfigError` stops construction; no call can be made without a
//!   complete configuration.
//! - `ApiFailure` is the failure half of every endpoint result. It is data:
//!   the normalizer returns it, never panics or propagates a transport error
//!   past itself.
//! - `FatalConnectivityError` is produced only by `GhlClient::test_connection`.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Prefix placed before the status code in every HTTP-level failure message.
pub const FAILURE_PREFIX: &str = "GHL API Error";

/// Placeholder used when neither the vendor nor the transport said anything.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Status reported when no response was received at all.
pub const NO_RESPONSE_STATUS: u16 = 500;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required configuration: {0} is not set")]
    Missing(&'static str),

    #[error("invalid configuration: {0} must not be empty")]
    Empty(&'static str),

    #[error("failed to build HTTP transport: {0}")]
    Transport(String),
}

/// Classification of a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The vendor answered with a non-2xx status.
    Http,
    /// No response was received.
    Network,
    /// No response within the request timeout.
    Timeout,
    /// A 2xx response whose body did not have the expected shape.
    Decode,
    /// The request could not be built (body or URL).
    Encode,
}

/// The failure variant of the result envelope.
#[derive(Debug, Clone, Error, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct ApiFailure {
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ApiFailure {
    /// Failure for a response with a non-2xx status.
    pub fn http(status: u16, text: &str, details: Option<Value>) -> Self {
        Self {
            kind: ErrorKind::Http,
            http_status: Some(status),
            message: status_message(status, text),
            details,
        }
    }

    /// Failure for a request that never got a response.
    pub fn no_response(kind: ErrorKind, text: &str) -> Self {
        Self::interrupted(NO_RESPONSE_STATUS, kind, text)
    }

    /// Failure for a response whose body could not be read after `status`
    /// arrived.
    pub fn interrupted(status: u16, kind: ErrorKind, text: &str) -> Self {
        Self {
            kind,
            http_status: Some(status),
            message: status_message(status, text),
            details: None,
        }
    }

    pub fn decode(status: u16, reason: impl std::fmt::Display) -> Self {
        Self {
            kind: ErrorKind::Decode,
            http_status: Some(status),
            message: format!("GHL API response could not be decoded: {reason}"),
            details: None,
        }
    }

    pub fn encode(reason: impl std::fmt::Display) -> Self {
        Self {
            kind: ErrorKind::Encode,
            http_status: None,
            message: format!("GHL API request could not be built: {reason}"),
            details: None,
        }
    }
}

fn status_message(status: u16, text: &str) -> String {
    let text = if text.trim().is_empty() {
        UNKNOWN_ERROR
    } else {
        text
    };
    format!("{FAILURE_PREFIX} ({status}): {text}")
}

/// The connectivity self-check failed. Not recoverable.
#[derive(Debug, Error, PartialEq)]
#[error("GHL API connection test failed: {source}")]
pub struct FatalConnectivityError {
    #[source]
    pub source: ApiFailure,
}
