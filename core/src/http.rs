//! HTTP transport types and the transport seam.
//!
//! # Design
//! Requests and responses are plain data. The normalizer in `client.rs`
//! builds an `HttpRequest` from an `EndpointCall` and a configuration
//! snapshot, hands it to a `Transport`, and classifies the `HttpResponse`
//! (or `TransportError`) into the result envelope. A non-2xx status is a
//! normal `HttpResponse`, not a `TransportError`. A transport error means
//! no usable response: either nothing arrived, or the status line arrived
//! and the body could not be read, in which case the status is kept.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// `url` is absolute and already carries the serialized query string.
/// `headers` is the full header profile for this call.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Path component of `url`, used for log lines.
    pub fn path(&self) -> &str {
        let after_scheme = self
            .url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.url);
        let path = after_scheme
            .find('/')
            .map(|idx| &after_scheme[idx..])
            .unwrap_or("/");
        path.split('?').next().unwrap_or(path)
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request did not produce a usable response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("timeout of {0}ms exceeded")]
    Timeout(u128),

    #[error("{0}")]
    Network(String),

    /// The status line was received but reading the body failed.
    #[error("{cause}")]
    BodyRead {
        status: u16,
        cause: Box<TransportError>,
    },
}

impl TransportError {
    /// Status received before the failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::BodyRead { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn timed_out(&self) -> bool {
        match self {
            TransportError::Timeout(_) => true,
            TransportError::Network(_) => false,
            TransportError::BodyRead { cause, .. } => cause.timed_out(),
        }
    }
}

/// Executes one `HttpRequest` and returns whatever the server answered.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}
