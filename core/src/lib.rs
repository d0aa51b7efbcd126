//! Async client core for the GoHighLevel (LeadConnector) REST API.
//!
//! # Overview
//! Every endpoint wrapper builds an `EndpointCall` and hands it to
//! `GhlClient::send`, the single chokepoint that attaches the header
//! profile, serializes the query and body, executes the request through the
//! shared transport and turns the outcome into `Result<T, ApiFailure>`.
//!
//! # Design
//! - `build_request` (call -> `HttpRequest`) and `normalize`
//!   (`HttpResponse` -> result) are pure; only `Transport` does I/O.
//! - Transport failures never escape `send`; they become `ApiFailure` with
//!   status 500. `test_connection` is the one operation that reports a
//!   `FatalConnectivityError`.
//! - Configuration is owned by the client and swapped as a whole on token
//!   rotation.
//! - Request/response log lines are `tracing` events; the host decides where
//!   they go (stderr for the MCP server).

pub mod client;
pub mod config;
mod endpoints;
pub mod envelope;
pub mod error;
pub mod headers;
pub mod http;
pub mod query;
pub mod transport;
pub mod types;
pub mod vendor;

pub use client::{build_request, check_path_segment, encode, normalize, EndpointCall, GhlClient};
pub use config::{
    ClientConfig, CONVERSATIONS_API_VERSION, DEFAULT_API_VERSION, ENV_API_KEY, ENV_API_VERSION,
    ENV_BASE_URL, ENV_LOCATION_ID, REQUEST_TIMEOUT,
};
pub use envelope::to_envelope;
pub use error::{ApiFailure, ConfigError, ErrorKind, FatalConnectivityError};
pub use headers::{header_profile, HeaderProfile};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};
pub use query::{Query, QueryValue, ToQueryValue};
pub use transport::{ObservedTransport, ReqwestFactory, ReqwestTransport, TransportFactory};
pub use types::*;
pub use vendor::parse_vendor_message;
