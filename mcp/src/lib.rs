//! MCP server exposing the GoHighLevel client as tools.
//!
//! # Design
//! - `server::McpConnection` owns the protocol lifecycle and knows nothing
//!   about the vendor.
//! - `tools::GhlToolServer` is the `McpHandler`; every tool result carries a
//!   result envelope in both its text and structured content.
//! - `stdio::serve` frames one JSON-RPC message per line. Stdout carries
//!   only protocol traffic; logs go to stderr.

pub mod error;
pub mod jsonrpc;
pub mod protocol;
pub mod server;
pub mod stdio;
pub mod tools;

pub use error::{McpError, McpResult};
pub use server::{McpConnection, McpHandler, McpServerConfig};
pub use tools::{GhlToolServer, ToolFamily};
