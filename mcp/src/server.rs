//! One MCP session: lifecycle phases and request routing.
//!
//! A session moves `AwaitingInitialize -> AwaitingInitialized -> Ready`.
//! `ping` is answered in every phase; tool methods only once `Ready`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{McpError, McpResult};
use crate::jsonrpc::{
    JsonRpcError, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, JSONRPC_VERSION, METHOD_NOT_FOUND,
    NOT_INITIALIZED,
};
use crate::protocol::{
    CallToolParams, CallToolResult, Implementation, InitializeParams, InitializeResult,
    ListToolsParams, ListToolsResult, PROTOCOL_VERSION_LATEST, SUPPORTED_PROTOCOL_VERSIONS,
};

/// Server-side implementation of the tool methods.
#[async_trait]
pub trait McpHandler: Send + Sync {
    async fn list_tools(&self, params: ListToolsParams) -> McpResult<ListToolsResult>;
    async fn call_tool(&self, params: CallToolParams) -> McpResult<CallToolResult>;
}

/// What the server tells a client during `initialize`.
#[derive(Debug, Clone)]
pub struct McpServerConfig {
    pub server_info: Implementation,
    pub instructions: Option<String>,
}

impl McpServerConfig {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            server_info: Implementation {
                name: name.to_string(),
                version: version.to_string(),
            },
            instructions: None,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }
}

/// Echo the client's protocol version when supported, else offer the latest.
fn negotiate(requested: &str) -> &'static str {
    SUPPORTED_PROTOCOL_VERSIONS
        .iter()
        .copied()
        .find(|v| *v == requested)
        .unwrap_or(PROTOCOL_VERSION_LATEST)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    AwaitingInitialize,
    AwaitingInitialized { protocol: &'static str },
    Ready { protocol: &'static str },
}

pub struct McpConnection {
    config: McpServerConfig,
    handler: Arc<dyn McpHandler>,
    phase: Phase,
}

impl McpConnection {
    pub fn new(config: McpServerConfig, handler: Arc<dyn McpHandler>) -> Self {
        Self {
            config,
            handler,
            phase: Phase::AwaitingInitialize,
        }
    }

    /// Negotiated protocol version, once `initialize` has been answered.
    pub fn protocol_version(&self) -> Option<&'static str> {
        match self.phase {
            Phase::AwaitingInitialize => None,
            Phase::AwaitingInitialized { protocol } | Phase::Ready { protocol } => Some(protocol),
        }
    }

    /// Process one inbound frame. Only requests get a response.
    pub async fn handle_message(&mut self, msg: JsonRpcMessage) -> Option<JsonRpcResponse> {
        match msg {
            JsonRpcMessage::Request(req) => {
                let id = req.id.clone();
                Some(match self.route(req).await {
                    Ok(value) => JsonRpcResponse::ok(id, value),
                    Err(error) => JsonRpcResponse::err(id, error),
                })
            }
            JsonRpcMessage::Notification(note) => {
                self.observe(&note);
                None
            }
            JsonRpcMessage::Response(_) => None,
        }
    }

    async fn route(&mut self, req: JsonRpcRequest) -> Result<Value, JsonRpcError> {
        if req.jsonrpc != JSONRPC_VERSION {
            return Err(rpc_error(INVALID_REQUEST, "invalid jsonrpc version", None));
        }
        debug!(method = %req.method, "mcp request");

        match req.method.as_str() {
            "ping" => Ok(json!({})),
            "initialize" => self.initialize(required_params(req.params)?),
            "tools/list" => {
                self.require_ready()?;
                let params = req
                    .params
                    .map(decode_params::<ListToolsParams>)
                    .transpose()?
                    .unwrap_or_default();
                to_result(self.handler.list_tools(params).await)
            }
            "tools/call" => {
                self.require_ready()?;
                to_result(self.handler.call_tool(required_params(req.params)?).await)
            }
            other => Err(rpc_error(
                METHOD_NOT_FOUND,
                "method not found",
                Some(other.to_string()),
            )),
        }
    }

    fn initialize(&mut self, params: InitializeParams) -> Result<Value, JsonRpcError> {
        if self.phase != Phase::AwaitingInitialize {
            return Err(rpc_error(INVALID_REQUEST, "already initialized", None));
        }
        let protocol = negotiate(&params.protocol_version);
        debug!(client = %params.client_info.name, protocol, "mcp initialize");
        self.phase = Phase::AwaitingInitialized { protocol };

        to_result(Ok(InitializeResult {
            protocol_version: protocol.to_string(),
            capabilities: json!({ "tools": { "listChanged": false } }),
            server_info: self.config.server_info.clone(),
            instructions: self.config.instructions.clone(),
        }))
    }

    fn observe(&mut self, note: &JsonRpcNotification) {
        if note.jsonrpc != JSONRPC_VERSION || note.method != "notifications/initialized" {
            return;
        }
        if let Phase::AwaitingInitialized { protocol } = self.phase {
            self.phase = Phase::Ready { protocol };
        }
    }

    fn require_ready(&self) -> Result<(), JsonRpcError> {
        match self.phase {
            Phase::Ready { .. } => Ok(()),
            _ => Err(rpc_error(NOT_INITIALIZED, "not initialized", None)),
        }
    }
}

fn rpc_error(code: i64, message: &str, detail: Option<String>) -> JsonRpcError {
    JsonRpcError {
        code,
        message: message.to_string(),
        data: detail.map(|d| json!({ "detail": d })),
    }
}

fn decode_params<T: DeserializeOwned>(params: Value) -> Result<T, JsonRpcError> {
    serde_json::from_value(params)
        .map_err(|e| rpc_error(INVALID_PARAMS, "invalid params", Some(e.to_string())))
}

fn required_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, JsonRpcError> {
    let params = params.ok_or_else(|| {
        rpc_error(INVALID_PARAMS, "invalid params", Some("missing params".to_string()))
    })?;
    decode_params(params)
}

/// Map a handler outcome onto a JSON-RPC result or error object.
fn to_result<T: Serialize>(outcome: McpResult<T>) -> Result<Value, JsonRpcError> {
    let encoded = outcome.and_then(|v| serde_json::to_value(v).map_err(McpError::from));
    encoded.map_err(|e| match e {
        McpError::ToolNotFound(_) | McpError::InvalidArguments { .. } => {
            rpc_error(INVALID_PARAMS, "invalid params", Some(e.to_string()))
        }
        other => rpc_error(INTERNAL_ERROR, "internal error", Some(other.to_string())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsonrpc::JsonRpcId;
    use crate::protocol::{ContentBlock, Tool};

    /// Lists one tool, `echo`, which returns its arguments.
    struct Echo;

    #[async_trait]
    impl McpHandler for Echo {
        async fn list_tools(&self, _params: ListToolsParams) -> McpResult<ListToolsResult> {
            Ok(ListToolsResult {
                tools: vec![Tool {
                    name: "echo".to_string(),
                    description: "Returns its arguments".to_string(),
                    input_schema: json!({"type": "object"}),
                }],
                next_cursor: None,
            })
        }

        async fn call_tool(&self, params: CallToolParams) -> McpResult<CallToolResult> {
            match params.name.as_str() {
                "echo" => Ok(CallToolResult {
                    content: vec![ContentBlock::Text {
                        text: "echo".to_string(),
                    }],
                    structured_content: params.arguments,
                    is_error: false,
                }),
                _ => Err(McpError::ToolNotFound(params.name)),
            }
        }
    }

    fn session() -> McpConnection {
        McpConnection::new(McpServerConfig::new("test", "0.0.0"), Arc::new(Echo))
    }

    async fn request(
        conn: &mut McpConnection,
        id: i64,
        method: &str,
        params: Option<Value>,
    ) -> JsonRpcResponse {
        let req = JsonRpcRequest::new(JsonRpcId::Number(id), method, params);
        conn.handle_message(JsonRpcMessage::Request(req))
            .await
            .expect("requests are always answered")
    }

    async fn notify(conn: &mut McpConnection, method: &str) {
        let reply = conn
            .handle_message(JsonRpcMessage::Notification(JsonRpcNotification::new(method, None)))
            .await;
        assert!(reply.is_none());
    }

    fn init_params(version: &str) -> Option<Value> {
        Some(json!({
            "protocolVersion": version,
            "capabilities": {},
            "clientInfo": {"name": "client", "version": "0.0.0"}
        }))
    }

    fn code(resp: &JsonRpcResponse) -> Option<i64> {
        resp.error.as_ref().map(|e| e.code)
    }

    async fn ready() -> McpConnection {
        let mut conn = session();
        request(&mut conn, 0, "initialize", init_params(PROTOCOL_VERSION_LATEST)).await;
        notify(&mut conn, "notifications/initialized").await;
        conn
    }

    #[tokio::test]
    async fn tools_wait_for_the_initialized_notification() {
        let mut conn = session();
        assert_eq!(code(&request(&mut conn, 1, "tools/list", None).await), Some(NOT_INITIALIZED));

        let pong = request(&mut conn, 2, "ping", None).await;
        assert_eq!(pong.result, Some(json!({})));

        let init = request(&mut conn, 3, "initialize", init_params("2025-03-26")).await;
        assert!(init.error.is_none());
        assert_eq!(conn.protocol_version(), Some("2025-03-26"));
        assert_eq!(code(&request(&mut conn, 4, "tools/list", None).await), Some(NOT_INITIALIZED));

        notify(&mut conn, "notifications/cancelled").await;
        assert_eq!(code(&request(&mut conn, 5, "tools/list", None).await), Some(NOT_INITIALIZED));

        notify(&mut conn, "notifications/initialized").await;
        let listed = request(&mut conn, 6, "tools/list", None).await;
        assert_eq!(listed.result.unwrap()["tools"][0]["name"], "echo");
    }

    #[tokio::test]
    async fn unknown_protocol_version_gets_the_latest() {
        let mut conn = session();
        let init = request(&mut conn, 1, "initialize", init_params("1999-01-01")).await;
        assert_eq!(init.result.unwrap()["protocolVersion"], PROTOCOL_VERSION_LATEST);
    }

    #[tokio::test]
    async fn initialize_is_accepted_once() {
        let mut conn = ready().await;
        let again = request(&mut conn, 9, "initialize", init_params(PROTOCOL_VERSION_LATEST)).await;
        assert_eq!(code(&again), Some(INVALID_REQUEST));
        assert_eq!(conn.protocol_version(), Some(PROTOCOL_VERSION_LATEST));
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let mut conn = session();
        let resp = request(&mut conn, 1, "resources/list", None).await;
        assert_eq!(code(&resp), Some(METHOD_NOT_FOUND));
        assert_eq!(resp.id, JsonRpcId::Number(1));
    }

    #[tokio::test]
    async fn tool_call_errors_are_invalid_params() {
        let mut conn = ready().await;

        let unknown = request(
            &mut conn,
            1,
            "tools/call",
            Some(json!({"name": "missing", "arguments": {}})),
        )
        .await;
        let err = unknown.error.expect("error");
        assert_eq!(err.code, INVALID_PARAMS);
        assert_eq!(err.data.unwrap()["detail"], "Unknown tool: missing");

        let bare = request(&mut conn, 2, "tools/call", None).await;
        assert_eq!(code(&bare), Some(INVALID_PARAMS));

        let echoed = request(
            &mut conn,
            3,
            "tools/call",
            Some(json!({"name": "echo", "arguments": {"a": 1}})),
        )
        .await;
        assert_eq!(echoed.result.unwrap()["structuredContent"], json!({"a": 1}));
    }
}
