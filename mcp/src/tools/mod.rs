//! Tool catalogue backed by `GhlClient`.
//!
//! Each family owns a slice of the catalogue: its tool descriptors and the
//! dispatch from tool name to client call. Every vendor outcome is reported
//! as a result envelope, so the caller can always tell success from failure
//! by the `ok` field regardless of which tool ran.

mod contacts;
mod conversations;
mod locations;

use std::sync::Arc;

use async_trait::async_trait;
use ghl_core::{check_path_segment, to_envelope, GhlClient};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{McpError, McpResult};
use crate::protocol::{CallToolParams, CallToolResult, ListToolsParams, ListToolsResult, Tool};
use crate::server::McpHandler;

pub use contacts::ContactTools;
pub use conversations::ConversationTools;
pub use locations::LocationTools;

#[async_trait]
pub trait ToolFamily: Send + Sync {
    fn tools(&self) -> Vec<Tool>;

    /// Run `name` with raw arguments. `Ok(None)` means the name is not ours.
    async fn execute(&self, name: &str, args: Value) -> McpResult<Option<Value>>;
}

/// Decode tool arguments into a typed input.
pub(crate) fn args<T: DeserializeOwned>(tool: &str, args: Value) -> McpResult<T> {
    serde_json::from_value(args).map_err(|e| McpError::invalid_arguments(tool, e.to_string()))
}

/// Check an id argument that ends up in a URL path.
pub(crate) fn path_id(tool: &str, field: &str, id: String) -> McpResult<String> {
    match check_path_segment(&id) {
        Ok(()) => Ok(id),
        Err(_) => Err(McpError::invalid_arguments(
            tool,
            format!("`{field}` is not a valid id: {id:?}"),
        )),
    }
}

pub(crate) fn to_json<T: Serialize>(value: T) -> McpResult<Option<Value>> {
    Ok(Some(serde_json::to_value(value)?))
}

pub(crate) fn tool(name: &str, description: &str, input_schema: Value) -> Tool {
    Tool {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

pub struct GhlToolServer {
    families: Vec<Box<dyn ToolFamily>>,
}

impl GhlToolServer {
    pub fn new(client: Arc<GhlClient>) -> Self {
        Self {
            families: vec![
                Box::new(ContactTools::new(client.clone())),
                Box::new(ConversationTools::new(client.clone())),
                Box::new(LocationTools::new(client)),
            ],
        }
    }

    pub fn tools(&self) -> Vec<Tool> {
        self.families.iter().flat_map(|f| f.tools()).collect()
    }

    async fn dispatch(&self, name: &str, args: Value) -> McpResult<Value> {
        for family in &self.families {
            if let Some(value) = family.execute(name, args.clone()).await? {
                return Ok(value);
            }
        }
        Err(McpError::ToolNotFound(name.to_string()))
    }
}

#[async_trait]
impl McpHandler for GhlToolServer {
    async fn list_tools(&self, _params: ListToolsParams) -> McpResult<ListToolsResult> {
        Ok(ListToolsResult {
            tools: self.tools(),
            next_cursor: None,
        })
    }

    async fn call_tool(&self, params: CallToolParams) -> McpResult<CallToolResult> {
        let args = params
            .arguments
            .unwrap_or_else(|| Value::Object(Map::new()));
        debug!(tool = %params.name, "tool call");

        match self.dispatch(&params.name, args).await {
            Ok(value) => Ok(CallToolResult::json(to_envelope(&Ok(value)), false)),
            Err(McpError::Api(failure)) => Ok(CallToolResult::json(
                to_envelope::<Value>(&Err(failure)),
                true,
            )),
            Err(e @ McpError::InvalidArguments { .. }) => Ok(CallToolResult::error_text(e.to_string())),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use ghl_core::{
        ClientConfig, ConfigError, HttpRequest, HttpResponse, Transport, TransportError,
        TransportFactory,
    };
    use serde_json::json;

    use super::*;

    /// Counts requests and answers every one with `{}`.
    #[derive(Default)]
    struct Counting(AtomicUsize);

    #[async_trait]
    impl Transport for Counting {
        async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse {
                status: 200,
                headers: Vec::new(),
                body: "{}".to_string(),
            })
        }
    }

    struct Shared(Arc<Counting>);

    impl TransportFactory for Shared {
        fn build(&self, _config: &ClientConfig) -> Result<Arc<dyn Transport>, ConfigError> {
            let transport: Arc<dyn Transport> = self.0.clone();
            Ok(transport)
        }
    }

    fn counting_server() -> (GhlToolServer, Arc<Counting>) {
        let counter = Arc::new(Counting::default());
        let config = ClientConfig::new("t", "https://x", "L").unwrap();
        let client =
            GhlClient::with_transport_factory(config, Arc::new(Shared(counter.clone()))).unwrap();
        (GhlToolServer::new(Arc::new(client)), counter)
    }

    fn server() -> GhlToolServer {
        let config = ClientConfig::new("t", "http://127.0.0.1:9", "L").unwrap();
        GhlToolServer::new(Arc::new(GhlClient::new(config).unwrap()))
    }

    #[test]
    fn catalogue_names_are_unique_and_schemas_are_objects() {
        let tools = server().tools();
        let mut names: Vec<_> = tools.iter().map(|t| t.name.clone()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), tools.len());
        assert_eq!(tools.len(), 13);
        for t in &tools {
            assert_eq!(t.input_schema["type"], "object", "{}", t.name);
        }
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error() {
        let err = server()
            .call_tool(CallToolParams {
                name: "nope".into(),
                arguments: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::ToolNotFound(name) if name == "nope"));
    }

    #[tokio::test]
    async fn bad_arguments_are_reported_without_a_request() {
        let result = server()
            .call_tool(CallToolParams {
                name: "get_contact".into(),
                arguments: Some(json!({"contactId": 7})),
            })
            .await
            .unwrap();
        assert!(result.is_error);
        assert!(result.structured_content.is_none());
    }

    #[tokio::test]
    async fn traversing_ids_never_reach_the_transport() {
        let (server, counter) = counting_server();
        let calls = [
            ("delete_contact", json!({"contactId": "a/../b"})),
            ("get_contact", json!({"contactId": ".."})),
            ("update_contact", json!({"contactId": "../locations/L", "email": "x@y.z"})),
            ("add_contact_tags", json!({"contactId": "a/b", "tags": ["vip"]})),
            ("get_messages", json!({"conversationId": "c/../../contacts"})),
            ("get_location", json!({"locationId": "L/../other"})),
        ];
        for (name, arguments) in calls {
            let result = server
                .call_tool(CallToolParams {
                    name: name.into(),
                    arguments: Some(arguments),
                })
                .await
                .unwrap();
            assert!(result.is_error, "{name}");
            assert!(result.structured_content.is_none(), "{name}");
        }
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);

        let result = server
            .call_tool(CallToolParams {
                name: "get_conversation".into(),
                arguments: Some(json!({"conversationId": "conv-1"})),
            })
            .await
            .unwrap();
        assert!(!result.is_error);
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }
}
