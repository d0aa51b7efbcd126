use std::sync::Arc;

use async_trait::async_trait;
use ghl_core::GhlClient;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{args, path_id, to_json, tool, ToolFamily};
use crate::error::McpResult;
use crate::protocol::Tool;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationArgs {
    #[serde(default)]
    location_id: Option<String>,
}

pub struct LocationTools {
    client: Arc<GhlClient>,
}

impl LocationTools {
    pub fn new(client: Arc<GhlClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToolFamily for LocationTools {
    fn tools(&self) -> Vec<Tool> {
        vec![tool(
            "get_location",
            "Get location details; defaults to the configured location",
            json!({
                "type": "object",
                "properties": {
                    "locationId": { "type": "string", "description": "Location ID" }
                }
            }),
        )]
    }

    async fn execute(&self, name: &str, raw: Value) -> McpResult<Option<Value>> {
        match name {
            "get_location" => {
                let input: LocationArgs = args(name, raw)?;
                let id = match input.location_id {
                    Some(id) => path_id(name, "locationId", id)?,
                    None => self.client.location_id(),
                };
                to_json(self.client.get_location(&id).await?)
            }
            _ => Ok(None),
        }
    }
}
