use std::sync::Arc;

use async_trait::async_trait;
use ghl_core::{CreateContact, GhlClient, SearchContacts, UpdateContact};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{args, path_id, to_json, tool, ToolFamily};
use crate::error::McpResult;
use crate::protocol::Tool;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContactRef {
    contact_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateArgs {
    contact_id: String,
    #[serde(flatten)]
    fields: UpdateContact,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TagArgs {
    contact_id: String,
    tags: Vec<String>,
}

fn contact_fields() -> Value {
    json!({
        "firstName": { "type": "string", "description": "First name" },
        "lastName": { "type": "string", "description": "Last name" },
        "email": { "type": "string", "description": "Email address" },
        "phone": { "type": "string", "description": "Phone number in E.164 format" },
        "tags": { "type": "array", "items": { "type": "string" }, "description": "Tags to set" },
        "companyName": { "type": "string", "description": "Company name" }
    })
}

fn contact_id_schema() -> Value {
    json!({ "type": "string", "description": "Contact ID" })
}

pub struct ContactTools {
    client: Arc<GhlClient>,
}

impl ContactTools {
    pub fn new(client: Arc<GhlClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToolFamily for ContactTools {
    fn tools(&self) -> Vec<Tool> {
        let mut create_props = contact_fields();
        create_props["source"] = json!({ "type": "string", "description": "Lead source" });

        let mut update_props = contact_fields();
        update_props["contactId"] = contact_id_schema();

        let tag_schema = json!({
            "type": "object",
            "properties": {
                "contactId": contact_id_schema(),
                "tags": { "type": "array", "items": { "type": "string" }, "minItems": 1 }
            },
            "required": ["contactId", "tags"]
        });

        vec![
            tool(
                "create_contact",
                "Create a contact in the configured location",
                json!({ "type": "object", "properties": create_props }),
            ),
            tool(
                "get_contact",
                "Get a contact by ID",
                json!({
                    "type": "object",
                    "properties": { "contactId": contact_id_schema() },
                    "required": ["contactId"]
                }),
            ),
            tool(
                "update_contact",
                "Update fields of an existing contact",
                json!({ "type": "object", "properties": update_props, "required": ["contactId"] }),
            ),
            tool(
                "delete_contact",
                "Delete a contact",
                json!({
                    "type": "object",
                    "properties": { "contactId": contact_id_schema() },
                    "required": ["contactId"]
                }),
            ),
            tool(
                "search_contacts",
                "Search contacts in the configured location",
                json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string", "description": "Free-text search" },
                        "limit": { "type": "integer", "minimum": 1, "default": 25 },
                        "startAfterId": { "type": "string", "description": "Pagination cursor" }
                    }
                }),
            ),
            tool("add_contact_tags", "Add tags to a contact", tag_schema.clone()),
            tool("remove_contact_tags", "Remove tags from a contact", tag_schema),
        ]
    }

    async fn execute(&self, name: &str, raw: Value) -> McpResult<Option<Value>> {
        match name {
            "create_contact" => {
                let input: CreateContact = args(name, raw)?;
                to_json(self.client.create_contact(&input).await?)
            }
            "get_contact" => {
                let input: ContactRef = args(name, raw)?;
                let id = path_id(name, "contactId", input.contact_id)?;
                to_json(self.client.get_contact(&id).await?)
            }
            "update_contact" => {
                let input: UpdateArgs = args(name, raw)?;
                let id = path_id(name, "contactId", input.contact_id)?;
                to_json(self.client.update_contact(&id, &input.fields).await?)
            }
            "delete_contact" => {
                let input: ContactRef = args(name, raw)?;
                let id = path_id(name, "contactId", input.contact_id)?;
                to_json(self.client.delete_contact(&id).await?)
            }
            "search_contacts" => {
                let input: SearchContacts = args(name, raw)?;
                to_json(self.client.search_contacts(&input).await?)
            }
            "add_contact_tags" => {
                let input: TagArgs = args(name, raw)?;
                let id = path_id(name, "contactId", input.contact_id)?;
                to_json(self.client.add_contact_tags(&id, &input.tags).await?)
            }
            "remove_contact_tags" => {
                let input: TagArgs = args(name, raw)?;
                let id = path_id(name, "contactId", input.contact_id)?;
                to_json(self.client.remove_contact_tags(&id, &input.tags).await?)
            }
            _ => Ok(None),
        }
    }
}
