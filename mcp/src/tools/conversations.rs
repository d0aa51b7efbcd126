use std::sync::Arc;

use async_trait::async_trait;
use ghl_core::{GhlClient, MessageType, SearchConversations, SendMessage};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{args, path_id, to_json, tool, ToolFamily};
use crate::error::{McpError, McpResult};
use crate::protocol::Tool;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConversationRef {
    conversation_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessagesArgs {
    conversation_id: String,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    last_message_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SmsArgs {
    contact_id: String,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmailArgs {
    contact_id: String,
    subject: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    html: Option<String>,
}

impl From<SmsArgs> for SendMessage {
    fn from(a: SmsArgs) -> Self {
        SendMessage {
            message_type: MessageType::Sms,
            contact_id: a.contact_id,
            message: Some(a.message),
            subject: None,
            html: None,
        }
    }
}

impl From<EmailArgs> for SendMessage {
    fn from(a: EmailArgs) -> Self {
        SendMessage {
            message_type: MessageType::Email,
            contact_id: a.contact_id,
            message: a.message,
            subject: Some(a.subject),
            html: a.html,
        }
    }
}

pub struct ConversationTools {
    client: Arc<GhlClient>,
}

impl ConversationTools {
    pub fn new(client: Arc<GhlClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToolFamily for ConversationTools {
    fn tools(&self) -> Vec<Tool> {
        let conversation_id = json!({ "type": "string", "description": "Conversation ID" });
        let contact_id = json!({ "type": "string", "description": "Recipient contact ID" });

        vec![
            tool(
                "search_conversations",
                "Search conversations in the configured location",
                json!({
                    "type": "object",
                    "properties": {
                        "contactId": { "type": "string", "description": "Only conversations with this contact" },
                        "query": { "type": "string", "description": "Free-text search" },
                        "status": { "type": "string", "enum": ["all", "read", "unread", "starred"] },
                        "limit": { "type": "integer", "minimum": 1 }
                    }
                }),
            ),
            tool(
                "get_conversation",
                "Get a conversation by ID",
                json!({
                    "type": "object",
                    "properties": { "conversationId": conversation_id },
                    "required": ["conversationId"]
                }),
            ),
            tool(
                "get_messages",
                "List messages in a conversation",
                json!({
                    "type": "object",
                    "properties": {
                        "conversationId": conversation_id,
                        "limit": { "type": "integer", "minimum": 1 },
                        "lastMessageId": { "type": "string", "description": "Pagination cursor" }
                    },
                    "required": ["conversationId"]
                }),
            ),
            tool(
                "send_sms",
                "Send an SMS to a contact",
                json!({
                    "type": "object",
                    "properties": {
                        "contactId": contact_id,
                        "message": { "type": "string", "description": "Message text" }
                    },
                    "required": ["contactId", "message"]
                }),
            ),
            tool(
                "send_email",
                "Send an email to a contact",
                json!({
                    "type": "object",
                    "properties": {
                        "contactId": contact_id,
                        "subject": { "type": "string" },
                        "message": { "type": "string", "description": "Plain-text body" },
                        "html": { "type": "string", "description": "HTML body" }
                    },
                    "required": ["contactId", "subject"]
                }),
            ),
        ]
    }

    async fn execute(&self, name: &str, raw: Value) -> McpResult<Option<Value>> {
        match name {
            "search_conversations" => {
                let input: SearchConversations = args(name, raw)?;
                to_json(self.client.search_conversations(&input).await?)
            }
            "get_conversation" => {
                let input: ConversationRef = args(name, raw)?;
                let id = path_id(name, "conversationId", input.conversation_id)?;
                to_json(self.client.get_conversation(&id).await?)
            }
            "get_messages" => {
                let input: MessagesArgs = args(name, raw)?;
                let id = path_id(name, "conversationId", input.conversation_id)?;
                to_json(
                    self.client
                        .get_messages(&id, input.limit, input.last_message_id.as_deref())
                        .await?,
                )
            }
            "send_sms" => {
                let input: SmsArgs = args(name, raw)?;
                to_json(self.client.send_message(&input.into()).await?)
            }
            "send_email" => {
                let input: EmailArgs = args(name, raw)?;
                if input.message.is_none() && input.html.is_none() {
                    return Err(McpError::invalid_arguments(
                        name,
                        "one of `message` or `html` is required",
                    ));
                }
                to_json(self.client.send_message(&input.into()).await?)
            }
            _ => Ok(None),
        }
    }
}
