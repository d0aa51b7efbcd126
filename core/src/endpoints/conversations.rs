use serde_json::Value;

use crate::client::{encode, EndpointCall, GhlClient};
use crate::error::ApiFailure;
use crate::headers::HeaderProfile;
use crate::query::Query;
use crate::types::{
    ConversationSearchResult, MessagePage, SearchConversations, SendMessage, SendMessageResult,
};

impl GhlClient {
    pub async fn search_conversations(
        &self,
        input: &SearchConversations,
    ) -> Result<ConversationSearchResult, ApiFailure> {
        let query = Query::new()
            .param("locationId", self.location_id())
            .param("contactId", input.contact_id.as_ref())
            .param("query", input.query.as_ref())
            .param("status", input.status.as_ref())
            .param("limit", input.limit);
        self.send(
            EndpointCall::get("/conversations/search")
                .query(query)
                .profile(HeaderProfile::Secondary),
        )
        .await
    }

    /// The vendor returns the conversation unwrapped.
    pub async fn get_conversation(&self, conversation_id: &str) -> Result<Value, ApiFailure> {
        self.send(
            EndpointCall::get("/conversations").segment(conversation_id)
                .profile(HeaderProfile::Secondary),
        )
        .await
    }

    pub async fn get_messages(
        &self,
        conversation_id: &str,
        limit: Option<u32>,
        last_message_id: Option<&str>,
    ) -> Result<MessagePage, ApiFailure> {
        let query = Query::new()
            .param("limit", limit)
            .param("lastMessageId", last_message_id);
        self.send(
            EndpointCall::get("/conversations")
                .segment(conversation_id)
                .segment("messages")
                .query(query)
                .profile(HeaderProfile::Secondary)
                .unwrap_key("messages"),
        )
        .await
    }

    pub async fn send_message(&self, input: &SendMessage) -> Result<SendMessageResult, ApiFailure> {
        let body = encode(input)?;
        self.send(
            EndpointCall::post("/conversations/messages")
                .body(body)
                .profile(HeaderProfile::Secondary),
        )
        .await
    }
}
