use serde_json::json;

use super::LocationScoped;
use crate::client::{encode, EndpointCall, GhlClient};
use crate::error::ApiFailure;
use crate::types::{
    Contact, ContactSearchResult, CreateContact, DeleteResult, SearchContacts, TagsResult,
    UpdateContact,
};

const DEFAULT_PAGE_LIMIT: u32 = 25;

impl GhlClient {
    pub async fn create_contact(&self, input: &CreateContact) -> Result<Contact, ApiFailure> {
        let location_id = self.location_id();
        let body = encode(&LocationScoped {
            location_id: &location_id,
            inner: input,
        })?;
        self.send(EndpointCall::post("/contacts/").body(body).unwrap_key("contact"))
            .await
    }

    pub async fn get_contact(&self, contact_id: &str) -> Result<Contact, ApiFailure> {
        self.send(EndpointCall::get("/contacts").segment(contact_id).unwrap_key("contact"))
            .await
    }

    pub async fn update_contact(
        &self,
        contact_id: &str,
        input: &UpdateContact,
    ) -> Result<Contact, ApiFailure> {
        let body = encode(input)?;
        self.send(
            EndpointCall::put("/contacts")
                .segment(contact_id)
                .body(body)
                .unwrap_key("contact"),
        )
        .await
    }

    pub async fn delete_contact(&self, contact_id: &str) -> Result<DeleteResult, ApiFailure> {
        self.send(EndpointCall::delete("/contacts").segment(contact_id))
            .await
    }

    pub async fn search_contacts(
        &self,
        input: &SearchContacts,
    ) -> Result<ContactSearchResult, ApiFailure> {
        let mut body = json!({
            "locationId": self.location_id(),
            "pageLimit": input.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
        });
        if let Some(query) = &input.query {
            body["query"] = json!(query);
        }
        if let Some(after) = &input.start_after_id {
            body["startAfterId"] = json!(after);
        }
        self.send(EndpointCall::post("/contacts/search").body(body))
            .await
    }

    pub async fn add_contact_tags(
        &self,
        contact_id: &str,
        tags: &[String],
    ) -> Result<TagsResult, ApiFailure> {
        self.send(
            EndpointCall::post("/contacts")
                .segment(contact_id)
                .segment("tags")
                .body(json!({ "tags": tags })),
        )
        .await
    }

    pub async fn remove_contact_tags(
        &self,
        contact_id: &str,
        tags: &[String],
    ) -> Result<TagsResult, ApiFailure> {
        self.send(
            EndpointCall::delete("/contacts")
                .segment(contact_id)
                .segment("tags")
                .body(json!({ "tags": tags })),
        )
        .await
    }
}
