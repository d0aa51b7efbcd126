use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Path, Query, RawQuery, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const TEST_TOKEN: &str = "test-token";
pub const TEST_LOCATION_ID: &str = "loc-1";
pub const CONVERSATIONS_VERSION: &str = "2021-04-15";

#[derive(Clone, Debug)]
pub struct MockConfig {
    /// Bearer tokens the server accepts.
    pub tokens: Vec<String>,
    pub location_id: String,
    pub location_name: String,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            tokens: vec![TEST_TOKEN.to_string()],
            location_id: TEST_LOCATION_ID.to_string(),
            location_name: "Mock Agency".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub location_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub contact_id: String,
    pub location_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message_body: Option<String>,
    pub unread_count: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub direction: String,
    pub body: String,
    pub message_type: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContact {
    pub location_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContact {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchContacts {
    pub location_id: String,
    pub page_limit: Option<usize>,
    pub query: Option<String>,
}

#[derive(Deserialize)]
pub struct TagsBody {
    pub tags: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    pub contact_id: String,
    pub message: Option<String>,
    pub subject: Option<String>,
    pub html: Option<String>,
}

#[derive(Default)]
struct Store {
    contacts: BTreeMap<String, Contact>,
    conversations: BTreeMap<String, Conversation>,
    messages: HashMap<String, Vec<Message>>,
}

#[derive(Clone)]
pub struct AppState {
    config: Arc<MockConfig>,
    store: Arc<RwLock<Store>>,
}

type ApiError = (StatusCode, Json<Value>);

fn error(status: StatusCode, message: impl Into<Value>) -> ApiError {
    (
        status,
        Json(json!({ "statusCode": status.as_u16(), "message": message.into() })),
    )
}

pub fn app(config: MockConfig) -> Router {
    let state = AppState {
        config: Arc::new(config),
        store: Arc::new(RwLock::new(Store::default())),
    };
    Router::new()
        .route("/echo", get(echo))
        .route("/locations/{id}", get(get_location))
        .route("/contacts/", post(create_contact))
        .route("/contacts/search", post(search_contacts))
        .route(
            "/contacts/{id}",
            get(get_contact).put(update_contact).delete(delete_contact),
        )
        .route("/contacts/{id}/tags", post(add_tags).delete(remove_tags))
        .route("/conversations/search", get(search_conversations))
        .route("/conversations/messages", post(send_message))
        .route("/conversations/{id}", get(get_conversation))
        .route("/conversations/{id}/messages", get(get_messages))
        .with_state(state)
}

pub async fn run(listener: TcpListener, config: MockConfig) -> Result<(), std::io::Error> {
    axum::serve(listener, app(config)).await
}

/// Bearer token must be one of the configured tokens and a `Version`
/// header must be present.
fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match token {
        Some(t) if state.config.tokens.iter().any(|known| known == t) => {}
        _ => return Err(error(StatusCode::UNAUTHORIZED, "Invalid JWT")),
    }
    if headers.get("version").is_none() {
        return Err(error(StatusCode::BAD_REQUEST, "version header was not found"));
    }
    Ok(())
}

fn require_version(headers: &HeaderMap, expected: &str) -> Result<(), ApiError> {
    let version = headers.get("version").and_then(|v| v.to_str().ok());
    if version != Some(expected) {
        return Err(error(
            StatusCode::BAD_REQUEST,
            format!("Version header must be {expected}"),
        ));
    }
    Ok(())
}

async fn echo(headers: HeaderMap, RawQuery(query): RawQuery) -> Json<Value> {
    let headers: BTreeMap<String, String> = headers
        .iter()
        .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
        .collect();
    Json(json!({ "headers": headers, "query": query }))
}

async fn get_location(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    authorize(&state, &headers)?;
    if id != state.config.location_id {
        return Err(error(StatusCode::FORBIDDEN, "The token does not have access to this location."));
    }
    Ok(Json(json!({
        "location": { "id": id, "name": state.config.location_name }
    })))
}

async fn create_contact(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreateContact>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    authorize(&state, &headers)?;
    match input.location_id.as_deref() {
        None | Some("") => {
            return Err(error(
                StatusCode::UNPROCESSABLE_ENTITY,
                json!(["locationId should not be empty"]),
            ))
        }
        Some(id) if id != state.config.location_id => {
            return Err(error(StatusCode::FORBIDDEN, "The token does not have access to this location."))
        }
        Some(_) => {}
    }
    if input.email.is_none() && input.phone.is_none() {
        return Err(error(
            StatusCode::UNPROCESSABLE_ENTITY,
            json!(["email must be an email", "phone must be a valid phone number"]),
        ));
    }

    let contact = Contact {
        id: Uuid::new_v4().simple().to_string(),
        location_id: state.config.location_id.clone(),
        first_name: input.first_name,
        last_name: input.last_name,
        email: input.email,
        phone: input.phone,
        company_name: input.company_name,
        tags: input.tags,
    };
    state
        .store
        .write()
        .await
        .contacts
        .insert(contact.id.clone(), contact.clone());
    Ok((StatusCode::CREATED, Json(json!({ "contact": contact }))))
}

async fn get_contact(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    authorize(&state, &headers)?;
    let store = state.store.read().await;
    let contact = store
        .contacts
        .get(&id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Contact not found"))?;
    Ok(Json(json!({ "contact": contact })))
}

async fn update_contact(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<UpdateContact>,
) -> Result<Json<Value>, ApiError> {
    authorize(&state, &headers)?;
    let mut store = state.store.write().await;
    let contact = store
        .contacts
        .get_mut(&id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Contact not found"))?;
    if let Some(v) = input.first_name {
        contact.first_name = Some(v);
    }
    if let Some(v) = input.last_name {
        contact.last_name = Some(v);
    }
    if let Some(v) = input.email {
        contact.email = Some(v);
    }
    if let Some(v) = input.phone {
        contact.phone = Some(v);
    }
    if let Some(v) = input.company_name {
        contact.company_name = Some(v);
    }
    if let Some(v) = input.tags {
        contact.tags = v;
    }
    Ok(Json(json!({ "contact": contact })))
}

async fn delete_contact(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    authorize(&state, &headers)?;
    state
        .store
        .write()
        .await
        .contacts
        .remove(&id)
        .map(|_| Json(json!({ "succeded": true })))
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Contact not found"))
}

async fn search_contacts(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<SearchContacts>,
) -> Result<Json<Value>, ApiError> {
    authorize(&state, &headers)?;
    if input.location_id != state.config.location_id {
        return Err(error(StatusCode::FORBIDDEN, "The token does not have access to this location."));
    }
    let needle = input.query.unwrap_or_default().to_lowercase();
    let store = state.store.read().await;
    let matches: Vec<&Contact> = store
        .contacts
        .values()
        .filter(|c| needle.is_empty() || contact_matches(c, &needle))
        .collect();
    let total = matches.len();
    let page: Vec<&Contact> = matches
        .into_iter()
        .take(input.page_limit.unwrap_or(20))
        .collect();
    Ok(Json(json!({ "contacts": page, "total": total })))
}

fn contact_matches(contact: &Contact, needle: &str) -> bool {
    [
        &contact.first_name,
        &contact.last_name,
        &contact.email,
        &contact.phone,
        &contact.company_name,
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(needle))
}

async fn add_tags(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<TagsBody>,
) -> Result<Json<Value>, ApiError> {
    authorize(&state, &headers)?;
    let mut store = state.store.write().await;
    let contact = store
        .contacts
        .get_mut(&id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Contact not found"))?;
    for tag in input.tags {
        if !contact.tags.contains(&tag) {
            contact.tags.push(tag);
        }
    }
    Ok(Json(json!({ "tags": contact.tags })))
}

async fn remove_tags(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<TagsBody>,
) -> Result<Json<Value>, ApiError> {
    authorize(&state, &headers)?;
    let mut store = state.store.write().await;
    let contact = store
        .contacts
        .get_mut(&id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Contact not found"))?;
    contact.tags.retain(|t| !input.tags.contains(t));
    Ok(Json(json!({ "tags": contact.tags })))
}

async fn search_conversations(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    authorize(&state, &headers)?;
    require_version(&headers, CONVERSATIONS_VERSION)?;
    if params.get("locationId") != Some(&state.config.location_id) {
        return Err(error(StatusCode::FORBIDDEN, "The token does not have access to this location."));
    }
    let limit = params
        .get("limit")
        .and_then(|l| l.parse::<usize>().ok())
        .unwrap_or(20);
    let store = state.store.read().await;
    let matches: Vec<&Conversation> = store
        .conversations
        .values()
        .filter(|c| params.get("contactId").map_or(true, |id| &c.contact_id == id))
        .collect();
    let total = matches.len();
    let page: Vec<&Conversation> = matches.into_iter().take(limit).collect();
    Ok(Json(json!({ "conversations": page, "total": total })))
}

async fn get_conversation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Conversation>, ApiError> {
    authorize(&state, &headers)?;
    require_version(&headers, CONVERSATIONS_VERSION)?;
    let store = state.store.read().await;
    store
        .conversations
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Conversation not found"))
}

async fn get_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    authorize(&state, &headers)?;
    require_version(&headers, CONVERSATIONS_VERSION)?;
    let store = state.store.read().await;
    if !store.conversations.contains_key(&id) {
        return Err(error(StatusCode::NOT_FOUND, "Conversation not found"));
    }
    let limit = params
        .get("limit")
        .and_then(|l| l.parse::<usize>().ok())
        .unwrap_or(20);
    let all = store.messages.get(&id).cloned().unwrap_or_default();
    let page: Vec<Message> = all.iter().rev().take(limit).cloned().collect();
    let next_page = all.len() > page.len();
    let last_message_id = page.last().map(|m| m.id.clone());
    Ok(Json(json!({
        "messages": {
            "messages": page,
            "lastMessageId": last_message_id,
            "nextPage": next_page,
        }
    })))
}

async fn send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<SendMessage>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    authorize(&state, &headers)?;
    require_version(&headers, CONVERSATIONS_VERSION)?;

    let body = match input.message_type.as_str() {
        "SMS" => input.message.filter(|m| !m.is_empty()).ok_or_else(|| {
            error(
                StatusCode::UNPROCESSABLE_ENTITY,
                json!(["message should not be empty"]),
            )
        })?,
        "Email" => input
            .html
            .or(input.message)
            .or(input.subject)
            .ok_or_else(|| {
                error(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    json!(["html should not be empty", "subject should not be empty"]),
                )
            })?,
        other => {
            return Err(error(
                StatusCode::UNPROCESSABLE_ENTITY,
                json!([format!("type must be one of SMS, Email (got {other})")]),
            ))
        }
    };

    let mut store = state.store.write().await;
    if !store.contacts.contains_key(&input.contact_id) {
        return Err(error(StatusCode::BAD_REQUEST, "Contact not found"));
    }

    let existing = store
        .conversations
        .values()
        .find(|c| c.contact_id == input.contact_id)
        .map(|c| c.id.clone());
    let conversation_id = match existing {
        Some(id) => id,
        None => {
            let conversation = Conversation {
                id: Uuid::new_v4().simple().to_string(),
                contact_id: input.contact_id.clone(),
                location_id: state.config.location_id.clone(),
                last_message_body: None,
                unread_count: 0,
            };
            let id = conversation.id.clone();
            store.conversations.insert(id.clone(), conversation);
            id
        }
    };

    let message = Message {
        id: Uuid::new_v4().simple().to_string(),
        conversation_id: conversation_id.clone(),
        direction: "outbound".to_string(),
        body: body.clone(),
        message_type: format!("TYPE_{}", input.message_type.to_uppercase()),
    };
    let message_id = message.id.clone();
    store
        .messages
        .entry(conversation_id.clone())
        .or_default()
        .push(message);
    if let Some(conversation) = store.conversations.get_mut(&conversation_id) {
        conversation.last_message_body = Some(body);
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "conversationId": conversation_id,
            "messageId": message_id,
            "msg": "Message queued successfully.",
        })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_serializes_camel_case() {
        let contact = Contact {
            id: "c1".to_string(),
            location_id: "loc-1".to_string(),
            first_name: Some("Ada".to_string()),
            last_name: None,
            email: None,
            phone: Some("+15550100".to_string()),
            company_name: None,
            tags: vec!["vip".to_string()],
        };
        let json = serde_json::to_value(&contact).unwrap();
        assert_eq!(json["locationId"], "loc-1");
        assert_eq!(json["firstName"], "Ada");
        assert!(json.get("lastName").is_none());
        assert_eq!(json["tags"][0], "vip");
    }

    #[test]
    fn create_contact_defaults_tags_to_empty() {
        let input: CreateContact =
            serde_json::from_str(r#"{"locationId":"loc-1","email":"a@b.c"}"#).unwrap();
        assert!(input.tags.is_empty());
        assert_eq!(input.email.as_deref(), Some("a@b.c"));
    }

    #[test]
    fn update_contact_all_fields_optional() {
        let input: UpdateContact = serde_json::from_str("{}").unwrap();
        assert!(input.first_name.is_none());
        assert!(input.tags.is_none());
    }

    #[test]
    fn contact_search_matches_any_text_field() {
        let contact = Contact {
            id: "c1".to_string(),
            location_id: "loc-1".to_string(),
            first_name: Some("Grace".to_string()),
            last_name: Some("Hopper".to_string()),
            email: None,
            phone: None,
            company_name: None,
            tags: Vec::new(),
        };
        assert!(contact_matches(&contact, "hopp"));
        assert!(!contact_matches(&contact, "ada"));
    }

    #[test]
    fn error_body_carries_status_and_message() {
        let (status, Json(body)) = error(StatusCode::NOT_FOUND, "Contact not found");
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["statusCode"], 404);
        assert_eq!(body["message"], "Contact not found");
    }
}
