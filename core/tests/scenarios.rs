//! Normalization scenarios driven through a scripted transport.
//!
//! Each case states the call, the canned transport outcome and the expected
//! envelope. The transport records what it was asked to send so header and
//! query assertions look at the exact outbound request.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ghl_core::{
    ClientConfig, ConfigError, EndpointCall, ErrorKind, GhlClient, HeaderProfile, HttpRequest,
    HttpResponse, Query, Transport, TransportError, TransportFactory, ENV_API_KEY, ENV_BASE_URL,
    ENV_LOCATION_ID,
};
use serde_json::{json, Value};

type Outcome = Result<HttpResponse, TransportError>;

#[derive(Default)]
struct Script {
    outcomes: Mutex<Vec<Outcome>>,
    sent: Mutex<Vec<HttpRequest>>,
    builds: Mutex<usize>,
}

struct ScriptedTransport(Arc<Script>);

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Outcome {
        self.0.sent.lock().unwrap().push(request);
        let mut outcomes = self.0.outcomes.lock().unwrap();
        if outcomes.is_empty() {
            ok(200, "{}")
        } else {
            outcomes.remove(0)
        }
    }
}

struct ScriptedFactory(Arc<Script>);

impl TransportFactory for ScriptedFactory {
    fn build(&self, _config: &ClientConfig) -> Result<Arc<dyn Transport>, ConfigError> {
        *self.0.builds.lock().unwrap() += 1;
        Ok(Arc::new(ScriptedTransport(self.0.clone())))
    }
}

fn ok(status: u16, body: &str) -> Outcome {
    Ok(HttpResponse {
        status,
        headers: Vec::new(),
        body: body.to_string(),
    })
}

fn scripted(outcomes: Vec<Outcome>) -> (GhlClient, Arc<Script>) {
    let script = Arc::new(Script {
        outcomes: Mutex::new(outcomes),
        ..Default::default()
    });
    let config = ClientConfig::new("A", "https://x", "L")
        .unwrap()
        .with_api_version("2021-07-28");
    let client =
        GhlClient::with_transport_factory(config, Arc::new(ScriptedFactory(script.clone())))
            .unwrap();
    (client, script)
}

fn last_sent(script: &Script) -> HttpRequest {
    script.sent.lock().unwrap().last().cloned().unwrap()
}

#[tokio::test]
async fn created_contact_is_unwrapped() {
    let (client, _) = scripted(vec![ok(201, r#"{"contact":{"id":"c1"}}"#)]);
    let value: Value = client
        .send(EndpointCall::post("/contacts/").unwrap_key("contact"))
        .await
        .unwrap();
    assert_eq!(value, json!({"id": "c1"}));
}

#[tokio::test]
async fn not_found_is_failure_with_vendor_text() {
    let (client, _) = scripted(vec![ok(404, r#"{"message":"Contact not found"}"#)]);
    let err = client
        .send::<Value>(EndpointCall::get("/contacts/c1"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Http);
    assert_eq!(err.http_status, Some(404));
    assert_eq!(err.message, "GHL API Error (404): Contact not found");
}

#[tokio::test]
async fn status_passes_through_for_every_error_code() {
    for status in [400_u16, 401, 403, 409, 422, 429, 500, 503] {
        let (client, _) = scripted(vec![ok(status, r#"{"message":"nope"}"#)]);
        let err = client
            .send::<Value>(EndpointCall::get("/anything"))
            .await
            .unwrap_err();
        assert_eq!(err.http_status, Some(status), "status {status}");
        assert!(err.message.contains(&format!("({status})")), "status {status}");
    }
}

#[tokio::test]
async fn network_failure_is_500_with_transport_text() {
    let (client, _) = scripted(vec![Err(TransportError::Network(
        "dns error: no such host".into(),
    ))]);
    let err = client
        .send::<Value>(EndpointCall::get("/contacts/c1"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Network);
    assert_eq!(err.http_status, Some(500));
    assert!(err.message.contains("dns error: no such host"));
}

#[tokio::test]
async fn rotation_rebuilds_transport_and_changes_authorization() {
    let (client, script) = scripted(Vec::new());
    assert_eq!(*script.builds.lock().unwrap(), 1);

    let _: Value = client.send(EndpointCall::get("/echo")).await.unwrap();
    assert_eq!(last_sent(&script).header("Authorization"), Some("Bearer A"));

    client.rotate_token("B").unwrap();
    assert_eq!(*script.builds.lock().unwrap(), 2);
    assert_eq!(client.current_config().access_token, "B");

    let _: Value = client.send(EndpointCall::get("/echo")).await.unwrap();
    assert_eq!(last_sent(&script).header("Authorization"), Some("Bearer B"));
}

#[tokio::test]
async fn query_drops_absent_values() {
    let (client, script) = scripted(Vec::new());
    let query = Query::new()
        .param("a", "x")
        .param("b", None::<String>)
        .param("c", 5_i64);
    let _: Value = client
        .send(EndpointCall::get("/items").query(query))
        .await
        .unwrap();
    assert_eq!(last_sent(&script).url, "https://x/items?a=x&c=5");
}

#[tokio::test]
async fn secondary_profile_does_not_leak_into_default_calls() {
    let (client, script) = scripted(Vec::new());

    let _: Value = client
        .send(EndpointCall::get("/conversations/search").profile(HeaderProfile::Secondary))
        .await
        .unwrap();
    assert_eq!(last_sent(&script).header("Version"), Some("2021-04-15"));

    let _: Value = client
        .send(EndpointCall::get("/contacts/c1").profile(HeaderProfile::Version("2099-01-01".into())))
        .await
        .unwrap();
    assert_eq!(last_sent(&script).header("Version"), Some("2099-01-01"));

    let _: Value = client.send(EndpointCall::get("/contacts/c1")).await.unwrap();
    assert_eq!(last_sent(&script).header("Version"), Some("2021-07-28"));
    assert_eq!(client.current_config().api_version, "2021-07-28");
}

#[tokio::test]
async fn body_is_sent_as_json_text() {
    let (client, script) = scripted(Vec::new());
    let _: Value = client
        .send(EndpointCall::put("/contacts/c1").body(json!({"tags": ["vip"]})))
        .await
        .unwrap();
    let sent = last_sent(&script);
    let body: Value = serde_json::from_str(sent.body.as_deref().unwrap()).unwrap();
    assert_eq!(body, json!({"tags": ["vip"]}));
    assert_eq!(sent.header("Content-Type"), Some("application/json"));
}

#[test]
fn missing_environment_fails_before_any_call() {
    let lookup = |name: &str| match name {
        n if n == ENV_API_KEY => Some("A".to_string()),
        n if n == ENV_BASE_URL => Some("https://x".to_string()),
        _ => None,
    };
    let err = ClientConfig::from_lookup(lookup).unwrap_err();
    assert_eq!(err, ConfigError::Missing(ENV_LOCATION_ID));
}

#[tokio::test]
async fn caller_ids_stay_inside_their_path_segment() {
    let (client, script) = scripted(Vec::new());

    let _ = client.get_contact("c1?locationId=OTHER#").await;
    assert_eq!(
        last_sent(&script).url,
        "https://x/contacts/c1%3FlocationId=OTHER%23"
    );

    let _ = client.add_contact_tags("a b", &["vip".to_string()]).await;
    assert_eq!(last_sent(&script).url, "https://x/contacts/a%20b/tags");
}

#[tokio::test]
async fn traversing_ids_are_refused_before_sending() {
    let (client, script) = scripted(Vec::new());

    let err = client.delete_contact("../locations/L").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Encode);
    assert!(err.http_status.is_none());

    let err = client.get_messages("..", None, None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Encode);
    let err = client.get_location("L/../other").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Encode);

    assert!(script.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn status_survives_a_failed_body_read() {
    let (client, _) = scripted(vec![Err(TransportError::BodyRead {
        status: 404,
        cause: Box::new(TransportError::Timeout(30_000)),
    })]);
    let err = client
        .send::<Value>(EndpointCall::get("/contacts").segment("c1"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Timeout);
    assert_eq!(err.http_status, Some(404));
    assert_eq!(err.message, "GHL API Error (404): timeout of 30000ms exceeded");
}
