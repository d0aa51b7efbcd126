//! The request normalizer and the owned client configuration.
//!
//! # Design
//! `GhlClient` holds a single `Session` (configuration + transport) behind
//! an `RwLock<Arc<_>>`. Every call clones the `Arc` once when it is admitted
//! and uses that snapshot for URL, headers and transport, so a concurrent
//! `rotate_token` can never mix an old token with a new transport inside one
//! call. Rotation builds a complete new session and swaps it in one
//! assignment.
//!
//! The normalizer is split like the rest of this crate: `build_request`
//! turns an `EndpointCall` into plain data, `normalize` classifies what the
//! transport returned. Both are pure and tested without a network.

use std::sync::{Arc, RwLock};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ApiFailure, ConfigError, ErrorKind, FatalConnectivityError};
use crate::headers::{header_profile, HeaderProfile};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};
use crate::query::Query;
use crate::transport::{ObservedTransport, ReqwestFactory, TransportFactory};
use crate::vendor::{parse_vendor_message, raw_details};

/// One outbound request, described by the wrapper that issues it.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointCall {
    pub method: HttpMethod,
    /// Fixed route prefix, appended to the base URL as-is. Never holds
    /// caller-supplied ids; those go in `segments`.
    pub path: String,
    /// Ids and other caller-supplied parts, each percent-encoded as one
    /// path segment after `path`.
    pub segments: Vec<String>,
    pub query: Query,
    pub body: Option<Value>,
    pub profile: HeaderProfile,
    /// Key to take off the success body, e.g. `contact`.
    pub unwrap_key: Option<String>,
}

impl EndpointCall {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            segments: Vec::new(),
            query: Query::new(),
            body: None,
            profile: HeaderProfile::Default,
            unwrap_key: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    pub fn query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn profile(mut self, profile: HeaderProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn unwrap_key(mut self, key: impl Into<String>) -> Self {
        self.unwrap_key = Some(key.into());
        self
    }
}

/// Serialize a request payload, reporting failure as an `Encode` failure.
pub fn encode<B: Serialize + ?Sized>(body: &B) -> Result<Value, ApiFailure> {
    serde_json::to_value(body).map_err(ApiFailure::encode)
}

/// Reject a path segment that would change which resource a URL names.
/// Anything else is encoded by `build_request`.
pub fn check_path_segment(segment: &str) -> Result<(), ApiFailure> {
    let traverses = matches!(segment, "." | "..") || segment.contains(['/', '\\']);
    if segment.trim().is_empty() || traverses {
        return Err(ApiFailure::encode(format!("invalid path segment {segment:?}")));
    }
    Ok(())
}

/// Build the plain-data request for `call` under `config`.
pub fn build_request(config: &ClientConfig, call: &EndpointCall) -> Result<HttpRequest, ApiFailure> {
    let mut url = Url::parse(&format!("{}{}", config.base_url, call.path))
        .map_err(|e| ApiFailure::encode(format!("invalid URL for {}: {e}", call.path)))?;
    if !call.segments.is_empty() {
        for segment in &call.segments {
            check_path_segment(segment)?;
        }
        url.path_segments_mut()
            .map_err(|()| ApiFailure::encode(format!("{} cannot take path segments", call.path)))?
            .pop_if_empty()
            .extend(&call.segments);
    }
    call.query.append_to(&mut url);

    let body = call
        .body
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(ApiFailure::encode)?;

    Ok(HttpRequest {
        method: call.method,
        url: url.into(),
        headers: header_profile(config, &call.profile),
        body,
    })
}

/// Classify a transport outcome into the result envelope.
pub fn normalize<T: DeserializeOwned>(
    outcome: Result<HttpResponse, TransportError>,
    unwrap_key: Option<&str>,
) -> Result<T, ApiFailure> {
    let response = match outcome {
        Ok(response) => response,
        Err(err) => return Err(failure_from_transport(&err)),
    };

    if !response.is_success() {
        return Err(failure_from_response(&response));
    }

    let status = response.status;
    let mut value: Value = if response.body.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&response.body).map_err(|e| ApiFailure::decode(status, e))?
    };

    if let Some(key) = unwrap_key {
        value = match value {
            Value::Object(mut map) => map
                .remove(key)
                .ok_or_else(|| ApiFailure::decode(status, format!("missing `{key}` in response")))?,
            _ => {
                return Err(ApiFailure::decode(
                    status,
                    format!("expected an object containing `{key}`"),
                ))
            }
        };
    }

    serde_json::from_value(value).map_err(|e| ApiFailure::decode(status, e))
}

fn failure_from_transport(err: &TransportError) -> ApiFailure {
    let kind = if err.timed_out() {
        ErrorKind::Timeout
    } else {
        ErrorKind::Network
    };
    match err.status() {
        Some(status) => ApiFailure::interrupted(status, kind, &err.to_string()),
        None => ApiFailure::no_response(kind, &err.to_string()),
    }
}

fn failure_from_response(response: &HttpResponse) -> ApiFailure {
    let details = raw_details(&response.body);
    let text = details
        .as_ref()
        .and_then(parse_vendor_message)
        .unwrap_or_else(|| format!("Request failed with status code {}", response.status));
    ApiFailure::http(response.status, &text, details)
}

struct Session {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
}

impl Session {
    fn build(config: ClientConfig, factory: &dyn TransportFactory) -> Result<Self, ConfigError> {
        let inner = factory.build(&config)?;
        Ok(Self {
            config,
            transport: Arc::new(ObservedTransport::new(inner)),
        })
    }
}

/// Client for the GHL REST API.
pub struct GhlClient {
    session: RwLock<Arc<Session>>,
    factory: Arc<dyn TransportFactory>,
}

impl std::fmt::Debug for GhlClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GhlClient")
            .field("config", &self.snapshot().config)
            .finish()
    }
}

impl GhlClient {
    /// Build a client over the default reqwest transport.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        Self::with_transport_factory(config, Arc::new(ReqwestFactory::default()))
    }

    /// Build a client from `GHL_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn with_transport_factory(
        config: ClientConfig,
        factory: Arc<dyn TransportFactory>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let session = Session::build(config, factory.as_ref())?;
        Ok(Self {
            session: RwLock::new(Arc::new(session)),
            factory,
        })
    }

    fn snapshot(&self) -> Arc<Session> {
        self.session
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Owned copy of the current configuration.
    pub fn current_config(&self) -> ClientConfig {
        self.snapshot().config.clone()
    }

    pub fn location_id(&self) -> String {
        self.snapshot().config.location_id.clone()
    }

    /// Replace the access token and rebuild the transport from scratch.
    ///
    /// Calls admitted before the swap finish with the previous session.
    pub fn rotate_token(&self, new_token: impl Into<String>) -> Result<(), ConfigError> {
        let mut config = self.current_config();
        config.access_token = new_token.into();
        config.validate()?;
        let session = Arc::new(Session::build(config, self.factory.as_ref())?);

        *self.session.write().unwrap_or_else(|e| e.into_inner()) = session;
        tracing::info!("GHL access token rotated");
        Ok(())
    }

    /// Send `call` and decode the (optionally unwrapped) success body as `T`.
    pub async fn send<T: DeserializeOwned>(&self, call: EndpointCall) -> Result<T, ApiFailure> {
        let session = self.snapshot();
        let request = build_request(&session.config, &call)?;
        let outcome = session.transport.execute(request).await;
        normalize(outcome, call.unwrap_key.as_deref())
    }

    /// Check that the API is reachable with the current credentials.
    ///
    /// The only operation whose failure is fatal.
    pub async fn test_connection(&self) -> Result<Value, FatalConnectivityError> {
        let location_id = self.location_id();
        self.send(EndpointCall::get("/locations").segment(location_id))
            .await
            .map_err(|source| FatalConnectivityError { source })
    }
}
