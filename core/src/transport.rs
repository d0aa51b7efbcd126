//! reqwest-backed transport and the observability wrapper.
//!
//! # Design
//! A transport is derived from a `ClientConfig` by a `TransportFactory`.
//! The client never patches a transport: token rotation asks the factory
//! for a new one and wraps it in `ObservedTransport` again, so the request
//! and response log lines survive every rebuild.
//!
//! Log lines go through `tracing`. The binary installs a subscriber that
//! writes to stderr; stdout stays reserved for protocol traffic.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::{ClientConfig, REQUEST_TIMEOUT};
use crate::error::{ConfigError, NO_RESPONSE_STATUS};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};

/// Builds the transport for a configuration snapshot.
pub trait TransportFactory: Send + Sync {
    fn build(&self, config: &ClientConfig) -> Result<Arc<dyn Transport>, ConfigError>;
}

/// Default factory producing a fresh `reqwest::Client` per configuration.
#[derive(Debug, Clone)]
pub struct ReqwestFactory {
    timeout: Duration,
}

impl ReqwestFactory {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for ReqwestFactory {
    fn default() -> Self {
        Self::new(REQUEST_TIMEOUT)
    }
}

impl TransportFactory for ReqwestFactory {
    fn build(&self, _config: &ClientConfig) -> Result<Arc<dyn Transport>, ConfigError> {
        Ok(Arc::new(ReqwestTransport::new(self.timeout)?))
    }
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::Transport(e.to_string()))?;
        Ok(Self { http, timeout })
    }

    fn classify(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.timeout.as_millis())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .http
            .request(to_reqwest_method(request.method), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| self.classify(e))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::BodyRead {
                status,
                cause: Box::new(self.classify(e)),
            })?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Emits one line when a request starts and one when it completes.
pub struct ObservedTransport {
    inner: Arc<dyn Transport>,
}

impl ObservedTransport {
    pub fn new(inner: Arc<dyn Transport>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Transport for ObservedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = request.method;
        let path = request.path().to_string();
        info!(%method, %path, "GHL API request");

        let result = self.inner.execute(request).await;
        match &result {
            Ok(response) => info!(status = response.status, %path, "GHL API response"),
            Err(err) => {
                let status = err.status().unwrap_or(NO_RESPONSE_STATUS);
                warn!(status, %path, error = %err, "GHL API response")
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct Canned {
        seen: Mutex<Vec<HttpRequest>>,
        answer: Result<HttpResponse, TransportError>,
    }

    #[async_trait]
    impl Transport for Canned {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.seen
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(request);
            self.answer.clone()
        }
    }

    fn request() -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: "http://localhost/contacts/1".to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    #[tokio::test]
    async fn observed_transport_passes_results_through() {
        let ok = HttpResponse {
            status: 201,
            headers: Vec::new(),
            body: "{}".to_string(),
        };
        let inner = Arc::new(Canned {
            seen: Mutex::new(Vec::new()),
            answer: Ok(ok.clone()),
        });
        let observed = ObservedTransport::new(inner.clone());
        assert_eq!(observed.execute(request()).await, Ok(ok));
        assert_eq!(inner.seen.lock().unwrap().len(), 1);

        let failing = ObservedTransport::new(Arc::new(Canned {
            seen: Mutex::new(Vec::new()),
            answer: Err(TransportError::Network("connection refused".into())),
        }));
        assert_eq!(
            failing.execute(request()).await,
            Err(TransportError::Network("connection refused".into()))
        );
    }

    #[test]
    fn reqwest_factory_builds_with_fixed_timeout() {
        let factory = ReqwestFactory::default();
        assert_eq!(factory.timeout, REQUEST_TIMEOUT);
        let config = ClientConfig::new("t", "http://localhost", "L").unwrap();
        assert!(factory.build(&config).is_ok());
    }

    #[test]
    fn timeout_message_matches_configured_duration() {
        assert_eq!(
            TransportError::Timeout(REQUEST_TIMEOUT.as_millis()).to_string(),
            "timeout of 30000ms exceeded"
        );
    }
}
