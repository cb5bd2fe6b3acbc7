//! HTTP extraction backend
//!
//! Talks JSON to a remote extraction service:
//!
//! | Call | Request | Response |
//! |------|---------|----------|
//! | provision | `POST {endpoint}/v1/sessions` | `{"id": "..."}` |
//! | extract | `POST {endpoint}/v1/sessions/{id}/extract` | `{"data": ...}` |
//! | close | `DELETE {endpoint}/v1/sessions/{id}` | any 2xx |
//!
//! Non-2xx responses become [`BackendError::Http`] carrying the body's
//! `error` field (or the raw body) so that session signatures in the message
//! survive to classification.

use crate::config::BackendConfig;
use crate::extract::{BackendError, BackendProvider, ExtractionBackend, ExtractionRequest};
use crate::model::Section;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{json, Value};
use std::time::Duration;

/// Longest error body kept in an error message
const MAX_ERROR_BODY: usize = 500;

/// Builds the HTTP client used for every backend call
///
/// # Arguments
///
/// * `config` - The backend configuration (user agent, timeout)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &BackendConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Provisions sessions on the remote extraction service
#[derive(Debug, Clone)]
pub struct HttpBackendProvider {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpBackendProvider {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = build_http_client(config)?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl BackendProvider for HttpBackendProvider {
    async fn provision(
        &self,
        section: &Section,
    ) -> Result<Box<dyn ExtractionBackend>, BackendError> {
        let url = format!("{}/v1/sessions", self.endpoint);
        let request = authorize(self.client.post(&url), self.api_key.as_deref())
            .json(&json!({ "label": section.slug }));

        let body = read_json(request.send().await?).await?;
        let session_id = body
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| BackendError::InvalidResponse("session response has no id".into()))?
            .to_string();

        tracing::debug!("Provisioned backend session {} for {}", session_id, section);

        Ok(Box::new(HttpSession {
            client: self.client.clone(),
            session_url: format!("{}/v1/sessions/{}", self.endpoint, session_id),
            api_key: self.api_key.clone(),
            session_id,
        }))
    }
}

/// One provisioned session on the remote service
#[derive(Debug)]
pub struct HttpSession {
    client: Client,
    session_url: String,
    api_key: Option<String>,
    session_id: String,
}

#[async_trait]
impl ExtractionBackend for HttpSession {
    async fn extract(&self, request: ExtractionRequest<'_>) -> Result<Value, BackendError> {
        let url = format!("{}/extract", self.session_url);
        let mut body = json!({
            "url": request.target,
            "instruction": request.instruction,
        });
        if let Some(schema) = request.schema {
            body["schema"] = schema.clone();
        }

        let http = authorize(self.client.post(&url), self.api_key.as_deref()).json(&body);
        let mut response = read_json(http.send().await?).await?;

        // Some deployments report failures in a 200 body
        if let Some(message) = response.get("error").and_then(Value::as_str) {
            return Err(BackendError::InvalidResponse(message.to_string()));
        }

        match response.get_mut("data") {
            Some(data) => Ok(data.take()),
            None => Err(BackendError::InvalidResponse(
                "extract response has no data".to_string(),
            )),
        }
    }

    async fn close(&self) -> Result<(), BackendError> {
        let http = authorize(self.client.delete(&self.session_url), self.api_key.as_deref());
        let response = http.send().await?;
        if response.status().is_success() {
            tracing::debug!("Closed backend session {}", self.session_id);
            Ok(())
        } else {
            Err(error_from_response(response).await)
        }
    }
}

fn authorize(request: RequestBuilder, api_key: Option<&str>) -> RequestBuilder {
    match api_key {
        Some(key) => request.bearer_auth(key),
        None => request,
    }
}

/// Reads a JSON body from a successful response, or the error it carries
async fn read_json(response: Response) -> Result<Value, BackendError> {
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| BackendError::InvalidResponse(e.to_string()))
}

async fn error_from_response(response: Response) -> BackendError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| truncate(&text, MAX_ERROR_BODY));

    BackendError::Http { status, message }
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::FailureClass;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_config(endpoint: &str) -> BackendConfig {
        BackendConfig {
            endpoint: endpoint.to_string(),
            api_key: Some("secret".to_string()),
            timeout_secs: 5,
            user_agent: "archive-harvest-test/1.0".to_string(),
        }
    }

    fn section() -> Section {
        Section::new("news", "News", "https://archive.example.org/news/").unwrap()
    }

    #[test]
    fn test_build_http_client() {
        let config = create_test_config("http://localhost:1");
        assert!(build_http_client(&config).is_ok());
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("abc", 10), "abc");
    }

    #[tokio::test]
    async fn test_provision_extract_close() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/sessions"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "s1" })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v1/sessions/s1/extract"))
            .and(body_partial_json(json!({ "url": "https://archive.example.org/news/" })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "data": { "posts": [] } })),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("DELETE"))
            .and(path("/v1/sessions/s1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let provider = HttpBackendProvider::new(&create_test_config(&server.uri())).unwrap();
        let session = provider.provision(&section()).await.unwrap();

        let data = session
            .extract(ExtractionRequest {
                target: "https://archive.example.org/news/",
                instruction: "list posts",
                schema: None,
            })
            .await
            .unwrap();
        assert_eq!(data, json!({ "posts": [] }));

        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_error_body_is_classified() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/sessions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "s2" })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v1/sessions/s2/extract"))
            .respond_with(ResponseTemplate::new(500).set_body_json(
                json!({ "error": "Session has completed or timed out" }),
            ))
            .mount(&server)
            .await;

        let provider = HttpBackendProvider::new(&create_test_config(&server.uri())).unwrap();
        let session = provider.provision(&section()).await.unwrap();

        let err = session
            .extract(ExtractionRequest {
                target: "https://archive.example.org/news/a/",
                instruction: "extract",
                schema: None,
            })
            .await
            .unwrap_err();

        match &err {
            BackendError::Http { status, message } => {
                assert_eq!(*status, 500);
                assert_eq!(message, "Session has completed or timed out");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(err.class(), FailureClass::Session);
    }

    #[tokio::test]
    async fn test_missing_session_id() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/sessions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let provider = HttpBackendProvider::new(&create_test_config(&server.uri())).unwrap();
        let result = provider.provision(&section()).await;
        assert!(matches!(result, Err(BackendError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_plain_text_error_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/sessions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
            .mount(&server)
            .await;

        let provider = HttpBackendProvider::new(&create_test_config(&server.uri())).unwrap();
        match provider.provision(&section()).await {
            Err(BackendError::Http { status, message }) => {
                assert_eq!(status, 503);
                assert_eq!(message, "upstream unavailable");
            }
            Err(other) => panic!("unexpected error: {:?}", other),
            Ok(_) => panic!("expected failure"),
        }
    }
}
