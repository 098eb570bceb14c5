//! Reliable request/response transport over HTTP.

use std::{
    collections::BTreeMap,
    sync::{PoisonError, RwLock},
    time::Duration,
};

use async_trait::async_trait;
use channel_agent_core::{HttpMethod, HttpResult, RequestTransport, TransportError};
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;

use crate::config::DEFAULT_REQUEST_TIMEOUT;

const JSON_CONTENT_TYPE: &str = "application/json";

fn map_reqwest_error(e: &reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Http(e.to_string())
    }
}

/// JSON-over-HTTP client for the messaging service.
///
/// Each instance owns its own connection pool; there is no process-wide
/// state to initialize or tear down.
pub struct HttpClient {
    base_url: String,
    default_headers: RwLock<BTreeMap<String, String>>,
    client: RwLock<Option<reqwest::Client>>,
}

impl HttpClient {
    /// Create a client for a base URL.
    ///
    /// # Errors
    /// Returns error if the underlying HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| map_reqwest_error(&e))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            default_headers: RwLock::new(BTreeMap::new()),
            client: RwLock::new(Some(client)),
        })
    }

    /// Base URL without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Add a header sent with every request.
    pub fn set_default_header(&self, key: impl Into<String>, value: impl Into<String>) {
        self.default_headers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
    }

    /// Stop sending a default header.
    pub fn remove_default_header(&self, key: &str) {
        self.default_headers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    /// `GET` a path.
    ///
    /// # Errors
    /// Returns error if no response was received.
    pub async fn get(&self, path: &str, timeout: Duration) -> Result<HttpResult, TransportError> {
        self.request(HttpMethod::Get, path, None, timeout).await
    }

    /// `POST` a JSON body.
    ///
    /// # Errors
    /// Returns error if no response was received.
    pub async fn post(
        &self,
        path: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<HttpResult, TransportError> {
        self.request(HttpMethod::Post, path, Some(body), timeout).await
    }

    /// `POST` with the default request timeout.
    ///
    /// # Errors
    /// Returns error if no response was received.
    pub async fn post_default(
        &self,
        path: &str,
        body: &Value,
    ) -> Result<HttpResult, TransportError> {
        self.post(path, body, DEFAULT_REQUEST_TIMEOUT).await
    }

    fn build_url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    fn current_client(&self) -> Result<reqwest::Client, TransportError> {
        self.client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(TransportError::Closed)
    }
}

#[async_trait]
impl RequestTransport for HttpClient {
    async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
        timeout: Duration,
    ) -> Result<HttpResult, TransportError> {
        let client = self.current_client()?;
        let url = self.build_url(path);

        let mut builder = match method {
            HttpMethod::Get => client.get(&url),
            HttpMethod::Post => client.post(&url),
            HttpMethod::Put => client.put(&url),
            HttpMethod::Delete => client.delete(&url),
        }
        .timeout(timeout)
        .header(CONTENT_TYPE, JSON_CONTENT_TYPE);

        let headers = self
            .default_headers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for (key, value) in &headers {
            builder = builder.header(key.as_str(), value.as_str());
        }

        if matches!(method, HttpMethod::Post | HttpMethod::Put) {
            if let Some(body) = body {
                builder = builder.body(serde_json::to_vec(body)?);
            }
        }

        tracing::debug!("{method} {url}");
        let response = builder.send().await.map_err(|e| map_reqwest_error(&e))?;
        let status_code = response.status().as_u16();
        let data = response.text().await.map_err(|e| map_reqwest_error(&e))?;
        tracing::debug!("{method} {url} -> {status_code}");

        Ok(HttpResult { status_code, data })
    }

    async fn close_all(&self) {
        let previous = self
            .client
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            tracing::debug!("Released HTTP client for {}", self.base_url);
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        Json, Router,
        http::{HeaderMap, StatusCode},
        routing::{get, post},
    };
    use serde_json::json;

    use super::*;

    async fn spawn_server() -> String {
        let app = Router::new()
            .route(
                "/echo",
                post(|headers: HeaderMap, body: String| async move {
                    let header = |name: &str| {
                        headers
                            .get(name)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default()
                            .to_string()
                    };
                    let parsed: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
                    Json(json!({
                        "data": {
                            "contentType": header("content-type"),
                            "apiKey": header("x-api-key"),
                            "body": parsed,
                        }
                    }))
                }),
            )
            .route(
                "/broken",
                get(|| async { (StatusCode::BAD_GATEWAY, "<html>upstream down</html>") }),
            )
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    "late"
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/")
    }

    #[tokio::test]
    async fn test_post_sends_json_and_default_headers() {
        let base = spawn_server().await;
        let client = HttpClient::new(&base).unwrap();
        client.set_default_header("X-Api-Key", "secret-key");

        let result = client
            .post("echo", &json!({"sessionId": "S1"}), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(result.is_http_ok());

        let body = result.data_as_json();
        assert_eq!(body["data"]["contentType"], "application/json");
        assert_eq!(body["data"]["apiKey"], "secret-key");
        assert_eq!(body["data"]["body"]["sessionId"], "S1");
    }

    #[tokio::test]
    async fn test_removed_header_not_sent() {
        let base = spawn_server().await;
        let client = HttpClient::new(&base).unwrap();
        client.set_default_header("X-Api-Key", "secret-key");
        client.remove_default_header("X-Api-Key");

        let result = client.post_default("/echo", &json!({})).await.unwrap();
        assert_eq!(result.data_as_json()["data"]["apiKey"], "");
    }

    #[tokio::test]
    async fn test_error_status_is_a_response() {
        let base = spawn_server().await;
        let client = HttpClient::new(&base).unwrap();

        let result = client.get("/broken", Duration::from_secs(5)).await.unwrap();
        assert_eq!(result.status_code, 502);
        assert!(!result.is_http_ok());
        assert_eq!(result.data_as_json(), json!({}));
    }

    #[tokio::test]
    async fn test_timeout() {
        let base = spawn_server().await;
        let client = HttpClient::new(&base).unwrap();

        let err = client
            .get("/slow", Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Timeout));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HttpClient::new(&format!("http://{addr}")).unwrap();
        let err = client
            .post_default("/connect", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Http(_)));
    }

    #[tokio::test]
    async fn test_closed_client_refuses_requests() {
        let base = spawn_server().await;
        let client = HttpClient::new(&base).unwrap();
        client.close_all().await;
        client.close_all().await;

        let err = client.post_default("/echo", &json!({})).await.unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }

    #[test]
    fn test_build_url() {
        let client = HttpClient::new("http://svc/api/").unwrap();
        assert_eq!(client.base_url(), "http://svc/api");
        assert_eq!(client.build_url("/pull"), "http://svc/api/pull");
        assert_eq!(client.build_url("push"), "http://svc/api/push");
    }
}
