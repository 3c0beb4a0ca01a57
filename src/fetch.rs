//! HTTP client for the CRM backend
//!
//! Every call goes to one fixed base URL with a JSON content type, a
//! per-request timeout and a bounded retry while the backend's database is
//! still warming up.

use std::time::Duration;

use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use url::Url;

use crate::config::{ClientOptions, RetryPolicy};
use crate::error::{Error, Result};

/// Client for the CRM backend API
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http_client: Client,
    request_timeout: Duration,
    long_timeout: Duration,
    retry: RetryPolicy,
}

impl ApiClient {
    /// Create a new API client from the given options
    pub fn new(options: &ClientOptions) -> Result<Self> {
        Self::with_http_client(options, Client::new())
    }

    /// Create a new API client that shares an existing `reqwest::Client`
    pub fn with_http_client(options: &ClientOptions, http_client: Client) -> Result<Self> {
        let parsed = Url::parse(&options.api_url)?;
        if parsed.cannot_be_a_base() {
            return Err(Error::config(format!("{} cannot be used as an API base URL", options.api_url)));
        }

        Ok(Self {
            base_url: options.api_url.trim_end_matches('/').to_string(),
            http_client,
            request_timeout: options.request_timeout,
            long_timeout: options.long_timeout,
            retry: options.retry.clone(),
        })
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Create a GET request
    pub fn get(&self, path: &str) -> FetchBuilder<'_> {
        FetchBuilder::new(self, Method::GET, path)
    }

    /// Create a POST request
    pub fn post(&self, path: &str) -> FetchBuilder<'_> {
        FetchBuilder::new(self, Method::POST, path)
    }

    /// Create a PUT request
    pub fn put(&self, path: &str) -> FetchBuilder<'_> {
        FetchBuilder::new(self, Method::PUT, path)
    }

    /// Create a DELETE request
    pub fn delete(&self, path: &str) -> FetchBuilder<'_> {
        FetchBuilder::new(self, Method::DELETE, path)
    }

    fn classify(&self, err: reqwest::Error, path: &str) -> Error {
        if err.is_timeout() {
            Error::Timeout { path: path.to_string() }
        } else if err.is_connect() || err.is_request() {
            Error::BackendUnavailable { url: self.base_url.clone() }
        } else {
            Error::Http(err)
        }
    }
}

/// Helper for building and executing a single backend call
pub struct FetchBuilder<'a> {
    client: &'a ApiClient,
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
    timeout: Duration,
}

impl<'a> FetchBuilder<'a> {
    fn new(client: &'a ApiClient, method: Method, path: &str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Self {
            client,
            method,
            path: path.to_string(),
            headers,
            body: None,
            timeout: client.request_timeout,
        }
    }

    /// Add a JSON body to the request
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_vec(body)?);
        Ok(self)
    }

    /// Override the timeout for this request
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use the extended timeout reserved for health and setup calls
    pub fn long_running(mut self) -> Self {
        self.timeout = self.client.long_timeout;
        self
    }

    async fn send_once(&self) -> Result<(StatusCode, String)> {
        let url = self.client.url_for(&self.path);
        let mut req = self
            .client
            .http_client
            .request(self.method.clone(), &url)
            .headers(self.headers.clone())
            .timeout(self.timeout);

        if let Some(body) = &self.body {
            req = req.body(body.clone());
        }

        let response = req.send().await.map_err(|e| self.client.classify(e, &self.path))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| self.client.classify(e, &self.path))?;
        Ok((status, text))
    }

    /// Execute the request and return the JSON body.
    ///
    /// A 2xx body with `"success": false` is turned into [`Error::Rejected`].
    pub async fn execute_value(&self) -> Result<Value> {
        let mut attempt = 0;
        loop {
            debug!("{} {} (attempt {})", self.method, self.path, attempt + 1);
            let (status, text) = self.send_once().await?;

            if status.is_success() {
                return parse_success(&text);
            }

            if let Some(delay) = retry_delay(&self.client.retry, attempt, status, &text) {
                warn!(
                    "{} {}: database still initializing, retrying in {:?} ({}/{})",
                    self.method,
                    self.path,
                    delay,
                    attempt + 1,
                    self.client.retry.max_retries()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            return Err(Error::Status { status: status.as_u16(), body: text });
        }
    }

    /// Execute the request and deserialize the whole JSON body
    pub async fn execute<T: DeserializeOwned>(&self) -> Result<T> {
        let value = self.execute_value().await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Execute the request and deserialize one field of the response envelope
    pub async fn execute_field<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self.execute_value().await?;
        take_field(value, key)
    }
}

fn parse_success(text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }

    let value: Value = serde_json::from_str(text)?;
    if value.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(Error::Rejected(error_message(&value).unwrap_or_else(|| "Request was rejected".to_string())));
    }
    Ok(value)
}

/// Delay before retrying after `attempt` failed tries, or `None` to give up
fn retry_delay(policy: &RetryPolicy, attempt: usize, status: StatusCode, body: &str) -> Option<Duration> {
    if status != StatusCode::SERVICE_UNAVAILABLE || !is_initializing(body) {
        return None;
    }
    policy.delays.get(attempt).copied()
}

/// Whether a 503 body says the backing store is still starting up
pub fn is_initializing(body: &str) -> bool {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if value.get("initializing").and_then(Value::as_bool) == Some(true) {
            return true;
        }
    }
    body.to_ascii_lowercase().contains("initializing")
}

/// Pull the human-readable message out of an error body
pub fn error_message(value: &Value) -> Option<String> {
    ["error", "message"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

/// Take one field out of a `{ "success": true, "<key>": ... }` envelope.
///
/// Bodies that are not objects are deserialized as-is.
pub fn take_field<T: DeserializeOwned>(value: Value, key: &str) -> Result<T> {
    let field = match value {
        Value::Object(mut map) => map.remove(key).unwrap_or(Value::Null),
        other => other,
    };
    Ok(serde_json::from_value(field)?)
}
