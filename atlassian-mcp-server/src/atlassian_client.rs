//! HTTP client for the Jira and Confluence REST APIs
//!
//! [`RemoteApi`] is the seam every tool talks to: given a path relative to the
//! configured instance URL, it returns the parsed JSON body or an
//! [`AtlassianMcpError::Http`] carrying the upstream status and body.
//! [`AtlassianClient`] is the reqwest-backed implementation.

use crate::config::{AtlassianConfig, AuthConfig};
use crate::error::{AtlassianMcpError, AtlassianMcpResult};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Query parameters as (name, value) pairs, sent in order
pub type QueryParams<'a> = [(&'a str, String)];

/// Authenticated JSON access to an Atlassian instance
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// GET `path` with `query`, returning the parsed body
    async fn get(&self, path: &str, query: &QueryParams<'_>) -> AtlassianMcpResult<Value>;

    /// POST a JSON body to `path`
    async fn post(&self, path: &str, body: &Value) -> AtlassianMcpResult<Value>;

    /// PUT a JSON body to `path`
    async fn put(&self, path: &str, body: &Value) -> AtlassianMcpResult<Value>;

    /// Fetch the user the credentials belong to
    async fn current_user(&self) -> AtlassianMcpResult<UserInfo> {
        let value = self.get("/rest/api/3/myself", &[]).await?;
        Ok(serde_json::from_value(value)?)
    }
}

/// The account behind the configured credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(rename = "accountId", default)]
    pub account_id: String,
    #[serde(rename = "displayName", default)]
    pub display_name: String,
    #[serde(rename = "emailAddress", default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub active: bool,
}

/// reqwest-backed [`RemoteApi`] for a single Atlassian instance
#[derive(Debug, Clone)]
pub struct AtlassianClient {
    http: Client,
    config: Arc<AtlassianConfig>,
}

impl AtlassianClient {
    /// Create a new client for the given configuration
    #[instrument(skip_all)]
    pub fn new(config: Arc<AtlassianConfig>) -> AtlassianMcpResult<Self> {
        info!("Initializing Atlassian client for URL: {}", config.instance_url);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| AtlassianMcpError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Instance URL this client talks to
    pub fn instance_url(&self) -> &str {
        &self.config.instance_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.instance_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.auth {
            AuthConfig::Basic { email, api_token } => request.basic_auth(email, Some(api_token)),
            AuthConfig::Bearer(token) => request.bearer_auth(token),
            AuthConfig::Anonymous => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> AtlassianMcpResult<Value> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            debug!("Request failed with HTTP {}", status.as_u16());
            return Err(AtlassianMcpError::http(status.as_u16(), text));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl RemoteApi for AtlassianClient {
    async fn get(&self, path: &str, query: &QueryParams<'_>) -> AtlassianMcpResult<Value> {
        debug!("GET {} {:?}", path, query);
        self.send(self.http.get(self.url(path)).query(query)).await
    }

    async fn post(&self, path: &str, body: &Value) -> AtlassianMcpResult<Value> {
        debug!("POST {}", path);
        let request = self
            .http
            .post(self.url(path))
            .header(CONTENT_TYPE, "application/json")
            .json(body);
        self.send(request).await
    }

    async fn put(&self, path: &str, body: &Value) -> AtlassianMcpResult<Value> {
        debug!("PUT {}", path);
        let request = self
            .http
            .put(self.url(path))
            .header(CONTENT_TYPE, "application/json")
            .json(body);
        self.send(request).await
    }
}
