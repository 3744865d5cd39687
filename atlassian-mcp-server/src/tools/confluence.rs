//! Confluence tools
//!
//! Space and page listing, page reads, and page create/update through the
//! Confluence REST API under `/wiki/rest/api`. Page bodies are exchanged in
//! storage format. Updates send `version + 1` without checking the current
//! version first.

use crate::atlassian_client::RemoteApi;
use crate::error::{AtlassianMcpError, AtlassianMcpResult};
use crate::tools::common::{
    array_at, impl_pretty_display, require_non_empty, require_positive, status_with_json, str_at,
    string_at,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument};

/// Expansion used when reading a single page
pub const PAGE_EXPAND: &str = "body.storage,version,space";

/// Parameters for the get_confluence_spaces tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ListSpacesParams {
    /// Maximum spaces to return (optional, default: 25)
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceSummary {
    pub id: u64,
    pub key: String,
    pub name: String,
    pub space_type: String,
    pub status: String,
}

/// Result from the get_confluence_spaces tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListSpacesResult {
    pub returned_spaces: usize,
    pub limit: u32,
    pub spaces: Vec<SpaceSummary>,
}

/// Parameters for the get_confluence_pages tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ListPagesParams {
    /// Space key (e.g., "ENG")
    pub space_key: String,

    /// Maximum pages to return (optional, default: 25)
    pub limit: Option<u32>,
}

/// Result from the get_confluence_pages tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPagesResult {
    pub space_key: String,
    pub returned_pages: usize,
    pub limit: u32,
    pub pages: Vec<PageContent>,
}

/// Parameters for the get_confluence_page tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GetPageParams {
    /// Numeric page ID
    pub page_id: String,
}

/// A Confluence page flattened to its metadata and bodies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageContent {
    pub page_id: String,
    pub title: String,
    pub space: String,
    pub space_key: String,
    pub version: u64,
    pub last_modified: String,
    pub last_modified_by: String,

    /// Rendered view, present only when `body.view` was expanded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_html: Option<String>,

    pub content_storage: String,
}

impl PageContent {
    /// Flatten a content response, using `fallback_title` when the page has none
    pub fn from_value(page: &Value, fallback_title: &str) -> Self {
        PageContent {
            page_id: string_at(page, "/id"),
            title: page
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or(fallback_title)
                .to_string(),
            space: page
                .pointer("/space/name")
                .and_then(Value::as_str)
                .unwrap_or("Unknown")
                .to_string(),
            space_key: string_at(page, "/space/key"),
            version: page
                .pointer("/version/number")
                .and_then(Value::as_u64)
                .unwrap_or(1),
            last_modified: string_at(page, "/version/when"),
            last_modified_by: string_at(page, "/version/by/displayName"),
            content_html: page
                .pointer("/body/view")
                .map(|view| string_at(view, "/value")),
            content_storage: string_at(page, "/body/storage/value"),
        }
    }
}

/// Parameters for the create_confluence_page tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CreatePageParams {
    /// Space key where the page is created
    pub space_key: String,

    /// Page title
    pub title: String,

    /// Page body in Confluence storage format (XHTML)
    pub content: String,

    /// Parent page ID (optional)
    pub parent_id: Option<String>,
}

/// Parameters for the update_confluence_page tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdatePageParams {
    /// Numeric page ID
    pub page_id: String,

    /// Page title
    pub title: String,

    /// New page body in Confluence storage format (XHTML)
    pub content: String,

    /// Current version number of the page; the update is sent as version + 1
    pub version: u64,
}

impl_pretty_display!(ListSpacesResult, ListPagesResult, PageContent);

/// Validate a numeric Confluence page ID
pub fn validate_page_id(parameter: &str, page_id: &str) -> AtlassianMcpResult<String> {
    let id = page_id.trim();
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        return Err(AtlassianMcpError::invalid_param(
            parameter,
            format!("'{}' is not a valid Confluence page ID; expected digits only", id),
        ));
    }
    Ok(id.to_string())
}

fn content_path(page_id: &str) -> String {
    format!("/wiki/rest/api/content/{}", page_id)
}

fn storage_body(content: &str) -> Value {
    json!({
        "storage": {
            "value": content,
            "representation": "storage"
        }
    })
}

/// Fetch one page with the given expansion
pub async fn fetch_page(api: &dyn RemoteApi, page_id: &str, expand: &str) -> AtlassianMcpResult<Value> {
    api.get(&content_path(page_id), &[("expand", expand.to_string())])
        .await
}

pub struct ListSpacesTool {
    api: Arc<dyn RemoteApi>,
}

impl ListSpacesTool {
    pub fn new(api: Arc<dyn RemoteApi>) -> Self {
        Self { api }
    }

    #[instrument(skip(self))]
    pub async fn execute(&self, params: ListSpacesParams) -> AtlassianMcpResult<ListSpacesResult> {
        let limit = params.limit.unwrap_or(25);
        require_positive("limit", limit)?;
        info!("Listing Confluence spaces (limit: {})", limit);

        let page = self
            .api
            .get("/wiki/rest/api/space", &[("limit", limit.to_string())])
            .await?;

        let spaces: Vec<SpaceSummary> = array_at(&page, "/results")
            .iter()
            .map(|space| SpaceSummary {
                id: space.get("id").and_then(Value::as_u64).unwrap_or(0),
                key: string_at(space, "/key"),
                name: string_at(space, "/name"),
                space_type: string_at(space, "/type"),
                status: string_at(space, "/status"),
            })
            .collect();

        Ok(ListSpacesResult {
            returned_spaces: spaces.len(),
            limit,
            spaces,
        })
    }
}

pub struct ListPagesTool {
    api: Arc<dyn RemoteApi>,
}

impl ListPagesTool {
    pub fn new(api: Arc<dyn RemoteApi>) -> Self {
        Self { api }
    }

    #[instrument(skip(self))]
    pub async fn execute(&self, params: ListPagesParams) -> AtlassianMcpResult<ListPagesResult> {
        require_non_empty("space_key", &params.space_key)?;
        let limit = params.limit.unwrap_or(25);
        require_positive("limit", limit)?;

        let space_key = params.space_key.trim().to_string();
        info!("Listing pages in space {} (limit: {})", space_key, limit);

        let page = self
            .api
            .get(
                &format!("/wiki/rest/api/space/{}/content/page", space_key),
                &[
                    ("limit", limit.to_string()),
                    ("expand", "version,body.storage".to_string()),
                ],
            )
            .await?;

        let pages: Vec<PageContent> = array_at(&page, "/results")
            .iter()
            .map(|p| PageContent::from_value(p, "Untitled"))
            .map(|mut p| {
                if p.space_key.is_empty() {
                    p.space_key = space_key.clone();
                }
                p
            })
            .collect();

        Ok(ListPagesResult {
            space_key,
            returned_pages: pages.len(),
            limit,
            pages,
        })
    }
}

pub struct GetPageTool {
    api: Arc<dyn RemoteApi>,
}

impl GetPageTool {
    pub fn new(api: Arc<dyn RemoteApi>) -> Self {
        Self { api }
    }

    #[instrument(skip(self))]
    pub async fn execute(&self, params: GetPageParams) -> AtlassianMcpResult<PageContent> {
        let page_id = validate_page_id("page_id", &params.page_id)?;
        info!("Reading Confluence page {}", page_id);

        let page = fetch_page(self.api.as_ref(), &page_id, PAGE_EXPAND).await?;
        Ok(PageContent::from_value(&page, "Untitled"))
    }
}

pub struct CreatePageTool {
    api: Arc<dyn RemoteApi>,
}

impl CreatePageTool {
    pub fn new(api: Arc<dyn RemoteApi>) -> Self {
        Self { api }
    }

    #[instrument(skip(self, params), fields(space_key = %params.space_key, title = %params.title))]
    pub async fn execute(&self, params: CreatePageParams) -> AtlassianMcpResult<String> {
        require_non_empty("space_key", &params.space_key)?;
        require_non_empty("title", &params.title)?;

        let parent_id = params
            .parent_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .map(|id| validate_page_id("parent_id", id))
            .transpose()?;

        let mut body = json!({
            "type": "page",
            "title": params.title.trim(),
            "space": {"key": params.space_key.trim()},
            "body": storage_body(&params.content),
        });
        if let Some(parent_id) = &parent_id {
            body["ancestors"] = json!([{ "id": parent_id }]);
        }

        info!(
            "Creating page '{}' in space {}",
            params.title, params.space_key
        );

        let created = self.api.post("/wiki/rest/api/content", &body).await?;
        let id = str_at(&created, "/id");
        if id.is_empty() {
            return Err(AtlassianMcpError::internal(
                "Confluence accepted the page but returned no id",
            ));
        }

        status_with_json(&format!("Created page: {}", id), &created)
    }
}

pub struct UpdatePageTool {
    api: Arc<dyn RemoteApi>,
}

impl UpdatePageTool {
    pub fn new(api: Arc<dyn RemoteApi>) -> Self {
        Self { api }
    }

    #[instrument(skip(self, params), fields(page_id = %params.page_id, version = params.version))]
    pub async fn execute(&self, params: UpdatePageParams) -> AtlassianMcpResult<String> {
        let page_id = validate_page_id("page_id", &params.page_id)?;
        require_non_empty("title", &params.title)?;

        let next_version = params.version.checked_add(1).ok_or_else(|| {
            AtlassianMcpError::invalid_param("version", "Version number is out of range")
        })?;

        info!("Updating page {} to version {}", page_id, next_version);

        let updated = self
            .api
            .put(
                &content_path(&page_id),
                &json!({
                    "version": {"number": next_version},
                    "title": params.title.trim(),
                    "type": "page",
                    "body": storage_body(&params.content),
                }),
            )
            .await?;

        status_with_json(&format!("Updated page {}", page_id), &updated)
    }
}
