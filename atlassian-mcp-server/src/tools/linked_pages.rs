//! Confluence pages linked from a Jira issue
//!
//! Scans the issue's remote links, keeps the ones pointing at Confluence and
//! fetches each page. A link whose page cannot be identified or fetched is
//! still reported, carrying an `error` instead of content.

use crate::atlassian_client::RemoteApi;
use crate::error::AtlassianMcpResult;
use crate::tools::common::{array_at, impl_pretty_display, str_at, string_at, validate_issue_key};
use crate::tools::confluence::{fetch_page, PageContent};
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, instrument, warn};

const LINKED_PAGE_EXPAND: &str = "body.storage,body.view,version,space";

static PAGE_ID_QUERY_RE: OnceLock<Regex> = OnceLock::new();
static PAGE_ID_PATH_RE: OnceLock<Regex> = OnceLock::new();

/// Parameters for the get_jira_issue_confluence_content tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct LinkedPagesParams {
    /// Jira issue key (e.g., "PROJ-123")
    pub issue_key: String,
}

/// A linked page with its content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedPage {
    pub link_id: Option<u64>,
    pub url: String,
    #[serde(flatten)]
    pub page: PageContent,
}

/// A linked page whose fetch failed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedPage {
    pub link_id: Option<u64>,
    pub page_id: String,
    pub title: String,
    pub url: String,
    pub error: String,
}

/// A Confluence link with no recognizable page ID
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnresolvedLink {
    pub link_id: Option<u64>,
    pub title: String,
    pub url: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageReference {
    Fetched(FetchedPage),
    FetchFailed(FailedPage),
    Unresolved(UnresolvedLink),
}

impl PageReference {
    pub fn error(&self) -> Option<&str> {
        match self {
            PageReference::Fetched(_) => None,
            PageReference::FetchFailed(failed) => Some(&failed.error),
            PageReference::Unresolved(link) => Some(&link.error),
        }
    }
}

/// Result from the get_jira_issue_confluence_content tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedPagesResult {
    pub issue_key: String,
    pub issue_summary: String,
    pub confluence_pages_count: usize,
    pub confluence_pages: Vec<PageReference>,
}

impl_pretty_display!(LinkedPagesResult);

/// True when a remote link URL points at Confluence
pub fn is_confluence_url(url: &str) -> bool {
    url.contains("/wiki/") || url.to_lowercase().contains("confluence")
}

/// Page ID from a Confluence URL, trying `pageId=<digits>` before
/// `/spaces/<space>/pages/<digits>`
pub fn extract_page_id(url: &str) -> Option<String> {
    let query_re = PAGE_ID_QUERY_RE
        .get_or_init(|| Regex::new(r"[?&]pageId=(\d+)").expect("page id query pattern"));
    let path_re = PAGE_ID_PATH_RE
        .get_or_init(|| Regex::new(r"/spaces/[^/]+/pages/(\d+)").expect("page id path pattern"));

    query_re
        .captures(url)
        .or_else(|| path_re.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Resolves an issue's Confluence remote links into page references
pub struct LinkResolver {
    api: Arc<dyn RemoteApi>,
}

impl LinkResolver {
    pub fn new(api: Arc<dyn RemoteApi>) -> Self {
        Self { api }
    }

    pub async fn linked_pages(&self, issue_key: &str) -> AtlassianMcpResult<LinkedPagesResult> {
        let issue = self
            .api
            .get(
                &format!("/rest/api/3/issue/{}", issue_key),
                &[("fields", "summary".to_string())],
            )
            .await?;

        let links = self
            .api
            .get(&format!("/rest/api/3/issue/{}/remotelink", issue_key), &[])
            .await?;

        let mut pages = Vec::new();
        for link in array_at(&links, "") {
            let url = str_at(link, "/object/url");
            if !is_confluence_url(url) {
                continue;
            }
            pages.push(self.resolve(link, url).await);
        }

        Ok(LinkedPagesResult {
            issue_key: issue_key.to_string(),
            issue_summary: string_at(&issue, "/fields/summary"),
            confluence_pages_count: pages.len(),
            confluence_pages: pages,
        })
    }

    async fn resolve(&self, link: &Value, url: &str) -> PageReference {
        let link_id = link.get("id").and_then(Value::as_u64);
        let link_title = link
            .pointer("/object/title")
            .and_then(Value::as_str)
            .unwrap_or("Untitled");

        let Some(page_id) = extract_page_id(url) else {
            debug!("No page ID in Confluence link {}", url);
            return PageReference::Unresolved(UnresolvedLink {
                link_id,
                title: link_title.to_string(),
                url: url.to_string(),
                error: "Could not extract page ID from URL".to_string(),
            });
        };

        match fetch_page(self.api.as_ref(), &page_id, LINKED_PAGE_EXPAND).await {
            Ok(page) => {
                let mut page = PageContent::from_value(&page, link_title);
                if page.page_id.is_empty() {
                    page.page_id = page_id;
                }
                // linked pages always carry content_html
                page.content_html.get_or_insert_with(String::new);
                PageReference::Fetched(FetchedPage {
                    link_id,
                    url: url.to_string(),
                    page,
                })
            }
            Err(e) => {
                warn!("Failed to fetch linked page {}: {}", page_id, e);
                PageReference::FetchFailed(FailedPage {
                    link_id,
                    page_id,
                    title: link_title.to_string(),
                    url: url.to_string(),
                    error: format!("Failed to fetch content: {}", e),
                })
            }
        }
    }
}

pub struct LinkedPagesTool {
    resolver: LinkResolver,
}

impl LinkedPagesTool {
    pub fn new(api: Arc<dyn RemoteApi>) -> Self {
        Self {
            resolver: LinkResolver::new(api),
        }
    }

    #[instrument(skip(self), fields(issue_key = %params.issue_key))]
    pub async fn execute(&self, params: LinkedPagesParams) -> AtlassianMcpResult<LinkedPagesResult> {
        let issue_key = validate_issue_key(&params.issue_key)?;
        info!("Resolving Confluence pages linked from {}", issue_key);

        let result = self.resolver.linked_pages(&issue_key).await?;

        let failed = result
            .confluence_pages
            .iter()
            .filter(|p| p.error().is_some())
            .count();
        info!(
            "Found {} Confluence links on {} ({} without content)",
            result.confluence_pages_count, issue_key, failed
        );

        Ok(result)
    }
}
