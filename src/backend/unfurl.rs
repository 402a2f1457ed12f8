//! Bookmark previews
//!
//! `GET /unfurl?url=...` fetches a web page and extracts what a board needs to
//! render a bookmark card: title, description, preview image and favicon.
//! OpenGraph tags win over Twitter card tags, which win over plain HTML.

use std::sync::LazyLock;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    Json,
};
use regex::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::error::BackendError;
use crate::backend::middleware::AuthIdentity;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Only the head of a page is interesting
const MAX_PAGE_BYTES: usize = 512 * 1024;

static TITLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid regex"));
static META: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<meta\s[^>]*>").expect("valid regex"));
static LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<link\s[^>]*>").expect("valid regex"));
static ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)([a-z][a-z0-9:_-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
});

/// Bookmark card data
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BookmarkPreview {
    pub title: String,
    pub description: String,
    pub image: String,
    pub favicon: String,
}

#[derive(Debug, Error)]
pub enum UnfurlError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("page returned status {0}")]
    Status(u16),
}

impl From<UnfurlError> for BackendError {
    fn from(err: UnfurlError) -> Self {
        match err {
            UnfurlError::InvalidUrl(_) => BackendError::bad_request(err.to_string()),
            _ => BackendError::upstream(err.to_string()),
        }
    }
}

/// Fetches pages and builds previews
#[derive(Clone)]
pub struct Unfurler {
    client: reqwest::Client,
}

impl Unfurler {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(concat!("xfboard/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }

    pub async fn unfurl(&self, raw_url: &str) -> Result<BookmarkPreview, UnfurlError> {
        let url = parse_http_url(raw_url)?;

        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(UnfurlError::Status(response.status().as_u16()));
        }
        // Redirects change the base for relative links
        let base = response.url().clone();
        let body = read_head(response, MAX_PAGE_BYTES).await?;
        let html = String::from_utf8_lossy(&body);

        tracing::debug!(url = %url, bytes = body.len(), "[Unfurl] Fetched page");
        Ok(parse_preview(&html, &base))
    }
}

impl Default for Unfurler {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_http_url(raw: &str) -> Result<Url, UnfurlError> {
    let url = Url::parse(raw.trim()).map_err(|e| UnfurlError::InvalidUrl(e.to_string()))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        scheme => Err(UnfurlError::InvalidUrl(format!("unsupported scheme {}", scheme))),
    }
}

/// Read at most `limit` bytes of a response body; the rest is never buffered
async fn read_head(mut response: reqwest::Response, limit: usize) -> Result<Vec<u8>, reqwest::Error> {
    let expected = response
        .content_length()
        .and_then(|len| usize::try_from(len).ok())
        .map_or(limit, |len| len.min(limit));
    let mut body = Vec::with_capacity(expected);

    while body.len() < limit {
        let Some(chunk) = response.chunk().await? else {
            break;
        };
        let take = chunk.len().min(limit - body.len());
        body.extend_from_slice(&chunk[..take]);
    }
    Ok(body)
}

/// Extract a preview from page HTML. Relative image and icon links are
/// resolved against `base`.
pub fn parse_preview(html: &str, base: &Url) -> BookmarkPreview {
    let mut meta = std::collections::HashMap::new();
    for tag in META.find_iter(html) {
        let attrs = attributes(tag.as_str());
        let key = attrs
            .iter()
            .find(|(name, _)| name == "property" || name == "name")
            .map(|(_, value)| value.to_ascii_lowercase());
        let content = attrs.iter().find(|(name, _)| name == "content").map(|(_, v)| v.clone());
        if let (Some(key), Some(content)) = (key, content) {
            meta.entry(key).or_insert(content);
        }
    }
    let first = |keys: &[&str]| {
        keys.iter()
            .find_map(|key| meta.get(*key).filter(|v| !v.trim().is_empty()))
            .map(|v| decode_entities(v.trim()))
    };

    let title = first(&["og:title", "twitter:title"]).or_else(|| {
        TITLE
            .captures(html)
            .and_then(|c| c.get(1))
            .map(|m| decode_entities(m.as_str().trim()))
    });
    let description = first(&["og:description", "description", "twitter:description"]);
    let image = first(&["og:image", "og:image:url", "twitter:image"]).and_then(|src| resolve(base, &src));

    BookmarkPreview {
        title: title.unwrap_or_default(),
        description: description.unwrap_or_default(),
        image: image.unwrap_or_default(),
        favicon: favicon(html, base).unwrap_or_default(),
    }
}

fn favicon(html: &str, base: &Url) -> Option<String> {
    LINK.find_iter(html)
        .filter_map(|tag| {
            let attrs = attributes(tag.as_str());
            let rel = attrs.iter().find(|(name, _)| name == "rel")?.1.to_ascii_lowercase();
            let href = attrs.iter().find(|(name, _)| name == "href")?.1.clone();
            rel.split_whitespace().any(|r| r == "icon" || r == "apple-touch-icon").then_some(href)
        })
        .find_map(|href| resolve(base, &decode_entities(&href)))
        .or_else(|| base.join("/favicon.ico").ok().map(String::from))
}

fn attributes(tag: &str) -> Vec<(String, String)> {
    ATTR.captures_iter(tag)
        .filter_map(|c| {
            let name = c.get(1)?.as_str().to_ascii_lowercase();
            let value = c.get(2).or_else(|| c.get(3))?.as_str().to_string();
            Some((name, value))
        })
        .collect()
}

fn resolve(base: &Url, href: &str) -> Option<String> {
    base.join(href.trim()).ok().map(String::from)
}

fn decode_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

#[derive(Debug, Deserialize)]
pub struct UnfurlParams {
    url: Option<String>,
}

/// Bookmark preview (GET /unfurl?url=)
pub async fn unfurl_handler(
    State(unfurler): State<Unfurler>,
    AuthIdentity(identity): AuthIdentity,
    Query(params): Query<UnfurlParams>,
) -> Result<Json<BookmarkPreview>, BackendError> {
    let url = params
        .url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| BackendError::bad_request("url is required"))?;

    tracing::debug!(url = %url, requester = %identity.label(), "[Unfurl] Preview requested");
    let preview = unfurler.unfurl(&url).await?;
    Ok(Json(preview))
}
