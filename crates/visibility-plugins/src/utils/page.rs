use std::time::Duration;

use reqwest::{redirect::Policy, Client};
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;

pub const CRAWLER_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; AEO-Quiz-Bot/1.0; +https://aeo-quiz.com)";
pub const PAGE_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const MAX_REDIRECTS: usize = 5;

#[derive(Debug, Error)]
pub enum PageError {
    #[error("Failed to parse URL: {0}")]
    UrlParseError(String),
    #[error("Failed to fetch URL: {0}")]
    FetchError(String),
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("HTTP {0}")]
    HttpStatus(u16),
    #[error("Document not set: {0}")]
    DocumentNotSet(String),
}

impl From<reqwest::Error> for PageError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            PageError::Timeout(e.to_string())
        } else {
            PageError::FetchError(e.to_string())
        }
    }
}

/// Request settings shared by every content-class analyzer.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub user_agent: String,
    pub max_redirects: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: PAGE_FETCH_TIMEOUT,
            user_agent: CRAWLER_USER_AGENT.to_string(),
            max_redirects: MAX_REDIRECTS,
        }
    }
}

impl FetchOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn client(&self) -> Result<Client, PageError> {
        Client::builder()
            .user_agent(self.user_agent.as_str())
            .timeout(self.timeout)
            .redirect(Policy::limited(self.max_redirects))
            .build()
            .map_err(|e| PageError::FetchError(e.to_string()))
    }
}

/// A fetched (or inline) HTML page.
///
/// The parsed [`Html`] tree is not `Send`, so callers parse on demand with
/// [`Page::get_document`] after the last await point instead of holding a tree
/// inside the page.
#[derive(Debug, Clone)]
pub struct Page {
    url: Option<Url>,
    html: Option<String>,
}

impl Page {
    pub fn from_html(html: String) -> Self {
        Self {
            url: None,
            html: Some(html),
        }
    }

    pub async fn from_url<T: FromUrl>(url: T) -> Result<Self, PageError> {
        Self::fetch_with(url, &FetchOptions::default()).await
    }

    /// Performs exactly one GET against `url`. Non-2xx responses are errors.
    pub async fn fetch_with<T: FromUrl>(url: T, options: &FetchOptions) -> Result<Self, PageError> {
        let url = url.to_url()?;
        let client = options.client()?;

        debug!(url = %url, "fetching page");
        let response = client.get(url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(PageError::HttpStatus(response.status().as_u16()));
        }

        let body = response.text().await?;

        Ok(Self {
            url: Some(url),
            html: Some(body),
        })
    }

    pub fn get_url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    pub fn get_html(&self) -> Option<&str> {
        self.html.as_deref()
    }

    pub fn get_document(&self) -> Result<Html, PageError> {
        let html = self
            .html
            .as_ref()
            .ok_or(PageError::DocumentNotSet("Document is not set".to_string()))?;
        Ok(Html::parse_document(html))
    }
}

/// Every element matching `css` that is still attached to the document, so
/// nodes detached from the tree are never returned. An unparseable selector
/// matches nothing.
pub fn select<'a>(document: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    select_within(document.root_element(), css)
}

/// Same as [`select`], scoped to `element` and its descendants.
pub fn select_within<'a>(element: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    Selector::parse(css)
        .map(|selector| element.select(&selector).collect())
        .unwrap_or_default()
}

/// Concatenated text of an element, trimmed.
pub fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Text of the `<body>`, falling back to the whole document.
pub fn body_text(document: &Html) -> String {
    match select(document, "body").first() {
        Some(body) => body.text().collect(),
        None => document.root_element().text().collect(),
    }
}

pub fn extract_meta_tags(document: &Html) -> MetaTagInfo {
    let mut meta_tags = MetaTagInfo::default();

    if let Some(title) = select(document, "title").first() {
        let title = element_text(title);
        if !title.is_empty() {
            meta_tags.title = Some(title);
        }
    }

    for meta in select(document, "meta") {
        if meta.value().attr("name") == Some("description") {
            meta_tags.description = meta.value().attr("content").map(|s| s.trim().to_string());
        }
    }

    meta_tags
}

/// Every JSON-LD block on the page, flattened. Top-level arrays and `@graph`
/// containers are expanded; blocks that are not valid JSON are skipped.
pub fn extract_structured_data(document: &Html) -> Vec<Value> {
    let mut blocks = Vec::new();

    for script in select(document, r#"script[type="application/ld+json"]"#) {
        let text: String = script.text().collect();
        match serde_json::from_str::<Value>(text.trim()) {
            Ok(parsed) => flatten_block(parsed, &mut blocks),
            Err(e) => debug!(error = %e, "skipping unparseable structured data block"),
        }
    }

    blocks
}

fn flatten_block(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => items.into_iter().for_each(|item| flatten_block(item, out)),
        Value::Object(mut map) => match map.remove("@graph") {
            Some(graph) => {
                if map.contains_key("@type") {
                    out.push(Value::Object(map));
                }
                flatten_block(graph, out);
            }
            None => out.push(Value::Object(map)),
        },
        _ => {}
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaTagInfo {
    pub title: Option<String>,
    pub description: Option<String>,
}

pub trait FromUrl {
    fn to_url(self) -> Result<Url, PageError>;
}

impl FromUrl for Url {
    fn to_url(self) -> Result<Url, PageError> {
        Ok(self)
    }
}

impl FromUrl for &Url {
    fn to_url(self) -> Result<Url, PageError> {
        Ok(self.clone())
    }
}

impl FromUrl for String {
    fn to_url(self) -> Result<Url, PageError> {
        Url::parse(&self).map_err(|e| PageError::UrlParseError(e.to_string()))
    }
}

impl FromUrl for &String {
    fn to_url(self) -> Result<Url, PageError> {
        Url::parse(self).map_err(|e| PageError::UrlParseError(e.to_string()))
    }
}

impl FromUrl for &str {
    fn to_url(self) -> Result<Url, PageError> {
        Url::parse(self).map_err(|e| PageError::UrlParseError(e.to_string()))
    }
}
