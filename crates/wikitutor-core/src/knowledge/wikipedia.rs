//! MediaWiki page fetcher
//!
//! Uses the `parse` action of the MediaWiki API, which follows redirects and
//! reports the resolved title alongside the rendered page HTML.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::KnowledgeConfig;
use crate::error::{Error, Result};

use super::sanitize::{sanitize_intro, sanitize_links};
use super::{FetchedPage, PageFetcher};

/// Pages with this many top-level paragraphs or fewer are treated as
/// list or disambiguation pages.
const LIST_PAGE_MAX_PARAGRAPHS: usize = 2;

#[derive(Debug, Deserialize)]
struct ParseResponse {
    parse: Option<ParseBlock>,
}

#[derive(Debug, Deserialize)]
struct ParseBlock {
    title: Option<String>,
    text: ParseText,
}

#[derive(Debug, Deserialize)]
struct ParseText {
    #[serde(rename = "*")]
    html: String,
}

/// Page fetcher backed by the MediaWiki API
#[derive(Debug, Clone)]
pub struct WikipediaClient {
    http: Client,
    api_url: String,
}

impl WikipediaClient {
    pub fn new(config: &KnowledgeConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::KnowledgeSourceError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_url: config.api_url.clone(),
        })
    }
}

#[async_trait]
impl PageFetcher for WikipediaClient {
    async fn fetch(&self, topic: &str) -> Result<Option<FetchedPage>> {
        debug!(topic = %topic, "Fetching encyclopedia page");

        let response = self
            .http
            .get(&self.api_url)
            .query(&[
                ("action", "parse"),
                ("format", "json"),
                ("page", topic),
                ("prop", "text"),
                ("redirects", "1"),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: ParseResponse = response.json().await?;

        let Some(parse) = body.parse else {
            warn!(topic = %topic, "Parse block missing from encyclopedia response");
            return Ok(None);
        };

        let title = parse.title.unwrap_or_else(|| topic.to_string());
        let (intro, links) = extract_page(&parse.text.html);

        Ok(Some(FetchedPage {
            title,
            intro,
            links,
        }))
    }
}

/// Extract the sanitized intro and the related link titles from page HTML.
pub fn extract_page(html: &str) -> (Option<String>, Vec<String>) {
    let document = Html::parse_fragment(html);
    let Ok(content_selector) = Selector::parse("div.mw-parser-output") else {
        return (None, Vec::new());
    };
    let Some(content) = document.select(&content_selector).next() else {
        return (None, Vec::new());
    };

    (extract_intro(content), extract_links(content))
}

fn top_level<'a>(content: ElementRef<'a>, tag: &'a str) -> impl Iterator<Item = ElementRef<'a>> {
    content
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |el| el.value().name() == tag)
}

fn extract_intro(content: ElementRef<'_>) -> Option<String> {
    let mut paragraphs = Vec::new();

    for element in content.children().filter_map(ElementRef::wrap) {
        let name = element.value().name();
        if name == "div" && element.value().classes().any(|c| c == "mw-heading2") {
            break;
        }
        if name == "p" {
            let text: String = element.text().collect();
            if !text.trim().is_empty() {
                paragraphs.push(text);
            }
        }
    }

    if paragraphs.is_empty() {
        return None;
    }

    let intro = sanitize_intro(&paragraphs.join("\n"));
    (!intro.is_empty()).then_some(intro)
}

fn extract_links(content: ElementRef<'_>) -> Vec<String> {
    let Ok(anchor) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let paragraph_count = top_level(content, "p").count();
    let containers: Vec<ElementRef<'_>> = if paragraph_count <= LIST_PAGE_MAX_PARAGRAPHS {
        top_level(content, "ul").collect()
    } else {
        top_level(content, "p").collect()
    };

    let targets = containers.into_iter().flat_map(|container| {
        container
            .select(&anchor)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(article_target)
            .collect::<Vec<_>>()
    });

    sanitize_links(targets)
}

/// `/wiki/Some_Title#Section` -> `Some_Title`; namespaced and external
/// links are rejected.
fn article_target(href: &str) -> Option<String> {
    let rest = href.strip_prefix("/wiki/")?;
    if href.contains(':') {
        return None;
    }
    let title = rest.split('#').next().unwrap_or_default();
    (!title.is_empty()).then(|| title.to_string())
}
