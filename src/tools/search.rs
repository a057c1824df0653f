// ABOUTME: DuckDuckGo HTML search backing both ddg-search and critical_search.
// ABOUTME: Scrapes result titles, links, and snippets from the html.duckduckgo.com endpoint.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use serde_json::Value;

use crate::config::Config;

use super::{Tool, ToolResult};

const SEARCH_URL: &str = "https://html.duckduckgo.com/html/";
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_7_2) AppleWebKit/537.36";
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// One scraped search result. Also reused by the Google tool for its JSON hits.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

pub struct SearchTool {
    name: &'static str,
    description: &'static str,
    max_results: usize,
    client: Client,
}

impl SearchTool {
    /// The plain web search entry ("ddg-search").
    pub fn standard(config: &Config) -> Self {
        Self::with_identity(
            config,
            "ddg-search",
            "Search the web with DuckDuckGo for current information. \
             Input should be a search query.",
        )
    }

    /// The critical-review entry ("critical_search"): same engine, but the
    /// model is told to use it for opposing viewpoints.
    pub fn critical(config: &Config) -> Self {
        Self::with_identity(
            config,
            "critical_search",
            "Search the web for critical perspectives, reviews, and counterarguments \
             about a claim or topic. Input should be a search query.",
        )
    }

    fn with_identity(config: &Config, name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            max_results: config.tools.search_results,
            client: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolResult> {
        let query = params["query"]
            .as_str()
            .context("query parameter required")?;

        let resp = self
            .client
            .get(SEARCH_URL)
            .query(&[("q", query)])
            .header("User-Agent", USER_AGENT)
            .send()
            .await;

        match resp {
            Ok(resp) => {
                let html = resp.text().await.context("Failed to read search page")?;
                let hits = extract_results(&html, self.max_results)?;
                Ok(ToolResult::text(format_results(query, &hits)))
            }
            Err(e) => Ok(ToolResult::error(format!("DuckDuckGo search error: {e}"))),
        }
    }
}

/// Pull results out of the DuckDuckGo HTML page.
pub fn extract_results(html: &str, count: usize) -> Result<Vec<SearchHit>> {
    let document = Html::parse_document(html);

    let result_sel = Selector::parse(".result")
        .map_err(|e| anyhow::anyhow!("Failed to parse selector: {:?}", e))?;
    let title_sel = Selector::parse(".result__a")
        .map_err(|e| anyhow::anyhow!("Failed to parse selector: {:?}", e))?;
    let snippet_sel = Selector::parse(".result__snippet")
        .map_err(|e| anyhow::anyhow!("Failed to parse selector: {:?}", e))?;

    let mut hits = Vec::new();
    for result in document.select(&result_sel) {
        if hits.len() >= count {
            break;
        }

        let title = result
            .select(&title_sel)
            .next()
            .map(|e| e.text().collect::<String>())
            .unwrap_or_default();
        let url = result
            .select(&title_sel)
            .next()
            .and_then(|e| e.value().attr("href"))
            .unwrap_or("");
        let snippet = result
            .select(&snippet_sel)
            .next()
            .map(|e| e.text().collect::<String>())
            .unwrap_or_default();

        let title = title.trim();
        if title.is_empty() {
            continue;
        }

        hits.push(SearchHit {
            title: title.to_string(),
            url: url.to_string(),
            snippet: snippet.trim().to_string(),
        });
    }

    Ok(hits)
}

/// Numbered plain-text rendering shared by the search-style tools.
pub fn format_results(query: &str, hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return format!("No results for: {query}");
    }

    let mut lines = vec![format!("Results for: {query}\n")];
    for (i, hit) in hits.iter().enumerate() {
        lines.push(format!("{}. {}\n   {}", i + 1, hit.title, hit.url));
        if !hit.snippet.is_empty() {
            lines.push(format!("   {}", hit.snippet));
        }
    }
    lines.join("\n")
}
