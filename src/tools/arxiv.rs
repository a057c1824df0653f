// ABOUTME: arXiv paper search via the export API's Atom feed.
// ABOUTME: Entries are extracted with scraper selectors, the same way the HTML tools work.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use serde_json::Value;

use crate::config::Config;

use super::{Tool, ToolResult};

const API_URL: &str = "https://export.arxiv.org/api/query";
const REQUEST_TIMEOUT_SECS: u64 = 15;
const MAX_ABSTRACT_CHARS: usize = 1200;

pub struct ArxivTool {
    max_results: usize,
    client: Client,
}

impl ArxivTool {
    pub fn new(config: &Config) -> Self {
        Self {
            max_results: config.tools.search_results,
            client: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }
}

#[async_trait]
impl Tool for ArxivTool {
    fn name(&self) -> &str {
        "arxiv"
    }

    fn description(&self) -> &str {
        "Search arXiv for scientific papers and preprints. \
         Returns titles, authors, and abstracts. Input should be a topic or paper title."
    }

    fn schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Topic, author, or paper title to search for"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolResult> {
        let query = params["query"]
            .as_str()
            .context("query parameter required")?;

        let search_query = format!("all:{query}");
        let resp = self
            .client
            .get(API_URL)
            .query(&[
                ("search_query", search_query.as_str()),
                ("start", "0"),
                ("max_results", &self.max_results.to_string()),
            ])
            .send()
            .await
            .context("Failed to reach the arXiv API")?;

        let feed = resp.text().await.context("Failed to read arXiv feed")?;
        let papers = extract_entries(&feed)?;
        Ok(ToolResult::text(format_papers(query, &papers)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paper {
    pub title: String,
    pub authors: Vec<String>,
    pub published: String,
    pub summary: String,
}

/// Pull entries out of the Atom feed. The feed is simple enough that the
/// HTML parser handles it; tags arrive lowercased.
pub fn extract_entries(feed: &str) -> Result<Vec<Paper>> {
    let document = Html::parse_document(feed);

    let entry_sel = Selector::parse("entry")
        .map_err(|e| anyhow::anyhow!("Failed to parse selector: {:?}", e))?;
    let title_sel = Selector::parse("title")
        .map_err(|e| anyhow::anyhow!("Failed to parse selector: {:?}", e))?;
    let author_sel = Selector::parse("author > name")
        .map_err(|e| anyhow::anyhow!("Failed to parse selector: {:?}", e))?;
    let published_sel = Selector::parse("published")
        .map_err(|e| anyhow::anyhow!("Failed to parse selector: {:?}", e))?;
    let summary_sel = Selector::parse("summary")
        .map_err(|e| anyhow::anyhow!("Failed to parse selector: {:?}", e))?;

    let mut papers = Vec::new();
    for entry in document.select(&entry_sel) {
        let title = entry
            .select(&title_sel)
            .next()
            .map(|e| collapse_whitespace(&e.text().collect::<String>()))
            .unwrap_or_default();
        if title.is_empty() {
            continue;
        }

        let authors = entry
            .select(&author_sel)
            .map(|e| e.text().collect::<String>().trim().to_string())
            .collect();
        let published = entry
            .select(&published_sel)
            .next()
            .map(|e| e.text().collect::<String>())
            .unwrap_or_default()
            .chars()
            .take(10) // keep just the date part of the timestamp
            .collect();
        let summary = entry
            .select(&summary_sel)
            .next()
            .map(|e| collapse_whitespace(&e.text().collect::<String>()))
            .unwrap_or_default();

        papers.push(Paper {
            title,
            authors,
            published,
            summary,
        });
    }

    Ok(papers)
}

pub fn format_papers(query: &str, papers: &[Paper]) -> String {
    if papers.is_empty() {
        return format!("No arXiv results for: {query}");
    }

    let mut lines = vec![format!("arXiv results for: {query}\n")];
    for (i, paper) in papers.iter().enumerate() {
        let date = if paper.published.is_empty() {
            String::new()
        } else {
            format!(" ({})", paper.published)
        };
        lines.push(format!("{}. {}{}", i + 1, paper.title, date));
        if !paper.authors.is_empty() {
            lines.push(format!("   Authors: {}", paper.authors.join(", ")));
        }
        if !paper.summary.is_empty() {
            let abstract_text: String = paper.summary.chars().take(MAX_ABSTRACT_CHARS).collect();
            lines.push(format!("   {abstract_text}"));
        }
    }
    lines.join("\n")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
