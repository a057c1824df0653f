// ABOUTME: Wikipedia lookup via the MediaWiki action API.
// ABOUTME: Searches for the best-matching article and returns its intro extract.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::config::Config;

use super::{Tool, ToolResult};

const API_URL: &str = "https://en.wikipedia.org/w/api.php";
const REQUEST_TIMEOUT_SECS: u64 = 10;
/// Intro extracts can run long; cap what goes back to the model.
const MAX_EXTRACT_CHARS: usize = 2000;

pub struct WikipediaTool {
    max_results: usize,
    client: Client,
}

impl WikipediaTool {
    pub fn new(config: &Config) -> Self {
        Self {
            max_results: config.tools.search_results,
            client: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    async fn search_titles(&self, query: &str) -> Result<Vec<String>> {
        let body: Value = self
            .client
            .get(API_URL)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", &self.max_results.to_string()),
                ("format", "json"),
            ])
            .send()
            .await
            .context("Failed to reach the Wikipedia API")?
            .json()
            .await
            .context("Failed to decode Wikipedia search response")?;
        Ok(parse_search_titles(&body))
    }

    async fn fetch_extract(&self, title: &str) -> Result<Option<String>> {
        let body: Value = self
            .client
            .get(API_URL)
            .query(&[
                ("action", "query"),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("titles", title),
                ("format", "json"),
            ])
            .send()
            .await
            .context("Failed to reach the Wikipedia API")?
            .json()
            .await
            .context("Failed to decode Wikipedia extract response")?;
        Ok(parse_extract(&body))
    }
}

#[async_trait]
impl Tool for WikipediaTool {
    fn name(&self) -> &str {
        "wikipedia"
    }

    fn description(&self) -> &str {
        "Look up encyclopedia articles on Wikipedia. \
         Input should be a topic, person, place, or concept."
    }

    fn schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Topic to look up"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolResult> {
        let query = params["query"]
            .as_str()
            .context("query parameter required")?;

        let titles = self.search_titles(query).await?;
        let Some(title) = titles.first() else {
            return Ok(ToolResult::text(format!("No Wikipedia results for: {query}")));
        };

        let extract = self.fetch_extract(title).await?;
        match extract {
            Some(extract) => Ok(ToolResult::text(format_article(title, &extract))),
            None => Ok(ToolResult::text(format!(
                "Found \"{title}\" but it has no readable extract."
            ))),
        }
    }
}

fn parse_search_titles(body: &Value) -> Vec<String> {
    body["query"]["search"]
        .as_array()
        .map(|results| {
            results
                .iter()
                .filter_map(|r| r["title"].as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_extract(body: &Value) -> Option<String> {
    let pages = body["query"]["pages"].as_object()?;
    let page = pages.values().next()?;
    let extract = page["extract"].as_str()?.trim();
    if extract.is_empty() {
        return None;
    }
    Some(extract.to_string())
}

fn format_article(title: &str, extract: &str) -> String {
    let truncated: String = extract.chars().take(MAX_EXTRACT_CHARS).collect();
    if truncated.len() < extract.len() {
        format!("Page: {title}\n\n{truncated}...")
    } else {
        format!("Page: {title}\n\n{truncated}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_search_titles_in_order() {
        let body = json!({
            "query": {
                "search": [
                    {"title": "Rust (programming language)"},
                    {"title": "Rust"},
                ]
            }
        });
        assert_eq!(
            parse_search_titles(&body),
            vec!["Rust (programming language)", "Rust"]
        );
    }

    #[test]
    fn parse_search_titles_handles_empty() {
        assert!(parse_search_titles(&json!({"query": {"search": []}})).is_empty());
        assert!(parse_search_titles(&json!({})).is_empty());
    }

    #[test]
    fn parse_extract_reads_first_page() {
        let body = json!({
            "query": {
                "pages": {
                    "12345": {"title": "Rust", "extract": "Rust is a language.\n"}
                }
            }
        });
        assert_eq!(parse_extract(&body).as_deref(), Some("Rust is a language."));
    }

    #[test]
    fn parse_extract_missing_or_blank_is_none() {
        assert_eq!(parse_extract(&json!({})), None);
        let blank = json!({"query": {"pages": {"1": {"extract": "   "}}}});
        assert_eq!(parse_extract(&blank), None);
    }

    #[test]
    fn format_article_truncates_long_extracts() {
        let long = "x".repeat(MAX_EXTRACT_CHARS + 50);
        let text = format_article("Thing", &long);
        assert!(text.starts_with("Page: Thing\n\n"));
        assert!(text.ends_with("..."));
        assert!(text.len() < long.len());

        let short = format_article("Thing", "brief");
        assert_eq!(short, "Page: Thing\n\nbrief");
    }

    #[test]
    fn tool_identity() {
        let tool = WikipediaTool::new(&Config::default());
        assert_eq!(tool.name(), "wikipedia");
        assert!(tool.schema()["required"]
            .as_array()
            .unwrap()
            .iter()
            .any(|v| v == "query"));
    }
}
