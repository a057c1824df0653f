// ABOUTME: Google Programmable Search via the Custom Search JSON API.
// ABOUTME: Needs GOOGLE_API_KEY and GOOGLE_CSE_ID credentials; missing keys surface at call time.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::config::Config;

use super::search::{SearchHit, format_results};
use super::{Tool, ToolResult};

const API_URL: &str = "https://www.googleapis.com/customsearch/v1";
const REQUEST_TIMEOUT_SECS: u64 = 10;

pub struct GoogleSearchTool {
    api_key: Option<String>,
    cse_id: Option<String>,
    max_results: usize,
    client: Client,
}

impl GoogleSearchTool {
    pub fn new(config: &Config) -> Self {
        Self {
            api_key: config.credential("GOOGLE_API_KEY"),
            cse_id: config.credential("GOOGLE_CSE_ID"),
            max_results: config.tools.search_results.min(10),
            client: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }
}

#[async_trait]
impl Tool for GoogleSearchTool {
    fn name(&self) -> &str {
        "google-search"
    }

    fn description(&self) -> &str {
        "Search the web with Google. Input should be a search query."
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

        let (Some(api_key), Some(cse_id)) = (&self.api_key, &self.cse_id) else {
            return Ok(ToolResult::error(
                "google-search needs the GOOGLE_API_KEY and GOOGLE_CSE_ID credentials",
            ));
        };

        let resp = self
            .client
            .get(API_URL)
            .query(&[
                ("key", api_key.as_str()),
                ("cx", cse_id.as_str()),
                ("q", query),
                ("num", &self.max_results.to_string()),
            ])
            .send()
            .await
            .context("Failed to reach the Custom Search API")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Ok(ToolResult::error(format!(
                "Custom Search API error {status}: {body}"
            )));
        }

        let body: Value = resp
            .json()
            .await
            .context("Failed to decode Custom Search response")?;
        let hits = parse_items(&body);
        Ok(ToolResult::text(format_results(query, &hits)))
    }
}

fn parse_items(body: &Value) -> Vec<SearchHit> {
    body["items"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let title = item["title"].as_str()?;
                    Some(SearchHit {
                        title: title.to_string(),
                        url: item["link"].as_str().unwrap_or("").to_string(),
                        snippet: item["snippet"].as_str().unwrap_or("").to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}
