// ABOUTME: Wolfram|Alpha computational queries via the Short Answers API.
// ABOUTME: Returns a single plain-text answer; 501 means Wolfram had nothing short to say.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::config::Config;

use super::{Tool, ToolResult};

const API_URL: &str = "https://api.wolframalpha.com/v1/result";
const REQUEST_TIMEOUT_SECS: u64 = 15;

pub struct WolframAlphaTool {
    app_id: Option<String>,
    client: Client,
}

impl WolframAlphaTool {
    pub fn new(config: &Config) -> Self {
        Self {
            app_id: config.credential("WOLFRAM_ALPHA_APPID"),
            client: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }
}

#[async_trait]
impl Tool for WolframAlphaTool {
    fn name(&self) -> &str {
        "wolfram-alpha"
    }

    fn description(&self) -> &str {
        "Answer computational, mathematical, and factual questions with Wolfram|Alpha. \
         Input should be a question in plain English."
    }

    fn schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Question to compute or look up"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolResult> {
        let query = params["query"]
            .as_str()
            .context("query parameter required")?;

        let Some(app_id) = &self.app_id else {
            return Ok(ToolResult::error(
                "wolfram-alpha needs the WOLFRAM_ALPHA_APPID credential",
            ));
        };

        let resp = self
            .client
            .get(API_URL)
            .query(&[("appid", app_id.as_str()), ("i", query)])
            .send()
            .await
            .context("Failed to reach the Wolfram|Alpha API")?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();

        if status == StatusCode::NOT_IMPLEMENTED {
            // The API's way of saying there is no short answer.
            return Ok(ToolResult::text(format!(
                "Wolfram|Alpha has no short answer for: {query}"
            )));
        }
        if !status.is_success() {
            return Ok(ToolResult::error(format!(
                "Wolfram|Alpha API error {status}: {body}"
            )));
        }

        Ok(ToolResult::text(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_identity() {
        let tool = WolframAlphaTool::new(&Config::default());
        assert_eq!(tool.name(), "wolfram-alpha");
        assert!(tool.description().contains("Wolfram"));
        assert_eq!(tool.schema()["properties"]["query"]["type"], "string");
    }

    #[tokio::test]
    async fn missing_app_id_is_tool_error() {
        let tool = WolframAlphaTool {
            app_id: None,
            client: Client::new(),
        };
        let result = tool.execute(json!({"query": "2+2"})).await.unwrap();
        assert!(result.is_error);
        assert!(result.content.contains("WOLFRAM_ALPHA_APPID"));
    }

    #[tokio::test]
    async fn missing_query_parameter_errors() {
        let tool = WolframAlphaTool {
            app_id: Some("DEMO".to_string()),
            client: Client::new(),
        };
        assert!(tool.execute(json!({})).await.is_err());
    }
}
