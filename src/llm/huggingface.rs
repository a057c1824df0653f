// ABOUTME: Hugging Face Inference API client for hosted text-generation models.
// ABOUTME: Plain generation only; chat turns are flattened into a single prompt.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::config::Config;

use super::{ChatMessage, ChatRequest, ChatResponse, LlmClient, Role, StreamEvent, TokenUsage};

const API_BASE: &str = "https://api-inference.huggingface.co/models";
const REQUEST_TIMEOUT_SECS: u64 = 120;

pub struct HuggingFaceClient {
    api_token: String,
    repo_id: String,
    max_new_tokens: u32,
    temperature: f32,
    client: Client,
}

impl HuggingFaceClient {
    pub fn new(config: &Config) -> Self {
        Self {
            api_token: config.credential("HUGGINGFACEHUB_API_TOKEN").unwrap_or_default(),
            repo_id: config.llm.huggingface.repo_id.clone(),
            max_new_tokens: config.llm.huggingface.max_new_tokens,
            temperature: config.llm.huggingface.temperature,
            client: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/{}", API_BASE, self.repo_id)
    }
}

#[async_trait]
impl LlmClient for HuggingFaceClient {
    fn model(&self) -> &str {
        &self.repo_id
    }

    fn supports_tools(&self) -> bool {
        false
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let prompt = flatten_messages(&request.messages);
        let payload = json!({
            "inputs": prompt,
            "parameters": {
                "max_new_tokens": self.max_new_tokens,
                "temperature": self.temperature,
                "return_full_text": false,
            }
        });

        let resp = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_token))
            .json(&payload)
            .send()
            .await
            .context("Failed to send request to Hugging Face Inference API")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Hugging Face Inference API error {status}: {body}");
        }

        let body: Value = resp
            .json()
            .await
            .context("Failed to decode Hugging Face response")?;
        let content = parse_generated_text(&body)?;

        Ok(ChatResponse {
            content,
            tool_calls: Vec::new(),
            usage: TokenUsage::default(),
        })
    }

    async fn chat_stream(
        &self,
        request: ChatRequest,
        events: mpsc::Sender<StreamEvent>,
    ) -> Result<()> {
        // The inference API has no SSE surface worth depending on; emit the
        // whole completion as a single delta.
        let response = self.chat(request).await?;
        let _ = events.send(StreamEvent::TextDelta(response.content)).await;
        let _ = events.send(StreamEvent::Done).await;
        Ok(())
    }
}

/// Collapse chat turns into one labelled prompt ending with an assistant cue.
fn flatten_messages(messages: &[ChatMessage]) -> String {
    let mut prompt = String::new();
    for msg in messages {
        match msg.role {
            Role::System => {
                prompt.push_str(&msg.content);
                prompt.push_str("\n\n");
            }
            Role::User => {
                prompt.push_str("User: ");
                prompt.push_str(&msg.content);
                prompt.push('\n');
            }
            Role::Assistant => {
                prompt.push_str("Assistant: ");
                prompt.push_str(&msg.content);
                prompt.push('\n');
            }
            // Tool exchanges never reach this provider.
            Role::Tool => {}
        }
    }
    prompt.push_str("Assistant:");
    prompt
}

fn parse_generated_text(body: &Value) -> Result<String> {
    if let Some(error) = body.get("error").and_then(Value::as_str) {
        anyhow::bail!("Hugging Face Inference API error: {error}");
    }
    body.as_array()
        .and_then(|arr| arr.first())
        .and_then(|first| first["generated_text"].as_str())
        .map(|text| text.trim().to_string())
        .context("No generated_text in Hugging Face response")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_labels_roles_and_adds_cue() {
        let prompt = flatten_messages(&[
            ChatMessage::system("Be brief."),
            ChatMessage::user("Who won in 1994?"),
            ChatMessage::assistant("Brazil."),
            ChatMessage::user("And 1998?"),
        ]);
        assert!(prompt.starts_with("Be brief.\n\n"));
        assert!(prompt.contains("User: Who won in 1994?\n"));
        assert!(prompt.contains("Assistant: Brazil.\n"));
        assert!(prompt.ends_with("Assistant:"));
    }

    #[test]
    fn parse_generated_text_happy_path() {
        let body = json!([{"generated_text": "  Brazil won. "}]);
        assert_eq!(parse_generated_text(&body).unwrap(), "Brazil won.");
    }

    #[test]
    fn parse_generated_text_error_field() {
        let body = json!({"error": "Model is loading"});
        let err = parse_generated_text(&body).unwrap_err();
        assert!(err.to_string().contains("Model is loading"));
    }

    #[test]
    fn parse_generated_text_empty_response() {
        let body = json!([]);
        assert!(parse_generated_text(&body).is_err());
    }

    #[test]
    fn default_repo_id_from_config() {
        let client = HuggingFaceClient::new(&Config::default());
        assert_eq!(client.model(), "mistralai/Mistral-7B-Instruct-v0.2");
        assert!(!client.supports_tools());
    }
}
