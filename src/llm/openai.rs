// ABOUTME: OpenAI-compatible chat completions client over reqwest.
// ABOUTME: Non-streaming and SSE streaming paths, including tool-call parsing.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::config::Config;

use super::sse::drain_complete_frames;
use super::{
    ChatMessage, ChatRequest, ChatResponse, LlmClient, StreamEvent, TokenUsage, ToolCallRequest,
    ToolSpec,
};

const CONNECT_TIMEOUT_SECS: u64 = 30;
const REQUEST_TIMEOUT_SECS: u64 = 120;
/// Max silence between stream chunks before the turn is abandoned.
const STREAM_IDLE_TIMEOUT_SECS: u64 = 120;

pub struct OpenAiClient {
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
    temperature: f32,
    client: Client,
}

impl OpenAiClient {
    /// Missing credentials are tolerated here; the API call fails later with
    /// the provider's own auth error.
    pub fn new(config: &Config) -> Self {
        Self {
            api_key: config.credential("OPENAI_API_KEY").unwrap_or_default(),
            model: config.llm.model.clone(),
            base_url: config.llm.base_url.trim_end_matches('/').to_string(),
            max_tokens: config.llm.max_tokens,
            temperature: config.llm.temperature,
            client: Client::builder()
                .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_payload(&self, request: &ChatRequest, stream: bool) -> Value {
        let messages: Vec<Value> = request.messages.iter().map(message_to_wire).collect();

        let mut payload = json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        });

        if !request.tools.is_empty() {
            payload["tools"] = json!(
                request
                    .tools
                    .iter()
                    .map(tool_to_wire)
                    .collect::<Vec<_>>()
            );
        }

        if stream {
            payload["stream"] = json!(true);
            payload["stream_options"] = json!({ "include_usage": true });
        }

        payload
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let payload = self.build_payload(&request, false);

        let resp = self
            .client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .json(&payload)
            .send()
            .await
            .context("Failed to send request to chat completions API")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Chat completions API error {status}: {body}");
        }

        let json: Value = resp
            .json()
            .await
            .context("Failed to decode chat completions response")?;
        parse_response(&json)
    }

    async fn chat_stream(
        &self,
        request: ChatRequest,
        events: mpsc::Sender<StreamEvent>,
    ) -> Result<()> {
        let payload = self.build_payload(&request, true);

        let resp = self
            .client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .context("Failed to send streaming request to chat completions API")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Chat completions API error {status}: {body}");
        }

        let mut stream = resp.bytes_stream();
        let mut buffer = String::new();
        let idle = Duration::from_secs(STREAM_IDLE_TIMEOUT_SECS);

        loop {
            let chunk = match tokio::time::timeout(idle, stream.next()).await {
                Ok(Some(Ok(bytes))) => bytes,
                Ok(Some(Err(e))) => return Err(e).context("Stream read failed"),
                Ok(None) => break,
                Err(_) => anyhow::bail!("Stream idle for {}s, giving up", idle.as_secs()),
            };

            buffer.push_str(&String::from_utf8_lossy(&chunk));
            for sse in drain_complete_frames(&mut buffer) {
                let Some(data) = sse.data else {
                    // [DONE] sentinel.
                    let _ = events.send(StreamEvent::Done).await;
                    return Ok(());
                };
                for event in chunk_to_events(&data)? {
                    let _ = events.send(event).await;
                }
            }
        }

        let _ = events.send(StreamEvent::Done).await;
        Ok(())
    }
}

fn message_to_wire(msg: &ChatMessage) -> Value {
    let mut wire = json!({
        "role": msg.role.as_str(),
        "content": msg.content,
    });

    if !msg.tool_calls.is_empty() {
        wire["tool_calls"] = json!(
            msg.tool_calls
                .iter()
                .map(|tc| json!({
                    "id": tc.id,
                    "type": "function",
                    "function": {
                        "name": tc.name,
                        "arguments": tc.arguments.to_string(),
                    }
                }))
                .collect::<Vec<_>>()
        );
    }

    if let Some(tool_call_id) = &msg.tool_call_id {
        wire["tool_call_id"] = json!(tool_call_id);
    }

    wire
}

fn tool_to_wire(tool: &ToolSpec) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        }
    })
}

/// Parse a complete chat completions response body.
fn parse_response(json: &Value) -> Result<ChatResponse> {
    let choice = json["choices"]
        .as_array()
        .and_then(|arr| arr.first())
        .context("No choices in chat completions response")?;

    let message = &choice["message"];
    let content = message["content"].as_str().unwrap_or("").to_string();

    let mut tool_calls = Vec::new();
    if let Some(array) = message["tool_calls"].as_array() {
        for tc in array {
            if let Some(function) = tc["function"].as_object() {
                let arguments = function["arguments"]
                    .as_str()
                    .and_then(|s| serde_json::from_str(s).ok())
                    .unwrap_or_else(|| json!({}));

                tool_calls.push(ToolCallRequest {
                    id: tc["id"].as_str().unwrap_or("").to_string(),
                    name: function["name"].as_str().unwrap_or("").to_string(),
                    arguments,
                });
            }
        }
    }

    Ok(ChatResponse {
        content,
        tool_calls,
        usage: parse_usage(json.get("usage")),
    })
}

fn parse_usage(usage: Option<&Value>) -> TokenUsage {
    let Some(usage) = usage else {
        return TokenUsage::default();
    };
    TokenUsage {
        input_tokens: usage["prompt_tokens"].as_u64().unwrap_or(0),
        output_tokens: usage["completion_tokens"].as_u64().unwrap_or(0),
    }
}

/// Translate one streamed chunk into events. Error chunks abort the stream.
fn chunk_to_events(data: &Value) -> Result<Vec<StreamEvent>> {
    if let Some(error) = data.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unspecified streaming error");
        anyhow::bail!("Chat completions API error: {message}");
    }

    let mut out = Vec::new();

    if data.get("usage").is_some_and(|u| !u.is_null()) {
        out.push(StreamEvent::Usage(parse_usage(data.get("usage"))));
    }

    let Some(choice) = data["choices"].as_array().and_then(|arr| arr.first()) else {
        return Ok(out);
    };
    let delta = &choice["delta"];

    if let Some(text) = delta["content"].as_str()
        && !text.is_empty()
    {
        out.push(StreamEvent::TextDelta(text.to_string()));
    }

    if let Some(calls) = delta["tool_calls"].as_array() {
        for tc in calls {
            out.push(StreamEvent::ToolCallDelta {
                index: tc["index"].as_u64().unwrap_or(0) as usize,
                id: tc["id"].as_str().map(str::to_string),
                name: tc["function"]["name"].as_str().map(str::to_string),
                arguments: tc["function"]["arguments"].as_str().unwrap_or("").to_string(),
            });
        }
    }

    Ok(out)
}
