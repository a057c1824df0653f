// ABOUTME: Iterative tool-use strategy — stream a model round, run requested tools, repeat.
// ABOUTME: Returns the model's text once a round completes without tool calls.

use std::collections::BTreeMap;

use anyhow::{Result, bail};
use futures::future::BoxFuture;
use tokio::sync::mpsc;

use crate::llm::{ChatMessage, ChatRequest, StreamEvent, ToolCallRequest, ToolSpec};
use crate::tui::state::AgentEvent;

use super::Agent;

/// A tool call being assembled from streaming fragments.
struct PendingToolCall {
    id: String,
    name: String,
    args_buf: String,
}

pub(super) fn run_boxed<'a>(
    agent: &'a mut Agent,
    input: &'a str,
    events: &'a mpsc::Sender<AgentEvent>,
) -> BoxFuture<'a, Result<String>> {
    Box::pin(run(agent, input, events))
}

async fn run(
    agent: &mut Agent,
    input: &str,
    events: &mpsc::Sender<AgentEvent>,
) -> Result<String> {
    let mut messages = Vec::with_capacity(agent.memory.len() + 2);
    messages.push(ChatMessage::system(&agent.chat_prompt));
    messages.extend(agent.memory.to_chat_messages());
    messages.push(ChatMessage::user(input));

    drive_to_answer(agent, messages, events, true).await
}

/// Runs rounds of model calls and tool executions until the model answers
/// without requesting tools. Also drives plan-step execution, with text
/// forwarding off so only the final synthesis streams to the transcript.
pub(super) async fn drive_to_answer(
    agent: &mut Agent,
    mut messages: Vec<ChatMessage>,
    events: &mpsc::Sender<AgentEvent>,
    forward_text: bool,
) -> Result<String> {
    for _ in 0..agent.max_iterations {
        let tools = agent.registry.specs();
        let (content, calls) = stream_turn(agent, &messages, tools, events, forward_text).await?;

        if calls.is_empty() {
            return Ok(content);
        }

        messages.push(ChatMessage::assistant_with_calls(&content, calls.clone()));

        for call in calls {
            let _ = events
                .send(AgentEvent::ToolCallStarted {
                    tool_name: call.name.clone(),
                    input_summary: summarize_args(&call.arguments),
                })
                .await;

            let result = agent.registry.execute(&call.name, call.arguments).await;

            let _ = events
                .send(AgentEvent::ToolResult {
                    tool_name: call.name.clone(),
                    content: result.content.clone(),
                    is_error: result.is_error,
                })
                .await;

            messages.push(tool_message(&call.id, &result.content, result.is_error));
        }
    }

    bail!(
        "No final answer after {} rounds of tool calls",
        agent.max_iterations
    )
}

/// Streams one model round, forwarding text deltas and assembling tool call
/// fragments by index. Returns the round's text and completed tool calls.
pub(super) async fn stream_turn(
    agent: &mut Agent,
    messages: &[ChatMessage],
    tools: Vec<ToolSpec>,
    events: &mpsc::Sender<AgentEvent>,
    forward_text: bool,
) -> Result<(String, Vec<ToolCallRequest>)> {
    let request = ChatRequest {
        messages: messages.to_vec(),
        tools,
    };

    let (tx, mut rx) = mpsc::channel(64);
    let llm = agent.llm.clone();
    let stream_task = tokio::spawn(async move { llm.chat_stream(request, tx).await });

    let mut content = String::new();
    let mut pending: BTreeMap<usize, PendingToolCall> = BTreeMap::new();

    while let Some(event) = rx.recv().await {
        match event {
            StreamEvent::TextDelta(text) => {
                content.push_str(&text);
                if forward_text {
                    let _ = events.send(AgentEvent::TextDelta(text)).await;
                }
            }
            StreamEvent::ToolCallDelta {
                index,
                id,
                name,
                arguments,
            } => {
                let slot = pending.entry(index).or_insert_with(|| PendingToolCall {
                    id: String::new(),
                    name: String::new(),
                    args_buf: String::new(),
                });
                if let Some(id) = id {
                    slot.id = id;
                }
                if let Some(name) = name {
                    slot.name.push_str(&name);
                }
                slot.args_buf.push_str(&arguments);
            }
            StreamEvent::Usage(usage) => {
                agent.note_usage(&usage);
                let _ = events
                    .send(AgentEvent::Usage {
                        input_tokens: usage.input_tokens,
                        output_tokens: usage.output_tokens,
                    })
                    .await;
            }
            StreamEvent::Done => break,
        }
    }

    stream_task.await??;

    let calls = pending
        .into_values()
        .filter(|p| !p.name.is_empty())
        .map(|p| ToolCallRequest {
            id: p.id,
            name: p.name,
            arguments: serde_json::from_str(&p.args_buf)
                .unwrap_or(serde_json::Value::Object(serde_json::Map::new())),
        })
        .collect();

    Ok((content, calls))
}

/// Tool output going back to the model; errors are labeled so it can recover.
fn tool_message(call_id: &str, content: &str, is_error: bool) -> ChatMessage {
    if is_error {
        ChatMessage::tool_result(call_id, format!("Error: {content}"))
    } else {
        ChatMessage::tool_result(call_id, content)
    }
}

/// Summarize tool arguments for display, truncating to 80 characters.
pub(super) fn summarize_args(args: &serde_json::Value) -> String {
    let s = args.to_string();
    let truncated: String = s.chars().take(80).collect();
    if truncated.len() < s.len() {
        format!("{}...", truncated)
    } else {
        s
    }
}
