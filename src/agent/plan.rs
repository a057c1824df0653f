// ABOUTME: Plan-and-solve strategy — plan steps as strict JSON, execute each, synthesize.
// ABOUTME: Steps run tool rounds without streaming text; only the synthesis streams.

use anyhow::{Context, Result, bail};
use futures::future::BoxFuture;
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::llm::{ChatMessage, ChatRequest, TokenUsage};
use crate::tui::state::AgentEvent;

use super::{Agent, react};

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
    let steps = plan_steps(agent, input, events).await?;
    let _ = events.send(AgentEvent::PlanReady(steps.clone())).await;

    let total = steps.len();
    let mut notes: Vec<String> = Vec::with_capacity(total);

    for (i, step) in steps.iter().enumerate() {
        let _ = events
            .send(AgentEvent::StepStarted {
                index: i + 1,
                total,
                description: step.clone(),
            })
            .await;

        let messages = vec![
            ChatMessage::system(&agent.chat_prompt),
            ChatMessage::user(step_brief(input, &notes, step)),
        ];
        let found = react::drive_to_answer(agent, messages, events, false).await?;
        notes.push(format!("{step}: {found}"));
    }

    synthesize(agent, input, &notes, events).await
}

/// Asks the model for a plan and parses it. The planner call is a plain
/// request/response round trip; nothing useful streams out of it.
async fn plan_steps(
    agent: &mut Agent,
    input: &str,
    events: &mpsc::Sender<AgentEvent>,
) -> Result<Vec<String>> {
    let mut messages = Vec::with_capacity(agent.memory.len() + 2);
    messages.push(ChatMessage::system(&agent.planner_prompt));
    messages.extend(agent.memory.to_chat_messages());
    messages.push(ChatMessage::user(format!("Objective: {input}")));

    let response = agent
        .llm
        .chat(ChatRequest {
            messages,
            tools: Vec::new(),
        })
        .await?;

    if response.usage != TokenUsage::default() {
        agent.note_usage(&response.usage);
        let _ = events
            .send(AgentEvent::Usage {
                input_tokens: response.usage.input_tokens,
                output_tokens: response.usage.output_tokens,
            })
            .await;
    }

    parse_plan_json(&response.content)
}

#[derive(Deserialize)]
struct PlanBody {
    steps: Vec<String>,
}

/// Extracts the `{"steps": [...]}` object from planner output. Models wrap
/// JSON in prose or fences often enough that we slice from the first '{' to
/// the last '}' before parsing.
pub(super) fn parse_plan_json(text: &str) -> Result<Vec<String>> {
    let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
        bail!("Planner returned no JSON object: {}", preview(text));
    };
    if end < start {
        bail!("Planner returned no JSON object: {}", preview(text));
    }

    let body: PlanBody = serde_json::from_str(&text[start..=end])
        .with_context(|| format!("Planner returned invalid JSON: {}", preview(text)))?;

    let steps: Vec<String> = body
        .steps
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if steps.is_empty() {
        bail!("Planner returned an empty plan");
    }
    Ok(steps)
}

fn preview(text: &str) -> String {
    let p: String = text.chars().take(120).collect();
    if p.len() < text.len() {
        format!("{p}...")
    } else {
        p
    }
}

/// The working brief for one step: the objective, findings so far, and the
/// current instruction.
fn step_brief(objective: &str, notes: &[String], step: &str) -> String {
    let mut brief = format!("Objective: {objective}\n");
    if !notes.is_empty() {
        brief.push_str("\nFindings so far:\n");
        for (i, note) in notes.iter().enumerate() {
            brief.push_str(&format!("{}. {}\n", i + 1, note));
        }
    }
    brief.push_str(&format!(
        "\nCurrent step: {step}\nCarry out this step and report what you find."
    ));
    brief
}

/// Streams the final answer assembled from the step findings. No tools are
/// offered here; the research is already done.
async fn synthesize(
    agent: &mut Agent,
    objective: &str,
    notes: &[String],
    events: &mpsc::Sender<AgentEvent>,
) -> Result<String> {
    let mut request = format!("Objective: {objective}\n\nFindings from each step:\n");
    for (i, note) in notes.iter().enumerate() {
        request.push_str(&format!("{}. {}\n", i + 1, note));
    }
    request.push_str("\nGive the final answer to the objective based on these findings.");

    let messages = vec![
        ChatMessage::system(&agent.chat_prompt),
        ChatMessage::user(request),
    ];
    let (answer, _) = react::stream_turn(agent, &messages, Vec::new(), events, true).await?;
    Ok(answer)
}
