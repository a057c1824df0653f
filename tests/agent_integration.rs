// ABOUTME: End-to-end agent tests with a scripted LLM client — strategies, tools, session loop.
// ABOUTME: Drives the same event channels the TUI uses, with no network and no real model.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Result, bail};
use async_trait::async_trait;
use tokio::sync::mpsc;

use sage::agent::{
    AgentLoopParams, AgentSettings, MemoryRole, Strategy, load_agent, run_agent_loop,
};
use sage::config::Config;
use sage::llm::{ChatRequest, ChatResponse, LlmClient, StreamEvent, TokenUsage};
use sage::session::load_session;
use sage::tui::state::{AgentEvent, UserEvent};

/// Plays back queued responses: one script per `chat_stream` call, one
/// response per `chat` call. Runs that ask for more than was scripted fail,
/// so a test cannot silently loop.
struct ScriptedClient {
    chats: Mutex<VecDeque<ChatResponse>>,
    streams: Mutex<VecDeque<Vec<StreamEvent>>>,
}

impl ScriptedClient {
    fn new(chats: Vec<ChatResponse>, streams: Vec<Vec<StreamEvent>>) -> Self {
        Self {
            chats: Mutex::new(chats.into()),
            streams: Mutex::new(streams.into()),
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse> {
        let next = self.chats.lock().unwrap().pop_front();
        match next {
            Some(response) => Ok(response),
            None => bail!("no scripted chat response left"),
        }
    }

    async fn chat_stream(
        &self,
        _request: ChatRequest,
        events: mpsc::Sender<StreamEvent>,
    ) -> Result<()> {
        let next = self.streams.lock().unwrap().pop_front();
        let Some(script) = next else {
            bail!("no scripted stream left");
        };
        for event in script {
            let _ = events.send(event).await;
        }
        Ok(())
    }
}

fn settings(strategy: Strategy, tools: &[&str]) -> AgentSettings {
    AgentSettings {
        strategy,
        tools: tools.iter().map(|s| s.to_string()).collect(),
    }
}

fn chat_text(content: &str) -> ChatResponse {
    ChatResponse {
        content: content.to_string(),
        ..ChatResponse::default()
    }
}

fn text_script(parts: &[&str]) -> Vec<StreamEvent> {
    let mut script: Vec<StreamEvent> = parts
        .iter()
        .map(|p| StreamEvent::TextDelta(p.to_string()))
        .collect();
    script.push(StreamEvent::Done);
    script
}

fn drain(rx: &mut mpsc::Receiver<AgentEvent>) -> Vec<AgentEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn streamed_text(events: &[AgentEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            AgentEvent::TextDelta(t) => Some(t.as_str()),
            _ => None,
        })
        .collect()
}

/// Receive loop events until the turn's Done marker arrives.
async fn collect_until_done(rx: &mut mpsc::Receiver<AgentEvent>) -> Vec<AgentEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        let done = event == AgentEvent::Done;
        events.push(event);
        if done {
            break;
        }
    }
    events
}

fn loop_params(
    config: Config,
    client: Arc<ScriptedClient>,
    tools: &[&str],
    session_path: PathBuf,
) -> AgentLoopParams {
    let agent = load_agent(
        &config,
        client.clone(),
        &settings(Strategy::ZeroShotReact, tools),
    )
    .unwrap();
    AgentLoopParams {
        agent,
        config,
        client,
        session_logger: None,
        session_path,
        existing_created_at: None,
        existing_total_tokens: 0,
    }
}

/// A zero-shot-react turn where the model requests llm-math: the tool call is
/// assembled from streamed fragments, the math tool translates the question
/// through a second scripted model call and evaluates it locally, and the
/// model folds the result into a streamed answer.
#[tokio::test]
async fn react_turn_runs_llm_math_and_streams_the_answer() {
    let client = Arc::new(ScriptedClient::new(
        // The math tool's expression translation call.
        vec![chat_text("2 + 2")],
        vec![
            vec![
                StreamEvent::ToolCallDelta {
                    index: 0,
                    id: Some("call_1".to_string()),
                    name: Some("llm-math".to_string()),
                    arguments: "{\"question\":".to_string(),
                },
                StreamEvent::ToolCallDelta {
                    index: 0,
                    id: None,
                    name: None,
                    arguments: " \"what is 2 + 2?\"}".to_string(),
                },
                StreamEvent::Done,
            ],
            text_script(&["Two plus two ", "is 4."]),
        ],
    ));

    let config = Config::default();
    let mut agent = load_agent(
        &config,
        client,
        &settings(Strategy::ZeroShotReact, &["llm-math"]),
    )
    .unwrap();

    let (tx, mut rx) = mpsc::channel(64);
    let answer = agent.run("what is 2 + 2?", &tx).await.unwrap();
    assert_eq!(answer, "Two plus two is 4.");

    let events = drain(&mut rx);
    let call = events.iter().find_map(|e| match e {
        AgentEvent::ToolCallStarted {
            tool_name,
            input_summary,
        } => Some((tool_name.clone(), input_summary.clone())),
        _ => None,
    });
    let (tool_name, input_summary) = call.expect("no ToolCallStarted event");
    assert_eq!(tool_name, "llm-math");
    assert!(input_summary.contains("2 + 2"), "got: {input_summary}");

    let result = events.iter().find_map(|e| match e {
        AgentEvent::ToolResult {
            content, is_error, ..
        } => Some((content.clone(), *is_error)),
        _ => None,
    });
    let (content, is_error) = result.expect("no ToolResult event");
    assert_eq!(content, "Answer: 4");
    assert!(!is_error);

    assert_eq!(streamed_text(&events), "Two plus two is 4.");

    let memory = agent.memory.messages();
    assert_eq!(memory.len(), 2);
    assert_eq!(memory[0].role, MemoryRole::Human);
    assert_eq!(memory[1].role, MemoryRole::Ai);
    assert_eq!(memory[1].content, "Two plus two is 4.");
}

/// A plan-and-solve turn: the planner call returns JSON steps, each step runs
/// without streaming text, and only the synthesis streams into the transcript.
#[tokio::test]
async fn plan_and_solve_plans_executes_steps_and_synthesizes() {
    let client = Arc::new(ScriptedClient::new(
        vec![chat_text(
            r#"{"steps": ["find the population of France", "find the area of France"]}"#,
        )],
        vec![
            text_script(&["Population is 68 million."]),
            text_script(&["Area is 643,801 km2."]),
            text_script(&["France has ", "about 106 people per km2."]),
        ],
    ));

    let config = Config::default();
    let mut agent = load_agent(&config, client, &settings(Strategy::PlanAndSolve, &[])).unwrap();

    let (tx, mut rx) = mpsc::channel(64);
    let answer = agent
        .run("how dense is France's population?", &tx)
        .await
        .unwrap();
    assert_eq!(answer, "France has about 106 people per km2.");

    let events = drain(&mut rx);
    let plan = events.iter().find_map(|e| match e {
        AgentEvent::PlanReady(steps) => Some(steps.clone()),
        _ => None,
    });
    assert_eq!(
        plan.expect("no PlanReady event"),
        vec!["find the population of France", "find the area of France"]
    );

    let starts: Vec<(usize, usize, String)> = events
        .iter()
        .filter_map(|e| match e {
            AgentEvent::StepStarted {
                index,
                total,
                description,
            } => Some((*index, *total, description.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(starts.len(), 2);
    assert_eq!(starts[0], (1, 2, "find the population of France".to_string()));
    assert_eq!(starts[1], (2, 2, "find the area of France".to_string()));

    // Step output stays out of the stream; only the synthesis is forwarded.
    assert_eq!(streamed_text(&events), "France has about 106 people per km2.");

    assert_eq!(agent.memory.len(), 2);
}

/// With no tools selected the agent answers straight from the model, and
/// usage reported on the stream lands in the session token total.
#[tokio::test]
async fn react_with_no_tools_answers_directly_and_counts_usage() {
    let client = Arc::new(ScriptedClient::new(
        vec![],
        vec![vec![
            StreamEvent::TextDelta("Paris.".to_string()),
            StreamEvent::Usage(TokenUsage {
                input_tokens: 20,
                output_tokens: 10,
            }),
            StreamEvent::Done,
        ]],
    ));

    let config = Config::default();
    let mut agent = load_agent(&config, client, &settings(Strategy::ZeroShotReact, &[])).unwrap();

    let (tx, mut rx) = mpsc::channel(64);
    let answer = agent.run("capital of France?", &tx).await.unwrap();
    assert_eq!(answer, "Paris.");
    assert_eq!(agent.total_tokens(), 30);

    let events = drain(&mut rx);
    assert!(
        events.contains(&AgentEvent::Usage {
            input_tokens: 20,
            output_tokens: 10
        }),
        "usage not forwarded: {events:?}"
    );
}

/// The session loop persists a completed turn: two memory messages, the
/// restored creation timestamp, and the token total carried over from the
/// saved session plus this turn's usage.
#[tokio::test]
async fn session_loop_persists_turns_and_token_totals() {
    let tmp = tempfile::tempdir().unwrap();
    let session_path = tmp.path().join("session.json");

    let client = Arc::new(ScriptedClient::new(
        vec![],
        vec![vec![
            StreamEvent::TextDelta("I looked it up.".to_string()),
            StreamEvent::Usage(TokenUsage {
                input_tokens: 20,
                output_tokens: 10,
            }),
            StreamEvent::Done,
        ]],
    ));

    let mut params = loop_params(Config::default(), client, &[], session_path.clone());
    params.existing_created_at = Some("2026-01-01T00:00:00+00:00".to_string());
    params.existing_total_tokens = 500;

    let (user_tx, user_rx) = mpsc::channel(16);
    let (agent_tx, mut agent_rx) = mpsc::channel(64);
    let handle = tokio::spawn(run_agent_loop(params, user_rx, agent_tx));

    user_tx
        .send(UserEvent::Message("look this up".to_string()))
        .await
        .unwrap();
    let events = collect_until_done(&mut agent_rx).await;
    assert_eq!(streamed_text(&events), "I looked it up.");

    user_tx.send(UserEvent::Quit).await.unwrap();
    handle.await.unwrap();

    let state = load_session(&session_path).unwrap().unwrap();
    assert_eq!(state.strategy, Strategy::ZeroShotReact);
    assert_eq!(state.created_at, "2026-01-01T00:00:00+00:00");
    assert_eq!(state.messages.len(), 2);
    assert_eq!(state.messages[0].content, "look this up");
    assert_eq!(state.messages[1].content, "I looked it up.");
    assert_eq!(state.total_tokens, 530);
}

/// Reconfiguring mid-session rebuilds the agent but keeps the conversation:
/// the saved session carries the new strategy alongside the old messages.
#[tokio::test]
async fn session_loop_reconfigure_keeps_memory() {
    let tmp = tempfile::tempdir().unwrap();
    let session_path = tmp.path().join("session.json");

    let client = Arc::new(ScriptedClient::new(
        vec![],
        vec![text_script(&["Noted."])],
    ));
    let params = loop_params(Config::default(), client, &[], session_path.clone());

    let (user_tx, user_rx) = mpsc::channel(16);
    let (agent_tx, mut agent_rx) = mpsc::channel(64);
    let handle = tokio::spawn(run_agent_loop(params, user_rx, agent_tx));

    user_tx
        .send(UserEvent::Message("remember this".to_string()))
        .await
        .unwrap();
    collect_until_done(&mut agent_rx).await;

    user_tx
        .send(UserEvent::Configure(settings(
            Strategy::PlanAndSolve,
            &["wikipedia"],
        )))
        .await
        .unwrap();
    user_tx.send(UserEvent::Quit).await.unwrap();
    handle.await.unwrap();

    let state = load_session(&session_path).unwrap().unwrap();
    assert_eq!(state.strategy, Strategy::PlanAndSolve);
    assert_eq!(state.tool_names, vec!["wikipedia"]);
    assert_eq!(state.messages.len(), 2, "reconfigure must keep memory");
}

/// Clearing history empties the saved conversation but leaves the session
/// file and its settings in place.
#[tokio::test]
async fn session_loop_clear_history_empties_saved_messages() {
    let tmp = tempfile::tempdir().unwrap();
    let session_path = tmp.path().join("session.json");

    let client = Arc::new(ScriptedClient::new(
        vec![],
        vec![text_script(&["Sure."])],
    ));
    let params = loop_params(Config::default(), client, &[], session_path.clone());

    let (user_tx, user_rx) = mpsc::channel(16);
    let (agent_tx, mut agent_rx) = mpsc::channel(64);
    let handle = tokio::spawn(run_agent_loop(params, user_rx, agent_tx));

    user_tx
        .send(UserEvent::Message("hello".to_string()))
        .await
        .unwrap();
    collect_until_done(&mut agent_rx).await;

    user_tx.send(UserEvent::ClearHistory).await.unwrap();
    user_tx.send(UserEvent::Quit).await.unwrap();
    handle.await.unwrap();

    let state = load_session(&session_path).unwrap().unwrap();
    assert!(state.messages.is_empty());
    assert_eq!(state.strategy, Strategy::ZeroShotReact);
}

/// A failed turn surfaces as an Error event followed by Done, and nothing is
/// added to the saved conversation.
#[tokio::test]
async fn session_loop_reports_failed_turns_and_keeps_memory_clean() {
    let tmp = tempfile::tempdir().unwrap();
    let session_path = tmp.path().join("session.json");

    // Nothing scripted: the first model call fails.
    let client = Arc::new(ScriptedClient::new(vec![], vec![]));
    let params = loop_params(Config::default(), client, &[], session_path.clone());

    let (user_tx, user_rx) = mpsc::channel(16);
    let (agent_tx, mut agent_rx) = mpsc::channel(64);
    let handle = tokio::spawn(run_agent_loop(params, user_rx, agent_tx));

    user_tx
        .send(UserEvent::Message("hello".to_string()))
        .await
        .unwrap();
    let events = collect_until_done(&mut agent_rx).await;
    let error = events.iter().find_map(|e| match e {
        AgentEvent::Error(message) => Some(message.clone()),
        _ => None,
    });
    assert!(
        error.expect("no Error event").contains("no scripted stream"),
        "error should carry the cause"
    );
    assert_eq!(events.last(), Some(&AgentEvent::Done));

    user_tx.send(UserEvent::Quit).await.unwrap();
    handle.await.unwrap();

    let state = load_session(&session_path).unwrap().unwrap();
    assert!(state.messages.is_empty(), "failed turn must not be saved");
}

/// A reconfigure that cannot be built reports an error and keeps the old
/// agent running; the next message still gets answered.
#[tokio::test]
async fn session_loop_rejects_bad_reconfigure_and_keeps_old_agent() {
    let tmp = tempfile::tempdir().unwrap();
    let session_path = tmp.path().join("session.json");

    let client = Arc::new(ScriptedClient::new(
        vec![],
        vec![text_script(&["Still here."])],
    ));
    let params = loop_params(Config::default(), client, &[], session_path.clone());

    let (user_tx, user_rx) = mpsc::channel(16);
    let (agent_tx, mut agent_rx) = mpsc::channel(64);
    let handle = tokio::spawn(run_agent_loop(params, user_rx, agent_tx));

    user_tx
        .send(UserEvent::Configure(settings(
            Strategy::ZeroShotReact,
            &["sharepoint"],
        )))
        .await
        .unwrap();
    user_tx
        .send(UserEvent::Message("are you alive?".to_string()))
        .await
        .unwrap();

    let events = collect_until_done(&mut agent_rx).await;
    let error = events.iter().find_map(|e| match e {
        AgentEvent::Error(message) => Some(message.clone()),
        _ => None,
    });
    assert!(
        error.expect("no Error event").contains("sharepoint"),
        "error should name the unknown tool"
    );
    assert_eq!(streamed_text(&events), "Still here.");

    user_tx.send(UserEvent::Quit).await.unwrap();
    handle.await.unwrap();

    let state = load_session(&session_path).unwrap().unwrap();
    assert_eq!(state.strategy, Strategy::ZeroShotReact);
    assert!(state.tool_names.is_empty(), "failed reconfigure must not stick");
}
