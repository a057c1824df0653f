// ABOUTME: App orchestrator — wires together the LLM client, agent, session state, and TUI.
// ABOUTME: Also hosts the one-shot ask path that answers a single question without the TUI.

use std::collections::HashMap;
use std::io::Write as _;
use std::time::Instant;

use anyhow::Result;
use tokio::sync::{Mutex, mpsc};

use crate::agent::{
    self, AgentLoopParams, AgentSettings, ConversationMemory, MemoryMessage, MemoryRole,
};
use crate::config::Config;
use crate::llm::create_client;
use crate::prompt::PromptTemplate;
use crate::session::{SessionLogger, load_session};
use crate::tui;
use crate::tui::state::{AgentEvent, ChatMessage, ChatMessageKind, TuiState, UserEvent};

/// Top-level application that orchestrates all subsystems.
pub struct App {
    config: Config,
    fresh: bool,
}

impl App {
    /// Create a new app with the given configuration.
    pub fn new(config: Config, fresh: bool) -> Self {
        Self { config, fresh }
    }

    /// Run the application: restore the session, launch the agent loop, and drive the TUI.
    pub async fn run(self) -> Result<()> {
        let client = create_client(&self.config)?;

        // Load the previous session for transcript and settings (unless --fresh).
        let session_path = Config::session_path();
        let loaded_session = if self.fresh {
            None
        } else {
            load_session(&session_path).ok().flatten()
        };

        let default_settings = AgentSettings::from_config(&self.config)?;
        let mut settings = match &loaded_session {
            Some(session) => AgentSettings {
                strategy: session.strategy,
                tools: session.tool_names.clone(),
            },
            None => default_settings.clone(),
        };

        let mut agent = match agent::load_agent(&self.config, client.clone(), &settings) {
            Ok(agent) => agent,
            Err(e) => {
                if loaded_session.is_none() {
                    return Err(e);
                }
                // Saved settings can go stale (e.g. provider changed in config).
                eprintln!("Warning: saved session settings no longer load: {e:#}");
                settings = default_settings;
                agent::load_agent(&self.config, client.clone(), &settings)?
            }
        };

        if let Some(ref session) = loaded_session {
            agent.memory = ConversationMemory::from_messages(session.messages.clone());
        }

        let model = agent.model().to_string();

        // Create session logger for the turn-by-turn JSONL record.
        let session_logger = match SessionLogger::new() {
            Ok(logger) => Some(std::sync::Arc::new(Mutex::new(logger))),
            Err(e) => {
                eprintln!("Warning: failed to create session logger: {}", e);
                None
            }
        };

        // Create channels for agent <-> TUI communication.
        let (user_tx, user_rx) = mpsc::channel::<UserEvent>(16);
        let (agent_tx, mut agent_rx) = mpsc::channel::<AgentEvent>(64);

        // Spawn the agent loop in a background task.
        let agent_handle = tokio::spawn(agent::run_agent_loop(
            AgentLoopParams {
                agent,
                config: self.config,
                client,
                session_logger,
                session_path,
                existing_created_at: loaded_session.as_ref().map(|s| s.created_at.clone()),
                existing_total_tokens: loaded_session.as_ref().map(|s| s.total_tokens).unwrap_or(0),
            },
            user_rx,
            agent_tx,
        ));

        // Seed the TUI with the startup note and the restored transcript.
        let mut state = TuiState::new(model, &settings);
        let restored_turns = loaded_session.as_ref().map(|s| s.messages.len()).unwrap_or(0);
        state.total_tokens = loaded_session.as_ref().map(|s| s.total_tokens).unwrap_or(0);
        state.push_message(
            ChatMessageKind::System,
            build_startup_message(&settings, restored_turns),
        );
        if let Some(ref session) = loaded_session {
            state.messages.extend(replay_session_messages(&session.messages));
        }

        let session_start = Instant::now();

        // Run the TUI — blocks until quit.
        let result = tui::run(&mut state, &user_tx, &mut agent_rx).await;

        if result.is_ok() {
            print_exit_screen(&state, session_start);
        }

        // Signal the agent loop to quit and wait for it.
        let _ = user_tx.send(UserEvent::Quit).await;
        drop(user_tx);
        let _ = agent_handle.await;

        result
    }
}

/// Replay saved conversation turns into ChatMessage format for the TUI.
fn replay_session_messages(messages: &[MemoryMessage]) -> Vec<ChatMessage> {
    messages
        .iter()
        .map(|msg| ChatMessage {
            kind: match msg.role {
                MemoryRole::Human => ChatMessageKind::User,
                MemoryRole::Ai => ChatMessageKind::Assistant,
            },
            content: msg.content.clone(),
        })
        .collect()
}

/// Build the startup system message showing the active settings.
fn build_startup_message(settings: &AgentSettings, restored_turns: usize) -> String {
    let tools = if settings.tools.is_empty() {
        "none".to_string()
    } else {
        settings.tools.join(", ")
    };
    let mut parts = vec![
        format!("strategy: {}", settings.strategy),
        format!("tools: {}", tools),
    ];
    if restored_turns > 0 {
        parts.push(format!("restored {} messages", restored_turns));
    }
    parts.join(" | ")
}

/// Print a farewell screen after the TUI exits.
fn print_exit_screen(state: &TuiState, session_start: Instant) {
    let elapsed_secs = session_start.elapsed().as_secs();
    let elapsed = if elapsed_secs >= 3600 {
        format!("{}h {:02}m", elapsed_secs / 3600, (elapsed_secs % 3600) / 60)
    } else {
        format!("{}m {:02}s", elapsed_secs / 60, elapsed_secs % 60)
    };
    let msg_count = state.messages.len();

    println!();
    println!("  \u{1f33f} \x1b[1mThanks for researching with sage!\x1b[0m");
    println!();
    println!("  \u{1f550} Session lasted {elapsed} with {msg_count} messages exchanged.");
    println!("  \u{1f4da} Your conversation is saved; pick it up any time.");
    println!();
}

/// Answer a single question on the command line, streaming the reply to stdout.
/// Tool activity and plan progress go to stderr so the answer stays pipeable.
pub async fn run_ask(
    config: Config,
    input: String,
    template: Option<String>,
    vars: Vec<(String, String)>,
) -> Result<()> {
    let prompt = match template {
        Some(name) => {
            let template = PromptTemplate::load(&name)?;
            let mut values: HashMap<String, String> = vars.into_iter().collect();
            values.insert("input".to_string(), input);
            template.render(&values)?
        }
        None => input,
    };

    let client = create_client(&config)?;
    let settings = AgentSettings::from_config(&config)?;
    let mut agent = agent::load_agent(&config, client, &settings)?;

    let (agent_tx, mut agent_rx) = mpsc::channel::<AgentEvent>(64);
    let printer = tokio::spawn(async move {
        while let Some(event) = agent_rx.recv().await {
            match event {
                AgentEvent::TextDelta(text) => {
                    print!("{text}");
                    let _ = std::io::stdout().flush();
                }
                AgentEvent::ToolCallStarted {
                    tool_name,
                    input_summary,
                } => eprintln!("[{}] {}", tool_name, input_summary),
                AgentEvent::ToolResult {
                    tool_name,
                    content,
                    is_error: true,
                } => eprintln!("[{} failed] {}", tool_name, content),
                AgentEvent::PlanReady(steps) => {
                    for (i, step) in steps.iter().enumerate() {
                        eprintln!("[plan {}] {}", i + 1, step);
                    }
                }
                AgentEvent::StepStarted {
                    index,
                    total,
                    description,
                } => eprintln!("[step {}/{}] {}", index, total, description),
                _ => {}
            }
        }
    });

    let outcome = agent.run(&prompt, &agent_tx).await;
    drop(agent_tx);
    let _ = printer.await;

    outcome?;
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Strategy;

    #[test]
    fn startup_message_lists_settings() {
        let settings = AgentSettings {
            strategy: Strategy::ZeroShotReact,
            tools: vec!["wikipedia".to_string(), "arxiv".to_string()],
        };
        let msg = build_startup_message(&settings, 0);
        assert_eq!(msg, "strategy: zero-shot-react | tools: wikipedia, arxiv");
    }

    #[test]
    fn startup_message_mentions_restored_turns() {
        let settings = AgentSettings {
            strategy: Strategy::PlanAndSolve,
            tools: vec![],
        };
        let msg = build_startup_message(&settings, 4);
        assert_eq!(
            msg,
            "strategy: plan-and-solve | tools: none | restored 4 messages"
        );
    }

    #[test]
    fn replay_maps_roles_to_chat_kinds() {
        let messages = vec![
            MemoryMessage {
                role: MemoryRole::Human,
                content: "hi".to_string(),
            },
            MemoryMessage {
                role: MemoryRole::Ai,
                content: "hello".to_string(),
            },
        ];
        let replayed = replay_session_messages(&messages);
        assert_eq!(replayed.len(), 2);
        assert_eq!(replayed[0].kind, ChatMessageKind::User);
        assert_eq!(replayed[1].kind, ChatMessageKind::Assistant);
        assert_eq!(replayed[1].content, "hello");
    }
}
