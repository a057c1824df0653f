// ABOUTME: Chat session loop — routes UI events to the agent and persists each turn.
// ABOUTME: Rebuilds the agent on reconfigure while keeping conversation memory.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};

use crate::config::Config;
use crate::llm::LlmClient;
use crate::session::SessionLogger;
use crate::session::persistence::{SessionState, save_session};
use crate::tui::state::{AgentEvent, UserEvent};

use super::{Agent, load_agent};

/// Bundled parameters for the session loop.
pub struct AgentLoopParams {
    pub agent: Agent,
    pub config: Config,
    pub client: Arc<dyn LlmClient>,
    pub session_logger: Option<Arc<Mutex<SessionLogger>>>,
    pub session_path: PathBuf,
    pub existing_created_at: Option<String>,
    pub existing_total_tokens: u64,
}

/// Log a turn record via the session logger, if one is configured.
async fn maybe_log(logger: &Option<Arc<Mutex<SessionLogger>>>, role: &str, content: &str) {
    if let Some(logger) = logger {
        let mut guard = logger.lock().await;
        if let Err(e) = guard.log_turn(role, content) {
            eprintln!("Warning: failed to log session event: {}", e);
        }
    }
}

/// Run the session loop until the user quits or the channel closes.
///
/// Each user message becomes one agent turn; intermediate events stream to
/// the UI while the turn runs. Reconfiguration rebuilds the agent but keeps
/// conversation memory, and session state is rewritten after every change.
pub async fn run_agent_loop(
    mut params: AgentLoopParams,
    mut user_rx: mpsc::Receiver<UserEvent>,
    agent_tx: mpsc::Sender<AgentEvent>,
) {
    let created_at = params
        .existing_created_at
        .take()
        .unwrap_or_else(|| chrono::Utc::now().to_rfc3339());

    // A restored session keeps counting from the saved token total.
    params.agent.total_tokens += params.existing_total_tokens;

    loop {
        let event = match user_rx.recv().await {
            Some(e) => e,
            None => break, // Channel closed.
        };

        match event {
            UserEvent::Quit => break,

            UserEvent::Message(text) => {
                maybe_log(&params.session_logger, "human", &text).await;

                match params.agent.run(&text, &agent_tx).await {
                    Ok(output) => {
                        maybe_log(&params.session_logger, "ai", &output).await;
                    }
                    Err(e) => {
                        let message = format!("{e:#}");
                        maybe_log(&params.session_logger, "error", &message).await;
                        let _ = agent_tx.send(AgentEvent::Error(message)).await;
                    }
                }

                let _ = agent_tx.send(AgentEvent::Done).await;
                persist(&params, &created_at);
            }

            UserEvent::Configure(settings) => {
                match load_agent(&params.config, params.client.clone(), &settings) {
                    Ok(mut rebuilt) => {
                        rebuilt.memory = std::mem::take(&mut params.agent.memory);
                        rebuilt.total_tokens = params.agent.total_tokens;
                        params.agent = rebuilt;
                        maybe_log(
                            &params.session_logger,
                            "system",
                            &format!(
                                "reconfigured: strategy={} tools=[{}]",
                                settings.strategy,
                                settings.tools.join(", ")
                            ),
                        )
                        .await;
                        persist(&params, &created_at);
                    }
                    Err(e) => {
                        let _ = agent_tx.send(AgentEvent::Error(format!("{e:#}"))).await;
                    }
                }
            }

            UserEvent::ClearHistory => {
                params.agent.memory.clear();
                maybe_log(&params.session_logger, "system", "history cleared").await;
                persist(&params, &created_at);
            }
        }
    }
}

/// Save current session state after each complete interaction.
fn persist(params: &AgentLoopParams, created_at: &str) {
    let state = SessionState {
        strategy: params.agent.strategy,
        tool_names: params.agent.tool_names(),
        created_at: created_at.to_string(),
        updated_at: chrono::Utc::now().to_rfc3339(),
        messages: params.agent.memory.messages().to_vec(),
        total_tokens: params.agent.total_tokens(),
    };
    save_session(&params.session_path, &state).ok();
}
