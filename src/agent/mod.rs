// ABOUTME: Agent module — strategy selection, tool wiring, and the chat session loop.
// ABOUTME: One operation: run a free-text input to a free-text answer, observer events on the side.

pub mod r#loop;
pub mod memory;
mod plan;
mod react;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Result, bail};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::config::Config;
use crate::llm::{LlmClient, TokenUsage};
use crate::prompt::SystemPromptBuilder;
use crate::tools::{ToolRegistry, build_registry};
use crate::tui::state::AgentEvent;

pub use memory::{ConversationMemory, MemoryMessage, MemoryRole};
pub use r#loop::{AgentLoopParams, run_agent_loop};

/// Reasoning strategy. The set is closed: adding a variant means adding a row
/// to `STRATEGY_TABLE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    #[serde(rename = "zero-shot-react")]
    ZeroShotReact,
    #[serde(rename = "plan-and-solve")]
    PlanAndSolve,
}

/// Routine that drives one turn for a strategy.
type StrategyRun = for<'a> fn(
    &'a mut Agent,
    &'a str,
    &'a mpsc::Sender<AgentEvent>,
) -> BoxFuture<'a, Result<String>>;

/// Strategy dispatch: one row per variant, no conditional chains.
const STRATEGY_TABLE: [(Strategy, StrategyRun); 2] = [
    (Strategy::ZeroShotReact, react::run_boxed),
    (Strategy::PlanAndSolve, plan::run_boxed),
];

impl Strategy {
    pub const ALL: [Strategy; 2] = [Strategy::ZeroShotReact, Strategy::PlanAndSolve];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::ZeroShotReact => "zero-shot-react",
            Strategy::PlanAndSolve => "plan-and-solve",
        }
    }

    fn run_fn(self) -> StrategyRun {
        match STRATEGY_TABLE.iter().find(|(strategy, _)| *strategy == self) {
            Some((_, run)) => *run,
            None => unreachable!("strategy missing from STRATEGY_TABLE"),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        for strategy in Strategy::ALL {
            if strategy.as_str() == s {
                return Ok(strategy);
            }
        }
        bail!(
            "Unknown agent strategy: '{}'. Expected one of: {}",
            s,
            Strategy::ALL.map(|s| s.as_str()).join(", ")
        );
    }
}

/// What a session runs with: the strategy plus the selected catalog names.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSettings {
    pub strategy: Strategy,
    pub tools: Vec<String>,
}

impl AgentSettings {
    /// Settings a fresh session starts with, taken from config.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            strategy: config.agent.strategy.parse()?,
            tools: config.agent.tools.clone(),
        })
    }
}

/// A configured conversational agent: a strategy, an ordered tool registry,
/// and the conversation memory it answers from.
pub struct Agent {
    pub strategy: Strategy,
    pub memory: ConversationMemory,
    llm: Arc<dyn LlmClient>,
    registry: ToolRegistry,
    chat_prompt: String,
    planner_prompt: String,
    max_iterations: usize,
    total_tokens: u64,
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("strategy", &self.strategy)
            .field("memory", &self.memory)
            .field("registry", &self.registry)
            .field("max_iterations", &self.max_iterations)
            .field("total_tokens", &self.total_tokens)
            .finish_non_exhaustive()
    }
}

impl Agent {
    /// Runs one turn: free-text input in, free-text answer out, with
    /// intermediate events (text deltas, tool invocations, plan steps, usage)
    /// sent to the observer channel. Memory is appended only after a
    /// completed turn; a failed turn leaves it untouched and the error
    /// propagates unchanged.
    pub async fn run(
        &mut self,
        input: &str,
        events: &mpsc::Sender<AgentEvent>,
    ) -> Result<String> {
        let run = self.strategy.run_fn();
        let output = run(self, input, events).await?;
        self.memory.append_human(input);
        self.memory.append_ai(&output);
        Ok(output)
    }

    pub fn model(&self) -> &str {
        self.llm.model()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Tokens consumed across all turns of this session.
    pub fn total_tokens(&self) -> u64 {
        self.total_tokens
    }

    fn note_usage(&mut self, usage: &TokenUsage) {
        self.total_tokens += usage.input_tokens + usage.output_tokens;
    }
}

/// Builds an agent for the requested strategy and tool selection.
///
/// Fails fast on unknown tool names and on tool selections the provider
/// cannot serve. An empty tool set is valid: the agent answers directly from
/// the model.
pub fn load_agent(
    config: &Config,
    llm: Arc<dyn LlmClient>,
    settings: &AgentSettings,
) -> Result<Agent> {
    if !settings.tools.is_empty() && !llm.supports_tools() {
        bail!(
            "Provider '{}' does not support tool calling; deselect all tools or switch providers",
            config.llm.provider
        );
    }

    let registry = build_registry(&settings.tools, llm.clone(), config)?;

    let mut prompts = SystemPromptBuilder::new();
    prompts.load_overrides();

    Ok(Agent {
        strategy: settings.strategy,
        memory: ConversationMemory::new(),
        llm,
        registry,
        chat_prompt: prompts.chat_prompt(),
        planner_prompt: prompts.planner_prompt(),
        max_iterations: config.agent.max_iterations,
        total_tokens: 0,
    })
}
