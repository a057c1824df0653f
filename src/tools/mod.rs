// ABOUTME: Tool trait, result type, registry, and the fixed tool catalog.
// ABOUTME: build_registry turns selected catalog names into constructed tools, failing fast on unknowns.

pub mod arxiv;
pub mod google;
pub mod math;
pub mod python;
pub mod search;
pub mod wikipedia;
pub mod wolfram;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::Config;
use crate::llm::{LlmClient, ToolSpec};

/// The fixed catalog the picker offers, in display order.
pub const TOOL_CATALOG: [&str; 8] = [
    "critical_search",
    "llm-math",
    "python_repl",
    "wikipedia",
    "arxiv",
    "google-search",
    "wolfram-alpha",
    "ddg-search",
];

/// Selection a fresh session starts with.
pub const DEFAULT_TOOLS: [&str; 3] = ["ddg-search", "wolfram-alpha", "wikipedia"];

/// Result of one tool execution, shown to both the model and the transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

/// A named capability the agent may invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn schema(&self) -> Value;
    async fn execute(&self, params: Value) -> anyhow::Result<ToolResult>;
}

/// Ordered collection of constructed tools for one agent.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    /// Definitions advertised to the model.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools
            .iter()
            .map(|t| ToolSpec {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.schema(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Run a tool by name. Unknown names and execution failures come back as
    /// error results so the model can recover within the turn.
    pub async fn execute(&self, name: &str, params: Value) -> ToolResult {
        let Some(tool) = self.get(name) else {
            return ToolResult::error(format!("Unknown tool: {name}"));
        };
        match tool.execute(params).await {
            Ok(result) => result,
            Err(e) => ToolResult::error(format!("{name} failed: {e:#}")),
        }
    }
}

/// Construct a registry from catalog names, preserving selection order.
/// Unknown names fail fast with the full catalog in the message.
pub fn build_registry(
    names: &[String],
    llm: Arc<dyn LlmClient>,
    config: &Config,
) -> anyhow::Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    for name in names {
        let tool: Arc<dyn Tool> = match name.as_str() {
            "critical_search" => Arc::new(search::SearchTool::critical(config)),
            "ddg-search" => Arc::new(search::SearchTool::standard(config)),
            "wikipedia" => Arc::new(wikipedia::WikipediaTool::new(config)),
            "arxiv" => Arc::new(arxiv::ArxivTool::new(config)),
            "google-search" => Arc::new(google::GoogleSearchTool::new(config)),
            "wolfram-alpha" => Arc::new(wolfram::WolframAlphaTool::new(config)),
            "llm-math" => Arc::new(math::LlmMathTool::new(llm.clone())),
            "python_repl" => Arc::new(python::PythonReplTool::new(config)),
            other => anyhow::bail!(
                "Unknown tool: '{}'. Catalog: {}",
                other,
                TOOL_CATALOG.join(", ")
            ),
        };
        registry.register(tool);
    }
    Ok(registry)
}
