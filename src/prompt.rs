// ABOUTME: Prompt assembly — layered system prompts plus {name} placeholder templates.
// ABOUTME: Compiles defaults from src/prompts/*.md, supports file overrides under ~/.sage/.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Result, bail};

/// Compiled-in default prompt layers.
const DEFAULT_SYSTEM: &str = include_str!("prompts/system.md");
const DEFAULT_REACT: &str = include_str!("prompts/react.md");
const DEFAULT_PLANNER: &str = include_str!("prompts/planner.md");

/// Reads a file if it exists, returning None otherwise.
pub fn read_if_exists(path: PathBuf) -> Option<String> {
    if path.exists() {
        fs::read_to_string(&path).ok()
    } else {
        None
    }
}

fn override_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".sage")
}

/// Assembles system prompts from layered sources. Each layer ships a
/// compiled-in default and can be replaced by a same-named file in `~/.sage/`.
#[derive(Debug, Clone)]
pub struct SystemPromptBuilder {
    pub system: String,
    pub react: String,
    pub planner: String,
}

impl SystemPromptBuilder {
    /// Creates a new builder loaded with the compiled-in defaults.
    pub fn new() -> Self {
        Self {
            system: DEFAULT_SYSTEM.to_string(),
            react: DEFAULT_REACT.to_string(),
            planner: DEFAULT_PLANNER.to_string(),
        }
    }

    /// Checks `~/.sage/` for override files and replaces layers if found.
    pub fn load_overrides(&mut self) -> &mut Self {
        let base = override_dir();

        if let Some(content) = read_if_exists(base.join("system.md")) {
            self.system = content;
        }
        if let Some(content) = read_if_exists(base.join("react.md")) {
            self.react = content;
        }
        if let Some(content) = read_if_exists(base.join("planner.md")) {
            self.planner = content;
        }

        self
    }

    /// System prompt for tool-using chat turns.
    pub fn chat_prompt(&self) -> String {
        join_layers(&[self.system.as_str(), self.react.as_str()])
    }

    /// System prompt for the planning call. Kept free of the chat layers so
    /// the model has nothing to echo besides the JSON contract.
    pub fn planner_prompt(&self) -> String {
        self.planner.clone()
    }
}

impl Default for SystemPromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn join_layers(layers: &[&str]) -> String {
    layers
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// A prompt with `{name}` placeholders rendered against named values.
/// Doubled braces escape literals: `{{` renders as `{`.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Loads a named template from `~/.sage/templates/{name}.md`.
    pub fn load(name: &str) -> Result<Self> {
        let path = override_dir().join("templates").join(format!("{name}.md"));
        match read_if_exists(path.clone()) {
            Some(text) => Ok(Self::new(text)),
            None => bail!("Template not found: {}", path.display()),
        }
    }

    /// Renders the template, substituting every `{name}` placeholder.
    /// Placeholders with no matching value are an error naming what is missing.
    pub fn render(&self, vars: &HashMap<String, String>) -> Result<String> {
        let mut out = String::with_capacity(self.text.len());
        let mut missing: Vec<String> = Vec::new();
        let mut chars = self.text.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    out.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    out.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for nc in chars.by_ref() {
                        if nc == '}' {
                            closed = true;
                            break;
                        }
                        name.push(nc);
                    }
                    if !closed {
                        bail!("Unclosed '{{' in template");
                    }
                    match vars.get(&name) {
                        Some(value) => out.push_str(value),
                        None => {
                            if !missing.contains(&name) {
                                missing.push(name);
                            }
                        }
                    }
                }
                _ => out.push(c),
            }
        }

        if !missing.is_empty() {
            bail!("Missing template variables: {}", missing.join(", "));
        }
        Ok(out)
    }
}
