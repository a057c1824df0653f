// ABOUTME: python_repl — runs short Python snippets with the local python3 interpreter.
// ABOUTME: Captures stdout/stderr under a timeout and caps what goes back to the model.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;

use crate::config::Config;

use super::{Tool, ToolResult};

const INTERPRETER: &str = "python3";
const MAX_OUTPUT_CHARS: usize = 4000;

pub struct PythonReplTool {
    timeout: Duration,
}

impl PythonReplTool {
    pub fn new(config: &Config) -> Self {
        Self {
            timeout: Duration::from_secs(config.tools.python_timeout_seconds),
        }
    }
}

#[async_trait]
impl Tool for PythonReplTool {
    fn name(&self) -> &str {
        "python_repl"
    }

    fn description(&self) -> &str {
        "Execute a short Python snippet and return what it prints. \
         Use print() for anything you want back."
    }

    fn schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "code": {
                    "type": "string",
                    "description": "Python source to execute"
                }
            },
            "required": ["code"]
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolResult> {
        let code = params["code"].as_str().context("code parameter required")?;

        let run = Command::new(INTERPRETER)
            .arg("-c")
            .arg(code)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, run).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Ok(ToolResult::error(format!(
                    "Failed to run {INTERPRETER}: {e}"
                )));
            }
            Err(_) => {
                return Ok(ToolResult::error(format!(
                    "python_repl timed out after {}s",
                    self.timeout.as_secs()
                )));
            }
        };

        Ok(render_output(
            &output.stdout,
            &output.stderr,
            output.status.success(),
        ))
    }
}

fn render_output(stdout: &[u8], stderr: &[u8], success: bool) -> ToolResult {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);

    let mut combined = String::new();
    if !stdout.trim().is_empty() {
        combined.push_str(stdout.trim_end());
    }
    if !stderr.trim().is_empty() {
        if !combined.is_empty() {
            combined.push('\n');
        }
        combined.push_str(stderr.trim_end());
    }
    if combined.is_empty() {
        combined = "(no output; use print() to return values)".to_string();
    }

    let text = truncate_chars(&combined, MAX_OUTPUT_CHARS);
    if success {
        ToolResult::text(text)
    } else {
        ToolResult::error(text)
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let head: String = text.chars().take(max).collect();
    format!("{head}\n... (output truncated)")
}
