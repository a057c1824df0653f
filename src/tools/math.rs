// ABOUTME: llm-math — the model turns a word problem into an arithmetic expression,
// ABOUTME: which is evaluated in-process by a rhai engine with float semantics.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::llm::{ChatMessage, ChatRequest, LlmClient};

use super::{Tool, ToolResult};

const TRANSLATE_PROMPT: &str = "Translate the user's question into a single arithmetic \
expression. Use only numbers, parentheses, and the operators + - * / % **. Output the \
expression alone on one line: no explanation, no code fences, no variable names.";

pub struct LlmMathTool {
    llm: Arc<dyn LlmClient>,
}

impl LlmMathTool {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Tool for LlmMathTool {
    fn name(&self) -> &str {
        "llm-math"
    }

    fn description(&self) -> &str {
        "Answer questions about math and arithmetic. \
         Input should be a fully formulated math question."
    }

    fn schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "question": {
                    "type": "string",
                    "description": "The math question to answer"
                }
            },
            "required": ["question"]
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolResult> {
        let question = params["question"]
            .as_str()
            .context("question parameter required")?;

        let request = ChatRequest {
            messages: vec![
                ChatMessage::system(TRANSLATE_PROMPT),
                ChatMessage::user(question),
            ],
            tools: Vec::new(),
        };
        let response = self.llm.chat(request).await?;

        let expression = extract_expression(&response.content);
        if expression.is_empty() {
            return Ok(ToolResult::error(
                "The model produced no expression to evaluate",
            ));
        }

        match eval_expression(&expression) {
            Ok(answer) => Ok(ToolResult::text(format!("Answer: {answer}"))),
            Err(e) => Ok(ToolResult::error(format!(
                "Could not evaluate '{expression}': {e}"
            ))),
        }
    }
}

/// Take the first usable line of the model's reply, dropping code fences.
pub fn extract_expression(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("```"))
        .map(|line| line.trim_end_matches('.'))
        .next()
        .unwrap_or("")
        .to_string()
}

/// Evaluate an arithmetic expression with float semantics.
pub fn eval_expression(expr: &str) -> Result<String> {
    let engine = rhai::Engine::new();
    let value = engine
        .eval_expression::<f64>(&floatify(expr))
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    Ok(format_number(value))
}

/// Rewrite bare integer literals as floats so division behaves like a
/// calculator (5 / 2 is 2.5, not 2).
fn floatify(expr: &str) -> String {
    let chars: Vec<char> = expr.chars().collect();
    let mut out = String::with_capacity(expr.len() + 8);
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_ascii_digit() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            let part_of_float =
                (start > 0 && chars[start - 1] == '.') || (i < chars.len() && chars[i] == '.');
            out.extend(&chars[start..i]);
            if !part_of_float {
                out.push_str(".0");
            }
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floatify_rewrites_bare_integers() {
        assert_eq!(floatify("2 + 3"), "2.0 + 3.0");
        assert_eq!(floatify("(37593 * 67)"), "(37593.0 * 67.0)");
        assert_eq!(floatify("10 % 3"), "10.0 % 3.0");
    }

    #[test]
    fn floatify_leaves_floats_alone() {
        assert_eq!(floatify("2.5 * 4.0"), "2.5 * 4.0");
        assert_eq!(floatify("0.125"), "0.125");
    }

    #[test]
    fn eval_multiplication() {
        assert_eq!(eval_expression("37593 * 67").unwrap(), "2518731");
    }

    #[test]
    fn eval_division_keeps_fraction() {
        assert_eq!(eval_expression("5 / 2").unwrap(), "2.5");
    }

    #[test]
    fn eval_power_operator() {
        assert_eq!(eval_expression("2 ** 8").unwrap(), "256");
    }

    #[test]
    fn eval_rejects_nonsense() {
        assert!(eval_expression("the answer is blue").is_err());
    }

    #[test]
    fn extract_expression_strips_fences_and_blank_lines() {
        assert_eq!(extract_expression("```\n37593 * 67\n```"), "37593 * 67");
        assert_eq!(extract_expression("\n\n2 + 2\n"), "2 + 2");
        assert_eq!(extract_expression("2 + 2."), "2 + 2");
        assert_eq!(extract_expression(""), "");
    }

    #[test]
    fn translate_prompt_demands_bare_expression() {
        assert!(TRANSLATE_PROMPT.contains("expression"));
        assert!(TRANSLATE_PROMPT.contains("no code fences"));
    }
}
