// ABOUTME: Chat widget — renders chat messages into styled ratatui Lines.
// ABOUTME: Each message kind (user, assistant, tool, plan, system, error) has distinct styling.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::tui::state::{ChatMessage, ChatMessageKind};

/// Render a slice of chat messages into styled Lines for display.
pub fn render_chat_lines(messages: &[ChatMessage]) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    for (idx, msg) in messages.iter().enumerate() {
        // Add a blank separator line between message groups.
        // ToolResult is part of the preceding ToolCall group, so no separator before it.
        if idx > 0 && !matches!(msg.kind, ChatMessageKind::ToolResult { .. }) {
            lines.push(Line::from(""));
        }

        match &msg.kind {
            ChatMessageKind::User => {
                lines.push(Line::from(vec![
                    Span::styled(
                        "❯ ",
                        Style::default()
                            .fg(Color::Green)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(msg.content.clone()),
                ]));
            }
            ChatMessageKind::Assistant => {
                // First line gets the prefix, subsequent lines are plain.
                let content_lines: Vec<&str> = msg.content.split('\n').collect();
                for (i, text) in content_lines.iter().enumerate() {
                    if i == 0 {
                        lines.push(Line::from(vec![
                            Span::styled(
                                "⏺ ",
                                Style::default()
                                    .fg(Color::Cyan)
                                    .add_modifier(Modifier::BOLD),
                            ),
                            Span::raw(text.to_string()),
                        ]));
                    } else {
                        lines.push(Line::from(Span::raw(text.to_string())));
                    }
                }
            }
            ChatMessageKind::ToolCall { tool_name } => {
                lines.push(Line::from(Span::styled(
                    format!("⚙ {}({})", tool_name, msg.content),
                    Style::default().fg(Color::Yellow),
                )));
            }
            ChatMessageKind::ToolResult { is_error } => {
                let style = if *is_error {
                    Style::default().fg(Color::Red)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                let content_lines: Vec<&str> = msg.content.split('\n').collect();
                let max_lines = 10;
                let truncated = content_lines.len() > max_lines;
                for text in content_lines.iter().take(max_lines) {
                    lines.push(Line::from(Span::styled(format!("   {}", text), style)));
                }
                if truncated {
                    lines.push(Line::from(Span::styled(
                        format!("   ... ({} more lines)", content_lines.len() - max_lines),
                        style,
                    )));
                }
            }
            ChatMessageKind::Plan => {
                lines.push(Line::from(Span::styled(
                    "∷ plan",
                    Style::default()
                        .fg(Color::Magenta)
                        .add_modifier(Modifier::BOLD),
                )));
                for text in msg.content.split('\n') {
                    lines.push(Line::from(Span::styled(
                        format!("   {}", text),
                        Style::default().fg(Color::Magenta),
                    )));
                }
            }
            ChatMessageKind::System => {
                lines.push(Line::from(Span::styled(
                    format!("[system] {}", msg.content),
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::ITALIC),
                )));
            }
            ChatMessageKind::Error => {
                lines.push(Line::from(Span::styled(
                    format!("✗ {}", msg.content),
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )));
            }
        }
    }

    lines
}
