// ABOUTME: Picker widgets — strategy radio list and tool multiselect checklist.
// ABOUTME: Rendered in the settings panel; the focused pane gets a highlighted cursor row.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::agent::Strategy;
use crate::tools::TOOL_CATALOG;
use crate::tui::state::{Focus, TuiState};

/// Render the strategy radio list, one row per variant. The selected row is
/// the active strategy; there is no separate cursor.
pub fn strategy_lines(state: &TuiState) -> Vec<Line<'static>> {
    let focused = state.focus == Focus::Strategy;
    let mut lines = Vec::new();

    for (i, strategy) in Strategy::ALL.iter().enumerate() {
        let marker = if i == state.strategy_index { "●" } else { "○" };
        let label = format!(" {} {} ", marker, strategy.as_str());
        let style = if focused && i == state.strategy_index {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else if i == state.strategy_index {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        lines.push(Line::from(Span::styled(label, style)));
    }

    lines
}

/// Render the tool checklist, one row per catalog entry.
pub fn tool_lines(state: &TuiState) -> Vec<Line<'static>> {
    let focused = state.focus == Focus::Tools;
    let mut lines = Vec::new();

    for (i, name) in TOOL_CATALOG.iter().enumerate() {
        let mark = if state.tool_marks[i] { "[x]" } else { "[ ]" };
        let label = format!(" {} {} ", mark, name);
        let style = if focused && i == state.tool_cursor {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else if state.tool_marks[i] {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        lines.push(Line::from(Span::styled(label, style)));
    }

    lines
}

/// Assemble the full settings panel: strategy section above the tools section.
pub fn panel_lines(state: &TuiState) -> Vec<Line<'static>> {
    let header = Style::default().add_modifier(Modifier::BOLD);
    let mut lines = vec![Line::from(Span::styled("Strategy", header))];
    lines.extend(strategy_lines(state));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Tools", header)));
    lines.extend(tool_lines(state));
    lines
}
