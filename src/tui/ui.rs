// ABOUTME: Main TUI rendering function — assembles header, chat, settings panel, input, status bar.
// ABOUTME: Splits the terminal frame into layout chunks and delegates to widgets.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Position};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use unicode_width::UnicodeWidthStr;

use crate::tui::state::{Focus, TuiState};
use crate::tui::widgets::chat::render_chat_lines;
use crate::tui::widgets::picker::panel_lines;
use crate::tui::widgets::status::status_line;

/// Width of the settings panel on the right, wide enough for the longest
/// catalog name plus its checkbox.
const PANEL_WIDTH: u16 = 24;

/// Render the full TUI screen layout to the given frame.
pub fn render(frame: &mut Frame, state: &mut TuiState) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Min(3),    // Chat + settings panel
            Constraint::Length(3), // Input area
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    // Header
    let header = Line::from(vec![
        Span::styled(
            " sage",
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            "  tab: panes | space: toggle tool | ctrl+l: clear | esc: quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    frame.render_widget(Paragraph::new(header), chunks[0]);

    // Middle row: chat on the left, settings panel on the right.
    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(PANEL_WIDTH)])
        .split(chunks[1]);

    // Chat area
    let chat_lines = render_chat_lines(&state.messages);

    let chat_chunk = middle[0];
    let visible_height = chat_chunk.height;

    // Use ratatui's own line_count() to get an accurate wrapped line count
    // that exactly matches its internal rendering. This prevents scroll
    // miscalculations that could hide the bottom of chat content.
    let chat_paragraph = Paragraph::new(chat_lines).wrap(Wrap { trim: false });
    let total_lines = chat_paragraph.line_count(chat_chunk.width) as u16;
    let max_scroll = total_lines.saturating_sub(visible_height);

    // Cap scroll_offset so it can't go past the top of the content.
    if state.scroll_offset > max_scroll {
        state.scroll_offset = max_scroll;
    }

    // scroll_offset is lines scrolled up from the bottom (0 = at bottom)
    let scroll = max_scroll.saturating_sub(state.scroll_offset);

    frame.render_widget(chat_paragraph.scroll((scroll, 0)), chat_chunk);

    // Settings panel
    let panel = Paragraph::new(panel_lines(state)).block(
        Block::default()
            .borders(Borders::LEFT)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    frame.render_widget(panel, middle[1]);

    // Input area
    let input_chunk = chunks[2];
    let input_block_style = if state.focus == Focus::Input {
        Style::default()
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let mut input_block = Block::default()
        .borders(Borders::TOP | Borders::BOTTOM)
        .border_style(input_block_style);

    if state.streaming {
        input_block = input_block.title(Span::styled(
            " thinking... ",
            Style::default().fg(Color::DarkGray),
        ));
    }

    let input = Paragraph::new(Span::raw(state.input.clone())).block(input_block);
    frame.render_widget(input, input_chunk);

    // Show the terminal cursor only while the input pane is editable.
    if state.focus == Focus::Input
        && !state.streaming
        && input_chunk.width > 0
        && input_chunk.height > 1
    {
        state.clamp_cursor();

        // Compute the visual (display) width of the text before the cursor.
        let prefix: String = state.input.chars().take(state.cursor_pos).collect();
        let visual_col = UnicodeWidthStr::width(prefix.as_str());

        let max_visual_col = input_chunk.width.saturating_sub(1) as usize;
        let clamped_visual_col = visual_col.min(max_visual_col);

        let cursor_x = input_chunk.x.saturating_add(clamped_visual_col as u16);
        // +1 for the top border.
        let cursor_y = input_chunk.y.saturating_add(1);
        frame.set_cursor_position(Position::new(cursor_x, cursor_y));
    }

    // Status bar
    let status = status_line(
        &state.model,
        state.strategy().as_str(),
        state.selected_tool_count(),
        state.total_tokens,
        state.streaming,
    );
    frame.render_widget(Paragraph::new(status), chunks[3]);
}
