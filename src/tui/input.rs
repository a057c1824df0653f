// ABOUTME: Keyboard input handling for the TUI — translates key events into actions.
// ABOUTME: Routes keys by pane focus: chat input, strategy picker, or tool picker.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::tui::state::{Focus, TuiState};

/// The result of processing a key event.
#[derive(Debug, PartialEq)]
pub enum InputResult {
    /// No action needed.
    None,
    /// User submitted a message.
    Send(String),
    /// User changed the strategy or tool selection; settings need to be re-sent.
    Configure,
    /// User cleared the conversation history.
    ClearHistory,
    /// User wants to quit.
    Quit,
}

/// Process a key event against the current TUI state and return the resulting action.
pub fn handle_key(state: &mut TuiState, key: KeyEvent) -> InputResult {
    // Ctrl+C always quits
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return InputResult::Quit;
    }

    // PageUp/PageDown always scroll, regardless of mode.
    if handle_scroll_key(state, key.code) {
        return InputResult::None;
    }

    // While a turn is running only scrolling works; editing, pickers, and
    // history clearing wait until the agent is done.
    if state.streaming {
        match key.code {
            KeyCode::Up => state.scroll_offset = state.scroll_offset.saturating_add(1),
            KeyCode::Down => state.scroll_offset = state.scroll_offset.saturating_sub(1),
            _ => {}
        }
        return InputResult::None;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('l') {
        return InputResult::ClearHistory;
    }

    if key.code == KeyCode::Tab {
        state.cycle_focus();
        return InputResult::None;
    }

    match state.focus {
        Focus::Strategy => handle_strategy_key(state, key),
        Focus::Tools => handle_tools_key(state, key),
        Focus::Input => handle_input_key(state, key),
    }
}

fn handle_scroll_key(state: &mut TuiState, key: KeyCode) -> bool {
    match key {
        KeyCode::PageUp => {
            state.scroll_offset = state.scroll_offset.saturating_add(10);
            true
        }
        KeyCode::PageDown => {
            state.scroll_offset = state.scroll_offset.saturating_sub(10);
            true
        }
        _ => false,
    }
}

/// Handle key events while the strategy picker has focus. Moving the selection
/// is the change: there is no separate confirm step.
fn handle_strategy_key(state: &mut TuiState, key: KeyEvent) -> InputResult {
    match key.code {
        KeyCode::Up => {
            if state.select_prev_strategy() {
                InputResult::Configure
            } else {
                InputResult::None
            }
        }
        KeyCode::Down => {
            if state.select_next_strategy() {
                InputResult::Configure
            } else {
                InputResult::None
            }
        }
        KeyCode::Esc => {
            state.focus = Focus::Input;
            InputResult::None
        }
        _ => InputResult::None,
    }
}

/// Handle key events while the tool picker has focus.
fn handle_tools_key(state: &mut TuiState, key: KeyEvent) -> InputResult {
    match key.code {
        KeyCode::Up => {
            state.tool_cursor_up();
            InputResult::None
        }
        KeyCode::Down => {
            state.tool_cursor_down();
            InputResult::None
        }
        KeyCode::Char(' ') | KeyCode::Enter => {
            state.toggle_tool_at_cursor();
            InputResult::Configure
        }
        KeyCode::Esc => {
            state.focus = Focus::Input;
            InputResult::None
        }
        _ => InputResult::None,
    }
}

/// Handle key events in normal chat input mode.
fn handle_input_key(state: &mut TuiState, key: KeyEvent) -> InputResult {
    match key.code {
        KeyCode::Enter => {
            if let Some(text) = state.submit_input() {
                InputResult::Send(text)
            } else {
                InputResult::None
            }
        }
        KeyCode::Char(c) => {
            state.insert_char_at_cursor(c);
            InputResult::None
        }
        KeyCode::Backspace => {
            state.backspace_char();
            InputResult::None
        }
        KeyCode::Delete => {
            state.delete_char_at_cursor();
            InputResult::None
        }
        KeyCode::Left => {
            state.move_cursor_left();
            InputResult::None
        }
        KeyCode::Right => {
            state.move_cursor_right();
            InputResult::None
        }
        KeyCode::Home => {
            state.move_cursor_home();
            InputResult::None
        }
        KeyCode::End => {
            state.move_cursor_end();
            InputResult::None
        }
        // Single-line input, so Up/Down scroll the chat.
        KeyCode::Up => {
            state.scroll_offset = state.scroll_offset.saturating_add(1);
            InputResult::None
        }
        KeyCode::Down => {
            state.scroll_offset = state.scroll_offset.saturating_sub(1);
            InputResult::None
        }
        KeyCode::Esc => InputResult::Quit,
        _ => InputResult::None,
    }
}
