// ABOUTME: TUI state types — chat transcript, agent/user events, input buffer, and picker state.
// ABOUTME: Drives the TUI rendering and bridges the agent loop to the display.

use crate::agent::{AgentSettings, Strategy};
use crate::tools::TOOL_CATALOG;

/// The kind of a single chat message displayed in the TUI.
#[derive(Debug, PartialEq)]
pub enum ChatMessageKind {
    User,
    Assistant,
    ToolCall { tool_name: String },
    ToolResult { is_error: bool },
    Plan,
    System,
    Error,
}

/// A single message in the chat history.
#[derive(Debug)]
pub struct ChatMessage {
    pub kind: ChatMessageKind,
    pub content: String,
}

/// Events sent from the agent loop to the TUI via an mpsc channel.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// Streaming text delta from the LLM.
    TextDelta(String),
    /// A tool call has started execution.
    ToolCallStarted {
        tool_name: String,
        input_summary: String,
    },
    /// A tool call completed with a result.
    ToolResult {
        tool_name: String,
        content: String,
        is_error: bool,
    },
    /// The planner produced its step list.
    PlanReady(Vec<String>),
    /// A plan step is about to execute.
    StepStarted {
        index: usize,
        total: usize,
        description: String,
    },
    /// Token usage update from a completed API response.
    Usage { input_tokens: u64, output_tokens: u64 },
    /// An error occurred in the agent loop.
    Error(String),
    /// The agent loop finished processing the current message.
    Done,
}

/// Events sent from the TUI to the agent loop.
#[derive(Debug, PartialEq)]
pub enum UserEvent {
    /// User submitted a chat message.
    Message(String),
    /// User changed the strategy or tool selection.
    Configure(AgentSettings),
    /// User cleared the conversation history.
    ClearHistory,
    /// User requested to quit.
    Quit,
}

/// Which pane keyboard input is routed to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Focus {
    Input,
    Strategy,
    Tools,
}

/// Full TUI application state.
pub struct TuiState {
    pub messages: Vec<ChatMessage>,
    pub input: String,
    pub cursor_pos: usize,
    pub scroll_offset: u16,
    pub streaming: bool,
    pub focus: Focus,
    /// Index into `Strategy::ALL`.
    pub strategy_index: usize,
    /// Selection marks aligned with `TOOL_CATALOG`.
    pub tool_marks: [bool; TOOL_CATALOG.len()],
    /// Cursor row in the tool picker.
    pub tool_cursor: usize,
    pub model: String,
    pub total_tokens: u64,
}

impl TuiState {
    /// Create a new TUI state showing the given model and agent settings.
    pub fn new(model: String, settings: &AgentSettings) -> Self {
        let strategy_index = Strategy::ALL
            .iter()
            .position(|s| *s == settings.strategy)
            .unwrap_or(0);
        let mut tool_marks = [false; TOOL_CATALOG.len()];
        for (i, name) in TOOL_CATALOG.iter().enumerate() {
            tool_marks[i] = settings.tools.iter().any(|t| t == name);
        }

        Self {
            messages: Vec::new(),
            input: String::new(),
            cursor_pos: 0,
            scroll_offset: 0,
            streaming: false,
            focus: Focus::Input,
            strategy_index,
            tool_marks,
            tool_cursor: 0,
            model,
            total_tokens: 0,
        }
    }

    /// The settings currently selected in the pickers. Tool order follows the
    /// catalog, not click order.
    pub fn settings(&self) -> AgentSettings {
        AgentSettings {
            strategy: Strategy::ALL[self.strategy_index.min(Strategy::ALL.len() - 1)],
            tools: TOOL_CATALOG
                .iter()
                .zip(self.tool_marks.iter())
                .filter(|(_, marked)| **marked)
                .map(|(name, _)| name.to_string())
                .collect(),
        }
    }

    pub fn strategy(&self) -> Strategy {
        Strategy::ALL[self.strategy_index.min(Strategy::ALL.len() - 1)]
    }

    pub fn selected_tool_count(&self) -> usize {
        self.tool_marks.iter().filter(|m| **m).count()
    }

    /// Tab order: input, strategy picker, tool picker, back to input.
    pub fn cycle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Input => Focus::Strategy,
            Focus::Strategy => Focus::Tools,
            Focus::Tools => Focus::Input,
        };
    }

    /// Move the strategy selection up. Returns true if the selection changed.
    pub fn select_prev_strategy(&mut self) -> bool {
        let before = self.strategy_index;
        self.strategy_index = self.strategy_index.saturating_sub(1);
        self.strategy_index != before
    }

    /// Move the strategy selection down. Returns true if the selection changed.
    pub fn select_next_strategy(&mut self) -> bool {
        let before = self.strategy_index;
        self.strategy_index = (self.strategy_index + 1).min(Strategy::ALL.len() - 1);
        self.strategy_index != before
    }

    pub fn tool_cursor_up(&mut self) {
        self.tool_cursor = self.tool_cursor.saturating_sub(1);
    }

    pub fn tool_cursor_down(&mut self) {
        self.tool_cursor = (self.tool_cursor + 1).min(TOOL_CATALOG.len() - 1);
    }

    /// Flip the mark under the tool cursor.
    pub fn toggle_tool_at_cursor(&mut self) {
        self.tool_marks[self.tool_cursor] = !self.tool_marks[self.tool_cursor];
    }

    /// Fold one agent event into the transcript and counters.
    pub fn apply_agent_event(&mut self, event: AgentEvent) {
        match event {
            AgentEvent::TextDelta(text) => {
                self.append_to_last_assistant(&text);
            }
            AgentEvent::ToolCallStarted {
                tool_name,
                input_summary,
            } => {
                self.push_message(ChatMessageKind::ToolCall { tool_name }, input_summary);
            }
            AgentEvent::ToolResult {
                tool_name: _,
                content,
                is_error,
            } => {
                self.push_message(ChatMessageKind::ToolResult { is_error }, content);
            }
            AgentEvent::PlanReady(steps) => {
                let body = steps
                    .iter()
                    .enumerate()
                    .map(|(i, step)| format!("{}. {}", i + 1, step))
                    .collect::<Vec<_>>()
                    .join("\n");
                self.push_message(ChatMessageKind::Plan, body);
            }
            AgentEvent::StepStarted {
                index,
                total,
                description,
            } => {
                self.push_message(
                    ChatMessageKind::System,
                    format!("step {}/{}: {}", index, total, description),
                );
            }
            AgentEvent::Usage {
                input_tokens,
                output_tokens,
            } => {
                self.total_tokens += input_tokens + output_tokens;
            }
            AgentEvent::Error(message) => {
                self.push_message(ChatMessageKind::Error, message);
            }
            AgentEvent::Done => {
                self.streaming = false;
            }
        }
    }

    /// Add a message to the chat history and reset scroll to bottom.
    pub fn push_message(&mut self, kind: ChatMessageKind, content: String) {
        self.messages.push(ChatMessage { kind, content });
        self.scroll_offset = 0;
    }

    /// Append text to the last assistant message, or create a new one if needed.
    pub fn append_to_last_assistant(&mut self, text: &str) {
        if let Some(msg) = self.messages.last_mut() {
            if msg.kind == ChatMessageKind::Assistant {
                msg.content.push_str(text);
                return;
            }
        }
        self.push_message(ChatMessageKind::Assistant, text.to_string());
    }

    /// Drop the transcript and jump back to the bottom.
    pub fn clear_transcript(&mut self) {
        self.messages.clear();
        self.scroll_offset = 0;
    }

    /// Submit the current input buffer. Returns the trimmed text if non-empty.
    pub fn submit_input(&mut self) -> Option<String> {
        let trimmed = self.input.trim().to_string();
        if trimmed.is_empty() {
            return None;
        }
        self.input.clear();
        self.cursor_pos = 0;
        Some(trimmed)
    }

    /// Clamp the cursor position to the valid character range of the input buffer.
    pub fn clamp_cursor(&mut self) {
        self.cursor_pos = self.cursor_pos.min(self.input_char_len());
    }

    /// Return the current cursor byte index in the UTF-8 input buffer.
    pub fn cursor_byte_index(&self) -> usize {
        char_index_to_byte_index(&self.input, self.cursor_pos)
    }

    /// Return the total number of characters in the input buffer.
    pub fn input_char_len(&self) -> usize {
        self.input.chars().count()
    }

    /// Insert a character at the cursor and advance by one character.
    pub fn insert_char_at_cursor(&mut self, c: char) {
        self.clamp_cursor();
        let byte_index = self.cursor_byte_index();
        self.input.insert(byte_index, c);
        self.cursor_pos += 1;
    }

    /// Delete the character before the cursor (backspace behavior).
    pub fn backspace_char(&mut self) {
        self.clamp_cursor();
        if self.cursor_pos == 0 {
            return;
        }

        let end = self.cursor_byte_index();
        let start = char_index_to_byte_index(&self.input, self.cursor_pos - 1);
        self.input.replace_range(start..end, "");
        self.cursor_pos -= 1;
    }

    /// Delete the character at the cursor (delete behavior).
    pub fn delete_char_at_cursor(&mut self) {
        self.clamp_cursor();
        if self.cursor_pos >= self.input_char_len() {
            return;
        }

        let start = self.cursor_byte_index();
        let end = char_index_to_byte_index(&self.input, self.cursor_pos + 1);
        self.input.replace_range(start..end, "");
    }

    /// Move cursor one character to the left.
    pub fn move_cursor_left(&mut self) {
        self.clamp_cursor();
        self.cursor_pos = self.cursor_pos.saturating_sub(1);
    }

    /// Move cursor one character to the right.
    pub fn move_cursor_right(&mut self) {
        self.clamp_cursor();
        if self.cursor_pos < self.input_char_len() {
            self.cursor_pos += 1;
        }
    }

    /// Move cursor to start of input.
    pub fn move_cursor_home(&mut self) {
        self.cursor_pos = 0;
    }

    /// Move cursor to end of input.
    pub fn move_cursor_end(&mut self) {
        self.cursor_pos = self.input_char_len();
    }
}

fn char_index_to_byte_index(s: &str, char_index: usize) -> usize {
    if char_index == 0 {
        return 0;
    }

    match s.char_indices().nth(char_index) {
        Some((idx, _)) => idx,
        None => s.len(),
    }
}
