// ABOUTME: TUI widget sub-modules for chat, settings pickers, and the status bar.
// ABOUTME: Each widget is a pure rendering function over TuiState.

pub mod chat;
pub mod picker;
pub mod status;
