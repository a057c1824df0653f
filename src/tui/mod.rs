// ABOUTME: TUI module — ratatui full-screen interface for sage.
// ABOUTME: Chat display, strategy/tool pickers, input handling, and the event loop.

pub mod input;
pub mod state;
pub mod ui;
pub mod widgets;

pub use state::*;

use std::io;

use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures::StreamExt;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc;

use crate::tui::input::{InputResult, handle_key};

/// Put the terminal into raw mode on the alternate screen.
fn init_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    Ok(terminal)
}

/// Undo `init_terminal` so the shell gets a usable terminal back.
fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Drive the TUI until the user quits: draw, wait for a key press or an agent
/// event, fold it into the state, repeat. The terminal is restored even when
/// the loop errors.
pub async fn run(
    state: &mut TuiState,
    user_tx: &mpsc::Sender<UserEvent>,
    agent_rx: &mut mpsc::Receiver<AgentEvent>,
) -> Result<()> {
    let mut terminal = init_terminal()?;
    let result = event_loop(&mut terminal, state, user_tx, agent_rx).await;
    restore_terminal(terminal)?;
    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: &mut TuiState,
    user_tx: &mpsc::Sender<UserEvent>,
    agent_rx: &mut mpsc::Receiver<AgentEvent>,
) -> Result<()> {
    let mut keys = EventStream::new();

    loop {
        terminal.draw(|frame| ui::render(frame, state))?;

        tokio::select! {
            maybe_event = keys.next() => {
                let Some(event) = maybe_event else { break };
                if let Event::Key(key) = event? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    match handle_key(state, key) {
                        InputResult::Send(text) => {
                            state.push_message(ChatMessageKind::User, text.clone());
                            state.streaming = true;
                            let _ = user_tx.send(UserEvent::Message(text)).await;
                        }
                        InputResult::Configure => {
                            let _ = user_tx.send(UserEvent::Configure(state.settings())).await;
                        }
                        InputResult::ClearHistory => {
                            state.clear_transcript();
                            state.push_message(
                                ChatMessageKind::System,
                                "history cleared".to_string(),
                            );
                            let _ = user_tx.send(UserEvent::ClearHistory).await;
                        }
                        InputResult::Quit => break,
                        InputResult::None => {}
                    }
                }
                // Resize and other terminal events just trigger a redraw.
            }
            maybe_agent = agent_rx.recv() => {
                let Some(event) = maybe_agent else { break };
                state.apply_agent_event(event);
            }
        }
    }

    Ok(())
}
