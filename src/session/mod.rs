// ABOUTME: Session module — persistence of conversation state and JSONL event logs.
// ABOUTME: State lives at ~/.sage/session.json, logs under ~/.sage/logs/.

pub mod log;
pub mod persistence;

pub use log::SessionLogger;
pub use persistence::{SessionState, load_session, save_session};
