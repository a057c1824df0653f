// ABOUTME: Session state persistence — save and load conversation state as JSON.
// ABOUTME: Enables auto-resume across runs via atomic file writes to ~/.sage/session.json.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::agent::{MemoryMessage, Strategy};

/// Full session state persisted between runs: what the user had selected and
/// everything said so far.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionState {
    pub strategy: Strategy,
    pub tool_names: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
    pub messages: Vec<MemoryMessage>,
    pub total_tokens: u64,
}

/// Load session state from disk, if it exists.
pub fn load_session(path: &Path) -> anyhow::Result<Option<SessionState>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    let state: SessionState = serde_json::from_str(&content)?;
    Ok(Some(state))
}

/// Save session state to disk (atomic write via tmp + rename).
pub fn save_session(path: &Path, state: &SessionState) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("json.tmp");
    let content = serde_json::to_string_pretty(state)?;
    std::fs::write(&tmp_path, &content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
