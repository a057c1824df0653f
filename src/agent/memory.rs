// ABOUTME: Conversation memory — ordered human/ai turn records kept across the session.
// ABOUTME: Appended after completed turns, cleared on user action, replayed as model context.

use serde::{Deserialize, Serialize};

use crate::llm::ChatMessage;

/// Who spoke in a remembered turn. Tool traffic is transcript-only and never
/// enters memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryRole {
    Human,
    Ai,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryMessage {
    pub role: MemoryRole,
    pub content: String,
}

/// Ordered transcript of completed turns. Ordering always reflects turn order:
/// the only mutations are appending at the tail and clearing the whole buffer.
#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    messages: Vec<MemoryMessage>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds memory from previously persisted messages.
    pub fn from_messages(messages: Vec<MemoryMessage>) -> Self {
        Self { messages }
    }

    pub fn append_human(&mut self, content: &str) {
        self.messages.push(MemoryMessage {
            role: MemoryRole::Human,
            content: content.to_string(),
        });
    }

    pub fn append_ai(&mut self, content: &str) {
        self.messages.push(MemoryMessage {
            role: MemoryRole::Ai,
            content: content.to_string(),
        });
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[MemoryMessage] {
        &self.messages
    }

    /// Renders remembered turns as chat messages for the model.
    pub fn to_chat_messages(&self) -> Vec<ChatMessage> {
        self.messages
            .iter()
            .map(|m| match m.role {
                MemoryRole::Human => ChatMessage::user(&m.content),
                MemoryRole::Ai => ChatMessage::assistant(&m.content),
            })
            .collect()
    }
}
