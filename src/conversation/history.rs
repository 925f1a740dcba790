//! In-memory message sequence for one chat view

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use crate::api::Citation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single turn in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Citation>>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            sources: None,
        }
    }

    pub fn assistant(content: impl Into<String>, sources: Vec<Citation>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            sources: Some(sources),
        }
    }

    pub fn citations(&self) -> &[Citation] {
        self.sources.as_deref().unwrap_or(&[])
    }
}

/// Ordered message sequence. Only appends and removal of the last entry are
/// possible, which is all the optimistic-update protocol needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationHistory {
    messages: Vec<Message>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Undo exactly the most recent append
    pub fn pop_last(&mut self) -> Option<Message> {
        self.messages.pop()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Number of user turns still waiting for an answer at the tail
    pub fn trailing_unanswered(&self) -> usize {
        self.messages
            .iter()
            .rev()
            .take_while(|m| m.role == Role::User)
            .count()
    }
}
