//! Bounded conversation history.
//!
//! A sliding window over the most recent messages: appends never fail,
//! and once the configured capacity is reached the oldest messages are
//! evicted first. `formatted()` renders the window for prompt assembly.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// The human end user.
    User,
    /// The assistant's user-visible replies.
    Agent,
    /// Machinery-facing entries never shown to the user.
    Internal,
}

impl Role {
    /// Prefix used when rendering a message into prompt text.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Agent => "agent",
            Role::Internal => "internal",
        }
    }
}

/// One message in the conversation. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Monotonic position within the owning history; survives eviction
    /// (evicted sequence numbers are never reused).
    pub seq: u64,
}

/// Capacity-bounded, insertion-ordered log of conversation messages.
///
/// Owned by exactly one session; no sharing between sessions.
#[derive(Debug, Clone)]
pub struct ChatHistory {
    messages: VecDeque<Message>,
    capacity: usize,
    next_seq: u64,
}

impl ChatHistory {
    /// Create an empty history retaining at most `capacity` messages.
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity,
            next_seq: 0,
        }
    }

    /// Append a message, evicting from the front if the window is full.
    ///
    /// Never fails; O(1) amortized.
    pub fn append(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push_back(Message {
            role,
            content: content.into(),
            seq: self.next_seq,
        });
        self.next_seq += 1;

        while self.messages.len() > self.capacity {
            self.messages.pop_front();
        }
    }

    /// Render the current window as role-prefixed lines in insertion order.
    ///
    /// Pure: calling this twice on an unmutated history yields identical
    /// strings. The output is used verbatim as the conversational-context
    /// slot of generation prompts.
    pub fn formatted(&self) -> String {
        self.messages
            .iter()
            .map(|m| format!("{}: {}", m.role.as_str(), m.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Reset to empty. Sequence numbers are not reused.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Number of messages currently retained.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Return true if no messages are retained.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Maximum number of retained messages.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate retained messages in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }
}
