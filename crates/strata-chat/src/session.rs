//! Conversation session.
//!
//! An explicit session object owning the chat history; one per shell or
//! caller. Concurrent sessions each own independent instances; nothing is
//! shared between them.

use chrono::Utc;
use uuid::Uuid;

use crate::history::{ChatHistory, Role};

/// One conversation: identity, start time, and the bounded history.
#[derive(Debug, Clone)]
pub struct ChatSession {
    id: Uuid,
    started_at: i64,
    history: ChatHistory,
}

impl ChatSession {
    /// Start a session whose history retains at most `history_capacity`
    /// messages.
    pub fn new(history_capacity: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now().timestamp(),
            history: ChatHistory::new(history_capacity),
        }
    }

    /// Session identity.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Session start time as epoch seconds.
    pub fn started_at(&self) -> i64 {
        self.started_at
    }

    /// Read access to the history window.
    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    /// Record a message. Used by the orchestrator when a turn completes.
    pub fn append(&mut self, role: Role, content: impl Into<String>) {
        self.history.append(role, content);
    }

    /// Render the history window (hook for the print-history command).
    pub fn formatted_history(&self) -> String {
        self.history.formatted()
    }

    /// Drop all history (hook for the clear-history command).
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Number of messages currently retained.
    pub fn message_count(&self) -> usize {
        self.history.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_empty() {
        let session = ChatSession::new(10);
        assert_eq!(session.message_count(), 0);
        assert_ne!(session.id(), Uuid::nil());
    }

    #[test]
    fn test_sessions_have_distinct_ids() {
        let a = ChatSession::new(10);
        let b = ChatSession::new(10);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_append_and_format() {
        let mut session = ChatSession::new(10);
        session.append(Role::User, "hello");
        session.append(Role::Agent, "hi there");
        assert_eq!(session.formatted_history(), "user: hello\nagent: hi there");
    }

    #[test]
    fn test_clear_history() {
        let mut session = ChatSession::new(10);
        session.append(Role::User, "hello");
        session.clear_history();
        assert_eq!(session.message_count(), 0);
        assert_eq!(session.formatted_history(), "");
    }

    #[test]
    fn test_history_capacity_enforced() {
        let mut session = ChatSession::new(2);
        session.append(Role::User, "one");
        session.append(Role::Agent, "two");
        session.append(Role::User, "three");
        assert_eq!(session.message_count(), 2);
        assert_eq!(session.formatted_history(), "agent: two\nuser: three");
    }
}
