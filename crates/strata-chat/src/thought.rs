//! Turn-scoped chain of thought.
//!
//! A second bounded log, structurally identical to the chat history but
//! created fresh for each user turn and discarded when the turn completes.
//! It records the reasoning/search trace that is never shown to the user.

use std::collections::VecDeque;

/// Kind of entry recorded during a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThoughtKind {
    /// A model reply captured as intermediate reasoning.
    Thought,
    /// Rendered retrieval results for one round.
    SearchResults,
}

impl ThoughtKind {
    fn label(&self) -> &'static str {
        match self {
            ThoughtKind::Thought => "THOUGHT",
            ThoughtKind::SearchResults => "SEARCH RESULTS",
        }
    }
}

#[derive(Debug, Clone)]
struct ThoughtEntry {
    kind: ThoughtKind,
    content: String,
}

/// Bounded reasoning trace for a single orchestrator invocation.
#[derive(Debug, Clone)]
pub struct ChainOfThought {
    entries: VecDeque<ThoughtEntry>,
    capacity: usize,
}

impl ChainOfThought {
    /// Create an empty chain retaining at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a model reply as intermediate reasoning.
    pub fn record_thought(&mut self, content: impl Into<String>) {
        self.push(ThoughtKind::Thought, content.into());
    }

    /// Record one round's rendered retrieval results.
    pub fn record_results(&mut self, content: impl Into<String>) {
        self.push(ThoughtKind::SearchResults, content.into());
    }

    fn push(&mut self, kind: ThoughtKind, content: String) {
        self.entries.push_back(ThoughtEntry { kind, content });
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Render the trace as kind-prefixed lines for prompt assembly.
    pub fn formatted(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("{}: {}", e.kind.label(), e.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Number of entries currently retained.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
