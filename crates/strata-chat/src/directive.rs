//! Search-directive parser.
//!
//! Model replies may embed an instruction to run another retrieval round:
//! the marker token `./search` followed by a double-quoted keyword string.
//! Extraction is kept separate from the turn state machine and returns a
//! tagged result so malformed instructions cannot loop the engine.

use std::sync::LazyLock;

use regex::Regex;

/// Marker token that opens a search instruction.
pub const SEARCH_MARKER: &str = "./search";

/// Quoted payload immediately after the marker; only whitespace may
/// separate the two.
static PAYLOAD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\./search\s*"([^"]*)""#).expect("Invalid directive regex"));

/// Outcome of scanning a model reply for a search instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// No marker anywhere in the reply.
    Absent,
    /// Well-formed instruction with the extracted keywords.
    Search(String),
    /// Marker present but no well-formed quoted payload follows it.
    /// Callers must treat this as "no further search can be extracted".
    Malformed,
}

/// Recognizes and extracts search instructions from free-form model output.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectiveParser;

impl DirectiveParser {
    pub fn new() -> Self {
        Self
    }

    /// Scan a reply for a search instruction.
    ///
    /// Only the first marker occurrence is considered; later markers in the
    /// same block are ignored for the round. Keywords are returned exactly
    /// as quoted, internal whitespace included.
    pub fn parse(&self, reply: &str) -> Directive {
        let Some(marker_at) = reply.find(SEARCH_MARKER) else {
            return Directive::Absent;
        };

        match PAYLOAD_RE.captures(&reply[marker_at..]) {
            Some(caps) => Directive::Search(caps[1].to_string()),
            None => Directive::Malformed,
        }
    }
}
