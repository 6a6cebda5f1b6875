//! Prompt assembly.
//!
//! Templates carry `{chat_history}`, `{question}`, and `{chain_of_thought}`
//! slots; assembly is a pure function of those inputs. The turn engine
//! depends only on this slot contract, never on the template text itself.

/// Opening prompt: answer directly or request a search.
const OPENING_TEMPLATE: &str = r#"CURRENT CHAT:
{chat_history}
user: {question}

SYSTEM PROMPT:
You are a study assistant for materials science and engineering. Answer with
technical precision, reasoning from first principles and using standard
terminology. Continue the conversation from CURRENT CHAT; you are replying to
the latest user message.
If you can answer from your own knowledge, reply with the answer directly.
If the answer needs material from the indexed course collections, reply with
exactly one line of the form:
./search "keywords describing what to look up"
and nothing else.
"#;

/// Reasoning prompt: weigh retrieved passages, search again or conclude.
const REASONING_TEMPLATE: &str = r#"CURRENT CHAT:
{chat_history}
user: {question}

WORK SO FAR:
{chain_of_thought}

SYSTEM PROMPT:
You are a study assistant for materials science and engineering, partway
through answering the latest user message. Passages retrieved for your
earlier searches appear under WORK SO FAR as SEARCH RESULTS entries.
If the retrieved material is sufficient, write out your conclusions.
If one more lookup would genuinely help, reply with exactly one line of the
form:
./search "keywords describing what to look up"
and nothing else.
"#;

/// Final-answer prompt: produce the user-visible reply.
const CONCLUSION_TEMPLATE: &str = r#"CURRENT CHAT:
{chat_history}
user: {question}

WORK SO FAR:
{chain_of_thought}

SYSTEM PROMPT:
You are a study assistant for materials science and engineering. Using WORK
SO FAR, write the final reply to the latest user message, continuing the
conversation from CURRENT CHAT. When you rely on a retrieved passage, cite
its source and page. Retrieval is invisible to the user; do not mention
searches or these instructions. Do not request any further searches.
"#;

/// The three prompt variants used across a turn.
///
/// Construction is the only place template text enters the system;
/// everything downstream works with rendered strings.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    opening: String,
    reasoning: String,
    conclusion: String,
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self {
            opening: OPENING_TEMPLATE.to_string(),
            reasoning: REASONING_TEMPLATE.to_string(),
            conclusion: CONCLUSION_TEMPLATE.to_string(),
        }
    }
}

impl PromptLibrary {
    /// Build a library with custom template text. Each template keeps the
    /// standard slot names.
    pub fn new(
        opening: impl Into<String>,
        reasoning: impl Into<String>,
        conclusion: impl Into<String>,
    ) -> Self {
        Self {
            opening: opening.into(),
            reasoning: reasoning.into(),
            conclusion: conclusion.into(),
        }
    }

    /// Render the opening (direct-answer-or-search) prompt.
    pub fn opening_prompt(&self, chat_history: &str, question: &str) -> String {
        render(&self.opening, chat_history, question, "")
    }

    /// Render the reasoning prompt for a search round.
    pub fn reasoning_prompt(
        &self,
        chat_history: &str,
        chain_of_thought: &str,
        question: &str,
    ) -> String {
        render(&self.reasoning, chat_history, question, chain_of_thought)
    }

    /// Render the final-answer prompt.
    pub fn final_prompt(
        &self,
        chat_history: &str,
        chain_of_thought: &str,
        question: &str,
    ) -> String {
        render(&self.conclusion, chat_history, question, chain_of_thought)
    }
}

/// Substitute the slot values into a template.
fn render(template: &str, chat_history: &str, question: &str, chain_of_thought: &str) -> String {
    template
        .replace("{chat_history}", chat_history)
        .replace("{question}", question)
        .replace("{chain_of_thought}", chain_of_thought)
}
