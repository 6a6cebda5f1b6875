//! Turn orchestrator.
//!
//! Drives one user turn through an explicit state machine: ask the model to
//! answer directly or request a search, run bounded retrieval/reasoning
//! rounds, then finalize a user-visible answer. Termination is guaranteed by
//! a hard round ceiling and a per-turn deadline; a failed turn leaves the
//! chat history untouched.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use strata_retrieval::gateway::{RetrievalGateway, RetrievalQuery, RetrievalResult};

use crate::directive::{Directive, DirectiveParser};
use crate::error::ChatError;
use crate::generate::TextGenerator;
use crate::history::Role;
use crate::prompt::PromptLibrary;
use crate::session::ChatSession;
use crate::thought::ChainOfThought;

/// Hard bounds applied to every turn.
#[derive(Debug, Clone)]
pub struct TurnLimits {
    /// Ceiling on retrieval rounds within one turn.
    pub max_rounds: u32,
    /// Deadline for the search/reason loop. On expiry the turn is finalized
    /// with whatever reasoning has accumulated; the single finalization call
    /// gets its own allowance of the same length so a stalled generator
    /// still cannot hang the turn.
    pub turn_timeout: Duration,
    /// Entries retained in the turn's chain of thought.
    pub thought_capacity: usize,
}

impl Default for TurnLimits {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            turn_timeout: Duration::from_secs(120),
            thought_capacity: 16,
        }
    }
}

/// Turn states. One `take_turn` call walks `Init` to `Finalizing`; the
/// search/reason cycle repeats up to `max_rounds` times.
enum TurnState {
    Init,
    AwaitingModelReply { prompt: String },
    SearchRound { keywords: String },
    Reasoning,
    Finalizing { direct: Option<String> },
}

/// Outcome of a collaborator call raced against the turn deadline.
enum Bounded<T> {
    Value(T),
    DeadlineExpired,
}

/// The turn engine: consumes a user message, drives zero or more retrieval
/// rounds, and produces the final answer.
pub struct Orchestrator {
    generator: Box<dyn TextGenerator>,
    gateway: RetrievalGateway,
    parser: DirectiveParser,
    prompts: PromptLibrary,
    limits: TurnLimits,
}

impl Orchestrator {
    /// Create an orchestrator over the given collaborators.
    pub fn new(
        generator: Box<dyn TextGenerator>,
        gateway: RetrievalGateway,
        limits: TurnLimits,
    ) -> Self {
        Self {
            generator,
            gateway,
            parser: DirectiveParser::new(),
            prompts: PromptLibrary::default(),
            limits,
        }
    }

    /// Replace the default prompt templates.
    pub fn with_prompts(mut self, prompts: PromptLibrary) -> Self {
        self.prompts = prompts;
        self
    }

    /// Process one user turn against the session.
    ///
    /// On success the session history gains exactly two messages: the user's
    /// and the final answer. On failure nothing is appended and the partial
    /// chain of thought is discarded.
    pub async fn take_turn(
        &self,
        session: &mut ChatSession,
        user_text: &str,
    ) -> Result<String, ChatError> {
        let question = user_text.trim();
        if question.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        // Snapshot of the window before this turn; the new message reaches
        // the prompt through its own slot.
        let history = session.formatted_history();
        let mut thoughts = ChainOfThought::new(self.limits.thought_capacity);
        let mut rounds: u32 = 0;
        let started = Instant::now();
        let mut state = TurnState::Init;

        let answer = loop {
            state = match state {
                TurnState::Init => {
                    debug!(session = %session.id(), "Turn started");
                    let prompt = self.prompts.opening_prompt(&history, question);
                    TurnState::AwaitingModelReply { prompt }
                }

                TurnState::AwaitingModelReply { prompt } => {
                    // Nothing has accumulated yet, so a deadline expiry here
                    // is a plain collaborator timeout.
                    let reply = match self.generate_within(&prompt, self.remaining(started)).await?
                    {
                        Bounded::Value(reply) => reply,
                        Bounded::DeadlineExpired => {
                            return Err(ChatError::Timeout(self.limits.turn_timeout));
                        }
                    };

                    match self.parser.parse(&reply) {
                        Directive::Absent => {
                            debug!("Direct answer; no retrieval");
                            TurnState::Finalizing {
                                direct: Some(reply),
                            }
                        }
                        Directive::Search(keywords) => {
                            thoughts.record_thought(reply);
                            TurnState::SearchRound { keywords }
                        }
                        Directive::Malformed => {
                            warn!("Malformed search directive; finalizing");
                            thoughts.record_thought(reply);
                            TurnState::Finalizing { direct: None }
                        }
                    }
                }

                TurnState::SearchRound { keywords } => {
                    if rounds >= self.limits.max_rounds {
                        warn!(rounds, "Round ceiling reached; finalizing");
                        TurnState::Finalizing { direct: None }
                    } else if self.remaining(started).is_zero() {
                        warn!("Turn deadline reached; finalizing");
                        TurnState::Finalizing { direct: None }
                    } else {
                        info!(keywords = %keywords, round = rounds, "Searching indexed collections");
                        let query = RetrievalQuery::new(keywords, rounds);
                        match self.retrieve_within(&query, self.remaining(started)).await {
                            Bounded::Value(results) => {
                                thoughts.record_results(render_results(&results));
                                rounds += 1;
                                TurnState::Reasoning
                            }
                            Bounded::DeadlineExpired => {
                                warn!("Retrieval cut off by turn deadline; finalizing");
                                TurnState::Finalizing { direct: None }
                            }
                        }
                    }
                }

                TurnState::Reasoning => {
                    let prompt =
                        self.prompts
                            .reasoning_prompt(&history, &thoughts.formatted(), question);
                    let reply = match self.generate_within(&prompt, self.remaining(started)).await?
                    {
                        Bounded::Value(reply) => reply,
                        Bounded::DeadlineExpired => {
                            warn!("Reasoning cut off by turn deadline; finalizing");
                            break self.finalize(&history, &thoughts, question).await?;
                        }
                    };

                    thoughts.record_thought(reply.clone());
                    match self.parser.parse(&reply) {
                        Directive::Search(keywords) => TurnState::SearchRound { keywords },
                        Directive::Absent => TurnState::Finalizing { direct: None },
                        Directive::Malformed => {
                            warn!("Malformed search directive; finalizing");
                            TurnState::Finalizing { direct: None }
                        }
                    }
                }

                TurnState::Finalizing { direct } => match direct {
                    Some(reply) => break reply,
                    None => break self.finalize(&history, &thoughts, question).await?,
                },
            };
        };

        session.append(Role::User, question);
        session.append(Role::Agent, answer.clone());
        debug!(
            session = %session.id(),
            rounds,
            "Turn complete"
        );
        Ok(answer)
    }

    /// Produce the user-visible answer from the accumulated chain of thought.
    ///
    /// Runs under a fresh allowance so a turn that spent its whole budget in
    /// the loop can still conclude, while remaining bounded overall.
    async fn finalize(
        &self,
        history: &str,
        thoughts: &ChainOfThought,
        question: &str,
    ) -> Result<String, ChatError> {
        let prompt = self
            .prompts
            .final_prompt(history, &thoughts.formatted(), question);
        match self
            .generate_within(&prompt, self.limits.turn_timeout)
            .await?
        {
            Bounded::Value(answer) => Ok(answer),
            Bounded::DeadlineExpired => Err(ChatError::Timeout(self.limits.turn_timeout)),
        }
    }

    /// Budget left before the turn deadline.
    fn remaining(&self, started: Instant) -> Duration {
        self.limits.turn_timeout.saturating_sub(started.elapsed())
    }

    async fn generate_within(
        &self,
        prompt: &str,
        budget: Duration,
    ) -> Result<Bounded<String>, ChatError> {
        match tokio::time::timeout(budget, self.generator.generate(prompt)).await {
            Ok(Ok(reply)) => Ok(Bounded::Value(reply)),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Ok(Bounded::DeadlineExpired),
        }
    }

    async fn retrieve_within(&self, query: &RetrievalQuery, budget: Duration) -> Bounded<RetrievalResult> {
        match tokio::time::timeout(budget, self.gateway.query(query)).await {
            Ok(results) => Bounded::Value(results),
            Err(_) => Bounded::DeadlineExpired,
        }
    }
}

/// Text recorded into the chain of thought for one retrieval round.
fn render_results(results: &RetrievalResult) -> String {
    if results.is_empty() {
        "no matching passages found".to_string()
    } else {
        results.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use strata_core::error::StrataError;
    use strata_retrieval::collection::{CollectionHit, CollectionSearch};

    /// Generator that returns canned replies in order, repeating the last.
    struct ScriptedGenerator {
        replies: Mutex<Vec<String>>,
        calls: AtomicUsize,
    }

    impl ScriptedGenerator {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, StrataError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let replies = self.replies.lock().unwrap();
            let idx = n.min(replies.len() - 1);
            Ok(replies[idx].clone())
        }
    }

    /// Generator that always fails.
    struct FailingGenerator;

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, StrataError> {
            Err(StrataError::Generation("backend down".to_string()))
        }
    }

    /// Collection that counts queries and returns one fixed hit.
    struct CountingCollection {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl CollectionSearch for CountingCollection {
        async fn query(
            &self,
            _keywords: &str,
            _k: usize,
        ) -> Result<Vec<CollectionHit>, StrataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![CollectionHit {
                source: "notes.pdf".to_string(),
                page: 1,
                content: "retrieved passage".to_string(),
                distance: 0.1,
            }])
        }

        fn is_empty(&self) -> bool {
            false
        }
    }

    fn counting_gateway() -> (RetrievalGateway, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut gateway = RetrievalGateway::new(4);
        gateway.add_collection(
            "lectures",
            CountingCollection {
                calls: Arc::clone(&calls),
            },
        );
        (gateway, calls)
    }

    fn orchestrator(replies: &[&str]) -> Orchestrator {
        Orchestrator::new(
            Box::new(ScriptedGenerator::new(replies)),
            RetrievalGateway::new(4),
            TurnLimits::default(),
        )
    }

    // ---- Direct answers ----

    #[tokio::test]
    async fn test_direct_answer_appends_two_messages() {
        let orch = orchestrator(&["Creep is time-dependent deformation."]);
        let mut session = ChatSession::new(10);

        let answer = orch.take_turn(&mut session, "what is creep?").await.unwrap();
        assert_eq!(answer, "Creep is time-dependent deformation.");
        assert_eq!(session.message_count(), 2);
        assert_eq!(
            session.formatted_history(),
            "user: what is creep?\nagent: Creep is time-dependent deformation."
        );
    }

    #[tokio::test]
    async fn test_input_is_trimmed() {
        let orch = orchestrator(&["answer"]);
        let mut session = ChatSession::new(10);
        orch.take_turn(&mut session, "  question  ").await.unwrap();
        assert!(session.formatted_history().starts_with("user: question"));
    }

    // ---- Guards ----

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let orch = orchestrator(&["unused"]);
        let mut session = ChatSession::new(10);
        let result = orch.take_turn(&mut session, "   ").await;
        assert!(matches!(result, Err(ChatError::EmptyMessage)));
        assert_eq!(session.message_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_turn_leaves_history_untouched() {
        let orch = Orchestrator::new(
            Box::new(FailingGenerator),
            RetrievalGateway::new(4),
            TurnLimits::default(),
        );
        let mut session = ChatSession::new(10);
        session.append(Role::User, "earlier");
        session.append(Role::Agent, "reply");

        let result = orch.take_turn(&mut session, "question").await;
        assert!(matches!(result, Err(ChatError::Generation(_))));
        assert_eq!(session.message_count(), 2);
        assert_eq!(session.formatted_history(), "user: earlier\nagent: reply");
    }

    // ---- Malformed directives ----

    #[tokio::test]
    async fn test_malformed_directive_falls_through_to_finalization() {
        // Marker with no quoted payload, then the finalization reply.
        let orch = orchestrator(&["./search oops", "salvaged answer"]);
        let mut session = ChatSession::new(10);

        let answer = orch.take_turn(&mut session, "question").await.unwrap();
        assert_eq!(answer, "salvaged answer");
        assert_eq!(session.message_count(), 2);
    }

    #[tokio::test]
    async fn test_malformed_directive_issues_no_retrieval() {
        let (gateway, calls) = counting_gateway();
        let orch = Orchestrator::new(
            Box::new(ScriptedGenerator::new(&["./search oops", "done"])),
            gateway,
            TurnLimits::default(),
        );
        let mut session = ChatSession::new(10);
        orch.take_turn(&mut session, "question").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    // ---- Round ceiling ----

    #[tokio::test]
    async fn test_zero_max_rounds_never_searches() {
        let limits = TurnLimits {
            max_rounds: 0,
            ..TurnLimits::default()
        };
        let (gateway, calls) = counting_gateway();
        let orch = Orchestrator::new(
            Box::new(ScriptedGenerator::new(&[r#"./search "topic""#, "final"])),
            gateway,
            limits,
        );
        let mut session = ChatSession::new(10);
        let answer = orch.take_turn(&mut session, "question").await.unwrap();
        assert_eq!(answer, "final");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
