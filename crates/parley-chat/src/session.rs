//! Chat session: central coordinator wiring resolver, provider and filter.
//!
//! One session owns its buffer, topic context and random source. A turn is
//! resolved, recorded, answered, cleaned and recorded again before the next
//! input is accepted.

use std::sync::Arc;
use std::time::Duration;

use parley_core::config::ParleyConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};
use uuid::Uuid;

use crate::buffer::ConversationBuffer;
use crate::error::ChatError;
use crate::gazetteer::Gazetteer;
use crate::generator::{DecodingConfig, TextGenerator};
use crate::postprocess::ResponseFilter;
use crate::provider::{AnswerProvider, AnswerSource, INVALID_INPUT_REPLY};
use crate::resolver::QueryResolver;
use crate::types::{Category, Reply, SessionContext, Turn};

/// Maximum message length in characters.
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// A single-user conversation.
pub struct ChatSession<G, R = StdRng> {
    id: Uuid,
    buffer: ConversationBuffer,
    context: SessionContext,
    resolver: QueryResolver,
    provider: AnswerProvider<G>,
    filter: ResponseFilter,
    rng: R,
}

impl<G: TextGenerator> ChatSession<G, StdRng> {
    /// Build a session from configuration.
    ///
    /// Uses `session.seed` for the random source when set, entropy otherwise.
    pub fn from_config(config: &ParleyConfig, gazetteer: Arc<Gazetteer>, generator: G) -> Self {
        let rng = match config.session.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let timeout = match config.generation.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Self::new(
            gazetteer,
            generator,
            config.memory.max_turns,
            DecodingConfig::from(&config.generation),
            rng,
        )
        .with_timeout(timeout)
    }
}

impl<G: TextGenerator, R: Rng> ChatSession<G, R> {
    /// Create a session remembering `memory_turns` exchanges.
    pub fn new(
        gazetteer: Arc<Gazetteer>,
        generator: G,
        memory_turns: usize,
        decoding: DecodingConfig,
        rng: R,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            buffer: ConversationBuffer::new(memory_turns),
            context: SessionContext::default(),
            resolver: QueryResolver::new(Arc::clone(&gazetteer)),
            provider: AnswerProvider::new(gazetteer, generator, decoding),
            filter: ResponseFilter::default(),
            rng,
        }
    }

    /// Bound each generation call. `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.provider = self.provider.with_timeout(timeout);
        self
    }

    /// Handle one user input and return the reply shown to the user.
    ///
    /// The user turn is appended before generation starts. Dropping the
    /// returned future mid-generation therefore leaves the buffer holding
    /// the pending user turn and no bot turn.
    pub async fn respond(&mut self, input: &str) -> Reply {
        let input = input.trim();
        if let Err(e) = validate_input(input) {
            debug!(session_id = %self.id, error = %e, "Rejected input");
            return Reply::new(INVALID_INPUT_REPLY, Category::Error);
        }

        let history = self.buffer.snapshot();
        let resolution = self.resolver.resolve(input, &history, &mut self.context);
        info!(
            session_id = %self.id,
            topic = ?resolution.topic,
            category = %resolution.category,
            "Query resolved"
        );

        self.buffer
            .append(Turn::user(input, Some(resolution.category)));

        let answer = self
            .provider
            .answer(&resolution, input, &history, &mut self.rng)
            .await;

        let cleaned = self.filter.clean(&answer.text);
        let text = if answer.source != AnswerSource::Generated
            || self.filter.is_valid(&cleaned, input)
        {
            cleaned
        } else {
            debug!(session_id = %self.id, rejected = %cleaned, "Generated reply failed validation");
            self.filter.fallback(input, &mut self.rng).to_string()
        };

        self.buffer
            .append(Turn::bot(text.clone(), Some(answer.category)));

        Reply::new(text, answer.category)
    }

    /// Forget all turns and the current topic.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.context.clear();
        info!(session_id = %self.id, "Conversation cleared");
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Recorded turns, oldest first.
    pub fn history(&self) -> Vec<Turn> {
        self.buffer.snapshot()
    }

    pub fn buffer(&self) -> &ConversationBuffer {
        &self.buffer
    }

    pub fn current_topic(&self) -> Option<&str> {
        self.context.current_topic.as_deref()
    }

    pub fn generator(&self) -> &G {
        self.provider.generator()
    }

    /// Prompt the generator would receive for `input` right now.
    pub fn prompt_for(&self, input: &str) -> String {
        self.buffer.prompt(input.trim())
    }
}

fn validate_input(input: &str) -> Result<(), ChatError> {
    if input.is_empty() {
        return Err(ChatError::EmptyMessage);
    }
    if input.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(ChatError::MessageTooLong(MAX_MESSAGE_LENGTH));
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::MockGenerator;
    use crate::postprocess::{GENERAL_FALLBACKS, QUESTION_FALLBACKS};
    use crate::provider::GREETINGS;
    use crate::types::Role;

    fn session(mock: MockGenerator) -> ChatSession<MockGenerator> {
        ChatSession::new(
            Arc::new(Gazetteer::builtin()),
            mock,
            5,
            DecodingConfig::default(),
            StdRng::seed_from_u64(7),
        )
    }

    // ---- Input validation ----

    #[tokio::test]
    async fn test_empty_input_is_error_and_not_recorded() {
        let mut s = session(MockGenerator::new("unused"));
        let reply = s.respond("   ").await;
        assert_eq!(reply.category, Category::Error);
        assert_eq!(reply.text, INVALID_INPUT_REPLY);
        assert!(s.history().is_empty());
    }

    #[tokio::test]
    async fn test_message_too_long() {
        let mut s = session(MockGenerator::new("unused"));
        let reply = s.respond(&"a".repeat(MAX_MESSAGE_LENGTH + 1)).await;
        assert_eq!(reply.category, Category::Error);
        assert_eq!(reply.text, INVALID_INPUT_REPLY);
        assert!(s.history().is_empty());
    }

    #[tokio::test]
    async fn test_message_at_max_length_ok() {
        let mut s = session(MockGenerator::new("A perfectly fine generated reply."));
        let reply = s.respond(&"a".repeat(MAX_MESSAGE_LENGTH)).await;
        assert_ne!(reply.category, Category::Error);
        assert_eq!(s.history().len(), 2);
    }

    // ---- Factual turns ----

    #[tokio::test]
    async fn test_capital_question_end_to_end() {
        let mut s = session(MockGenerator::new("unused"));
        let reply = s.respond("What is the capital of Japan?").await;
        assert_eq!(reply.text, "The capital of Japan is Tokyo.");
        assert_eq!(reply.category, Category::Capital);

        let history = s.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].text, "What is the capital of Japan?");
        assert_eq!(history[0].category, Some(Category::Capital));
        assert_eq!(history[1].role, Role::Bot);
        assert_eq!(history[1].category, Some(Category::Capital));
        assert_eq!(s.current_topic(), Some("japan"));
    }

    #[tokio::test]
    async fn test_greeting_has_no_question_mark() {
        let mut s = session(MockGenerator::new("unused"));
        for _ in 0..10 {
            let reply = s.respond("Hello").await;
            assert_eq!(reply.category, Category::Greeting);
            assert!(!reply.text.contains('?'));
            assert!(GREETINGS
                .iter()
                .any(|g| ResponseFilter::default().clean(g) == reply.text));
        }
        assert!(s.generator().prompts().is_empty());
    }

    #[tokio::test]
    async fn test_follow_up_flow() {
        let mut s = session(MockGenerator::new("unused"));
        s.respond("capital of france").await;
        let reply = s.respond("what about italy").await;
        assert_eq!(reply.text, "The capital of Italy is Rome.");
        let reply = s.respond("what can tourists see there").await;
        assert!(reply.text.starts_with("Italy offers many famous attractions"));
        assert_eq!(reply.category, Category::Places);
    }

    // ---- Generated turns ----

    #[tokio::test]
    async fn test_generated_reply_is_cleaned() {
        let mock = MockGenerator::new("unused");
        mock.push_reply("Bot: Jokes are fun to tell. Here is one for you. And another.");
        let mut s = session(mock);
        let reply = s.respond("tell me a joke").await;
        assert_eq!(reply.text, "Jokes are fun to tell. Here is one for you.");
        assert_eq!(reply.category, Category::General);
    }

    #[tokio::test]
    async fn test_invalid_generated_reply_gets_fallback() {
        let mock = MockGenerator::new("unused");
        mock.push_reply("We need many helpful assistants for that question.");
        let mut s = session(mock);
        let reply = s.respond("why is the sky blue").await;
        assert!(QUESTION_FALLBACKS.contains(&reply.text.as_str()));
        assert_eq!(s.history()[1].text, reply.text);
    }

    #[tokio::test]
    async fn test_reply_is_validated_after_cleaning() {
        // The opener is stripped by cleaning, so the remainder is accepted.
        let mock = MockGenerator::new("unused");
        mock.push_reply("This person would be the one to ask.");
        let mut s = session(mock);
        let reply = s.respond("why is the sky blue").await;
        assert_eq!(reply.text, "the one to ask.");
        assert_eq!(reply.category, Category::General);
    }

    #[tokio::test]
    async fn test_echoing_reply_gets_general_fallback() {
        let mock = MockGenerator::new("unused");
        mock.push_reply("You want me to sing a song right now.");
        let mut s = session(mock);
        let reply = s.respond("sing a song").await;
        assert!(GENERAL_FALLBACKS.contains(&reply.text.as_str()));
    }

    #[tokio::test]
    async fn test_generation_failure_recorded_as_error() {
        let mock = MockGenerator::new("unused");
        mock.push_failure("backend exploded");
        let mut s = session(mock);
        let reply = s.respond("compose a haiku").await;
        assert_eq!(reply.category, Category::Error);
        assert_eq!(s.history()[1].category, Some(Category::Error));
    }

    #[tokio::test]
    async fn test_prompt_excludes_pending_turn() {
        let mut s = session(MockGenerator::new("Some generated words here."));
        s.respond("hello").await;
        s.respond("tell me a joke").await;
        let prompts = s.generator().prompts();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].matches("User: tell me a joke").count(), 1);
        assert!(prompts[0].contains("User: hello\nBot: "));
    }

    // ---- Cancellation ----

    #[tokio::test]
    async fn test_cancelled_generation_keeps_only_user_turn() {
        let mut s = session(MockGenerator::stalled());
        let outcome =
            tokio::time::timeout(Duration::from_millis(20), s.respond("write me a novel")).await;
        assert!(outcome.is_err());

        let history = s.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].text, "write me a novel");
    }

    // ---- Memory ----

    #[tokio::test]
    async fn test_buffer_window_is_bounded() {
        let mut s = ChatSession::new(
            Arc::new(Gazetteer::builtin()),
            MockGenerator::new("unused"),
            2,
            DecodingConfig::default(),
            StdRng::seed_from_u64(1),
        );
        for country in ["france", "spain", "japan", "china"] {
            s.respond(&format!("capital of {}", country)).await;
        }
        let history = s.history();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].text, "capital of japan");
        assert_eq!(history[3].text, "The capital of China is Beijing.");
    }

    #[tokio::test]
    async fn test_clear_resets_buffer_and_topic() {
        let mut s = session(MockGenerator::new("unused"));
        s.respond("capital of spain").await;
        assert_eq!(s.current_topic(), Some("spain"));
        s.clear();
        assert!(s.history().is_empty());
        assert!(s.current_topic().is_none());
        assert_eq!(s.buffer().capacity(), 10);
    }

    #[test]
    fn test_from_config_uses_memory_and_seed() {
        let mut config = ParleyConfig::default();
        config.memory.max_turns = 3;
        config.session.seed = Some(11);
        config.generation.timeout_secs = 5;
        let s = ChatSession::from_config(&config, Arc::new(Gazetteer::builtin()), MockGenerator::new("x"));
        assert_eq!(s.buffer().capacity(), 6);
        assert_ne!(s.id(), Uuid::nil());
    }

    #[test]
    fn test_prompt_for_uses_buffer() {
        let s = session(MockGenerator::new("x"));
        assert!(s.prompt_for("  hi  ").ends_with("User: hi\nAssistant:"));
    }
}
