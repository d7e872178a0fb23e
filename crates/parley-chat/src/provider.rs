//! Answer selection: canned greetings, gazetteer facts, or generated text.

use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, warn};

use crate::buffer::build_prompt;
use crate::error::ChatError;
use crate::gazetteer::Gazetteer;
use crate::generator::{DecodingConfig, TextGenerator};
use crate::types::{Category, Resolution, Turn};

pub const GREETINGS: &[&str] = &[
    "Hello! How can I help you today?",
    "Hi there! What can I assist you with?",
    "Greetings! How may I help you?",
];

pub const INVALID_INPUT_REPLY: &str =
    "I'm sorry, I didn't receive a valid question. Could you please rephrase?";
pub const MODEL_NOT_LOADED_REPLY: &str =
    "I apologize, but I need the model to be loaded first. Please try again.";
pub const GENERATION_FAILED_REPLY: &str =
    "I apologize, but I'm having trouble generating a response right now.";
pub const EMPTY_GENERATION_REPLY: &str =
    "I'm not sure how to answer that. Could you please rephrase?";

/// Where an answer's text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerSource {
    Greeting,
    Factual,
    Generated,
    /// Fixed apology or clarification text.
    Canned,
}

/// Text chosen for a turn together with its category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub category: Category,
    pub source: AnswerSource,
}

impl Answer {
    fn new(text: impl Into<String>, category: Category, source: AnswerSource) -> Self {
        Self {
            text: text.into(),
            category,
            source,
        }
    }

    fn error(text: &str) -> Self {
        Self::new(text, Category::Error, AnswerSource::Canned)
    }
}

// =============================================================================
// AnswerProvider
// =============================================================================

/// Picks the answer for a resolved query.
pub struct AnswerProvider<G> {
    gazetteer: Arc<Gazetteer>,
    generator: G,
    decoding: DecodingConfig,
    timeout: Option<Duration>,
}

impl<G: TextGenerator> AnswerProvider<G> {
    pub fn new(gazetteer: Arc<Gazetteer>, generator: G, decoding: DecodingConfig) -> Self {
        Self {
            gazetteer,
            generator,
            decoding,
            timeout: None,
        }
    }

    /// Bound each generation call. `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Answer `raw_input` given its resolution.
    ///
    /// Greetings come from a fixed set, capital and places questions about
    /// known topics from the gazetteer, and everything else from the
    /// generator prompted with `history`. Generation failures are reported
    /// as category `error` with an apology, never as an `Err`.
    pub async fn answer<R: Rng + ?Sized>(
        &self,
        resolution: &Resolution,
        raw_input: &str,
        history: &[Turn],
        rng: &mut R,
    ) -> Answer {
        if raw_input.trim().is_empty() {
            return Answer::error(INVALID_INPUT_REPLY);
        }

        if let Some(answer) = self.fixed_answer(resolution, rng) {
            return answer;
        }

        self.generate(raw_input, history, resolution.category).await
    }

    fn fixed_answer<R: Rng + ?Sized>(&self, resolution: &Resolution, rng: &mut R) -> Option<Answer> {
        let topic = resolution.topic.as_deref();
        match resolution.category {
            Category::Greeting => GREETINGS
                .choose(rng)
                .map(|g| Answer::new(*g, Category::Greeting, AnswerSource::Greeting)),
            Category::Capital => topic
                .and_then(|t| self.gazetteer.capital(t))
                .map(|text| Answer::new(text, Category::Capital, AnswerSource::Factual)),
            Category::Places => topic
                .and_then(|t| self.gazetteer.places(t))
                .map(|text| Answer::new(text, Category::Places, AnswerSource::Factual)),
            Category::General | Category::Error => None,
        }
    }

    async fn generate(&self, raw_input: &str, history: &[Turn], category: Category) -> Answer {
        let prompt = build_prompt(history, raw_input);

        match self.generate_text(&prompt).await {
            Ok(text) => {
                let continuation = strip_prompt_echo(&prompt, &text);
                if continuation.is_empty() {
                    debug!("Backend returned an empty continuation");
                    Answer::new(EMPTY_GENERATION_REPLY, category, AnswerSource::Canned)
                } else {
                    Answer::new(continuation, category, AnswerSource::Generated)
                }
            }
            Err(ChatError::BackendUnavailable(reason)) => {
                warn!(reason = %reason, "Generation backend unavailable");
                Answer::error(MODEL_NOT_LOADED_REPLY)
            }
            Err(e) => {
                warn!(error = %e, "Text generation failed");
                Answer::error(GENERATION_FAILED_REPLY)
            }
        }
    }

    async fn generate_text(&self, prompt: &str) -> Result<String, ChatError> {
        let call = self.generator.generate(prompt, &self.decoding);
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| ChatError::Timeout(limit))?,
            None => call.await,
        }
    }
}

/// Remove an echoed prompt from the start of a continuation and trim it.
pub fn strip_prompt_echo<'a>(prompt: &str, text: &'a str) -> &'a str {
    text.strip_prefix(prompt).unwrap_or(text).trim()
}

// =============================================================================
// Tests
// =============================================================================
