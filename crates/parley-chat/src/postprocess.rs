//! Reply cleanup and plausibility checks.
//!
//! Strips prompt artifacts from generated text, keeps the first coherent
//! sentences, rejects replies that look meaningless, and picks a
//! context-aware fallback when a reply is rejected.

use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use std::sync::LazyLock;

use crate::keywords::{is_greeting, is_wh_question};

/// Substituted when no sentence survives cleanup.
pub const NEED_MORE_CONTEXT: &str =
    "I apologize, but I need more context to provide a meaningful response.";

/// Substituted when the raw text is empty.
pub const EMPTY_RESPONSE: &str = "I apologize, but I'm having trouble generating a response.";

pub const GREETING_FALLBACKS: &[&str] = &[
    "Hello! How can I help you today?",
    "Hi there! What can I assist you with?",
    "Greetings! How may I help you?",
    "Hello! Feel free to ask me anything.",
];

pub const QUESTION_FALLBACKS: &[&str] = &[
    "I apologize, but I need more information to answer that question accurately.",
    "That's an interesting question. Could you provide more details?",
    "I want to give you an accurate answer. Could you be more specific?",
    "I'm not entirely sure about that. Could you rephrase your question?",
];

pub const GENERAL_FALLBACKS: &[&str] = &[
    "I understand, but could you rephrase that? I want to make sure I give you a helpful response.",
    "I'm not sure I fully understood. Could you explain in a different way?",
    "Could you provide more context? That would help me give a better response.",
    "I want to help, but I need a bit more clarity. Could you elaborate?",
];

// =============================================================================
// Compiled patterns
// =============================================================================

static ARTIFACT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Bracketed asides
        r"\[.*?\]",
        // Role labels
        r"Bot:",
        r"User:",
        r"Human:",
        r"Assistant:",
        r"System:",
        // Prompt echoes
        r"(?s)Instructions:.*?\n\n",
        r"(?s)Example interactions:.*?Current conversation:",
        r"The following is a conversation with an AI assistant\.",
        r"The assistant is helpful, knowledgeable, and direct\.",
        // Common irrelevant openers
        r"This person would be",
        r"No other word for",
        r"Or do anyone",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid artifact regex"))
    .collect()
});

static MEANINGLESS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"would be the",
        r"this person",
        r"no other word",
        r"or do anyone",
        r"use your email",
        r"social media accounts",
        r"let's start by",
        r"looking at how",
        r"have to talk about",
        r"speaking (?:french|spanish|english)",
        r"interaction has taken",
        r"need .* assistants",
        r"someone named",
        r"different countries",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid meaningless-response regex"))
    .collect()
});

// A terminator run ends a sentence only when followed by whitespace or the
// end of text, so "D.C." and "3.5" stay intact.
static SENTENCE_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+(?:\s+|$)").expect("Invalid sentence regex"));

// =============================================================================
// ResponseFilter
// =============================================================================

/// Cleans and validates replies before they are shown and recorded.
#[derive(Debug, Clone)]
pub struct ResponseFilter {
    /// Number of sentences kept from a cleaned reply.
    pub max_sentences: usize,
    /// Minimum words for a fragment to count as a sentence.
    pub min_sentence_words: usize,
}

impl Default for ResponseFilter {
    fn default() -> Self {
        Self {
            max_sentences: 2,
            min_sentence_words: 3,
        }
    }
}

impl ResponseFilter {
    /// Strip artifacts, collapse whitespace and keep the first coherent
    /// sentences, each terminated with a period.
    pub fn clean(&self, raw_text: &str) -> String {
        if raw_text.trim().is_empty() {
            return EMPTY_RESPONSE.to_string();
        }

        let mut text = raw_text.to_string();
        for re in ARTIFACT_PATTERNS.iter() {
            text = re.replace_all(&text, "").into_owned();
        }
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");

        let sentences: Vec<&str> = SENTENCE_END_RE
            .split(&text)
            .map(str::trim)
            .filter(|s| s.split_whitespace().count() >= self.min_sentence_words)
            .take(self.max_sentences)
            .collect();

        if sentences.is_empty() {
            NEED_MORE_CONTEXT.to_string()
        } else {
            format!("{}.", sentences.join(". "))
        }
    }

    /// Whether `response` is a plausible answer to `user_input`.
    pub fn is_valid(&self, response: &str, user_input: &str) -> bool {
        if response.split_whitespace().count() < 3 {
            return false;
        }

        let response_lower = response.to_lowercase();
        let input_lower = user_input.trim().to_lowercase();

        if response_lower.contains(&input_lower) {
            return false;
        }

        if MEANINGLESS_PATTERNS
            .iter()
            .any(|re| re.is_match(&response_lower))
        {
            return false;
        }

        if response.contains('?') && (is_wh_question(&input_lower) || is_greeting(&input_lower)) {
            return false;
        }

        true
    }

    /// Pick a fallback for a rejected reply: clarifying request for
    /// questions, greeting for greetings, generic rephrase request otherwise.
    pub fn fallback<R: Rng + ?Sized>(&self, user_input: &str, rng: &mut R) -> &'static str {
        let input_lower = user_input.to_lowercase();
        let bucket = if is_wh_question(&input_lower) {
            QUESTION_FALLBACKS
        } else if is_greeting(&input_lower) {
            GREETING_FALLBACKS
        } else {
            GENERAL_FALLBACKS
        };
        bucket.choose(rng).copied().unwrap_or(NEED_MORE_CONTEXT)
    }
}

// =============================================================================
// Tests
// =============================================================================
