//! Keyword tables and their compiled matchers.
//!
//! Every table is matched on word boundaries against lowercased text, so
//! "hi" does not fire inside "china" and "it" does not fire inside
//! "capital". Gazetteer topics are not matched here; see
//! [`crate::gazetteer::Gazetteer::first_mention`].

use regex::Regex;
use std::sync::LazyLock;

pub const GREETING_WORDS: &[&str] = &["hi", "hello", "hey"];

pub const FOLLOW_UP_PHRASES: &[&str] = &["what about", "how about", "what of", "and", "what is"];

pub const REFERENCE_PHRASES: &[&str] = &["there", "that place", "that country", "it"];

pub const CAPITAL_WORDS: &[&str] = &["capital", "capitol"];

pub const PLACES_WORDS: &[&str] = &[
    "visit",
    "places",
    "attractions",
    "see",
    "where",
    "tell me about",
    "things",
    "tourists",
];

pub const WH_WORDS: &[&str] = &["what", "where", "when", "why", "how"];

fn phrase_regex(phrases: &[&str]) -> Regex {
    let alts: Vec<String> = phrases
        .iter()
        .map(|p| regex::escape(p).replace(' ', r"\s+"))
        .collect();
    Regex::new(&format!(r"\b(?:{})\b", alts.join("|"))).expect("Invalid keyword regex")
}

pub(crate) static GREETING_RE: LazyLock<Regex> = LazyLock::new(|| phrase_regex(GREETING_WORDS));
pub(crate) static FOLLOW_UP_RE: LazyLock<Regex> =
    LazyLock::new(|| phrase_regex(FOLLOW_UP_PHRASES));
pub(crate) static REFERENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| phrase_regex(REFERENCE_PHRASES));
pub(crate) static CAPITAL_RE: LazyLock<Regex> = LazyLock::new(|| phrase_regex(CAPITAL_WORDS));
pub(crate) static PLACES_RE: LazyLock<Regex> = LazyLock::new(|| phrase_regex(PLACES_WORDS));
pub(crate) static WH_RE: LazyLock<Regex> = LazyLock::new(|| phrase_regex(WH_WORDS));

/// Whether lowercased `text` contains a greeting word.
pub fn is_greeting(text: &str) -> bool {
    GREETING_RE.is_match(text)
}

/// Whether lowercased `text` contains a wh-question word.
pub fn is_wh_question(text: &str) -> bool {
    WH_RE.is_match(text)
}
