//! Turn-by-turn query resolution.
//!
//! Decides which topic the user is asking about and which answer category
//! applies, resolving follow-ups ("what about italy", "what about there")
//! against earlier turns and the session's current topic.

use std::sync::Arc;

use tracing::debug;

use crate::gazetteer::Gazetteer;
use crate::keywords::{CAPITAL_RE, FOLLOW_UP_RE, GREETING_RE, PLACES_RE, REFERENCE_RE};
use crate::types::{Category, Resolution, SessionContext, Turn};

/// Keyword signals detected in a single normalized input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuerySignals {
    pub is_follow_up: bool,
    pub has_reference: bool,
    pub wants_capital: bool,
    pub wants_places: bool,
}

impl QuerySignals {
    /// Detect signals in lowercased, trimmed text.
    pub fn detect(text: &str) -> Self {
        Self {
            is_follow_up: FOLLOW_UP_RE.is_match(text),
            has_reference: REFERENCE_RE.is_match(text),
            wants_capital: CAPITAL_RE.is_match(text),
            wants_places: PLACES_RE.is_match(text),
        }
    }

    /// Category explicitly requested by the current input, capital first.
    pub fn explicit_category(&self) -> Option<Category> {
        if self.wants_capital {
            Some(Category::Capital)
        } else if self.wants_places {
            Some(Category::Places)
        } else {
            None
        }
    }
}

// =============================================================================
// QueryResolver
// =============================================================================

/// Gazetteer-driven resolver for topic and category.
#[derive(Debug, Clone)]
pub struct QueryResolver {
    gazetteer: Arc<Gazetteer>,
}

impl QueryResolver {
    pub fn new(gazetteer: Arc<Gazetteer>) -> Self {
        Self { gazetteer }
    }

    /// Resolve `input` against prior turns (oldest first) and the session
    /// context.
    ///
    /// Updates `context.current_topic` whenever a topic is settled.
    /// Precedence, first match wins:
    /// 1. Greeting keyword: greeting, no topic.
    /// 2. Follow-up or reference with history: topic recovered from the
    ///    input, the context or the history; category from the input, else
    ///    from history (capital preferred).
    /// 3. Topic named in the input (or adopted from context for a
    ///    reference): category from the input, else the latest capital or
    ///    places turn, else places.
    /// 4. General.
    pub fn resolve(
        &self,
        input: &str,
        history: &[Turn],
        context: &mut SessionContext,
    ) -> Resolution {
        let text = input.trim().to_lowercase();

        if GREETING_RE.is_match(&text) {
            return Resolution::new(None, Category::Greeting);
        }

        let signals = QuerySignals::detect(&text);
        let mut mentioned = self.gazetteer.first_mention(&text).map(str::to_string);

        if signals.has_reference && mentioned.is_none() {
            mentioned = context.current_topic.clone();
        }

        if (signals.is_follow_up || signals.has_reference) && !history.is_empty() {
            if let Some(resolution) =
                self.resolve_from_history(&signals, mentioned.as_deref(), history, context)
            {
                debug!(
                    topic = ?resolution.topic,
                    category = %resolution.category,
                    "Resolved follow-up from history"
                );
                return resolution;
            }
        }

        if let Some(topic) = mentioned {
            context.current_topic = Some(topic.clone());
            let category = signals
                .explicit_category()
                .or_else(|| latest_topical_category(history))
                .unwrap_or(Category::Places);
            debug!(topic = %topic, category = %category, "Resolved topic from input");
            return Resolution::new(Some(topic), category);
        }

        Resolution::general()
    }

    /// Recover topic and category by scanning history newest to oldest.
    ///
    /// Returns `None` when no topic or no category could be settled, in
    /// which case resolution continues with the input alone.
    fn resolve_from_history(
        &self,
        signals: &QuerySignals,
        mentioned: Option<&str>,
        history: &[Turn],
        context: &mut SessionContext,
    ) -> Option<Resolution> {
        let explicit = signals.explicit_category();
        let mut last_place = mentioned
            .map(str::to_string)
            .or_else(|| context.current_topic.clone());
        let mut last_category: Option<Category> = None;

        for turn in history.iter().rev() {
            if turn.text.is_empty() {
                continue;
            }

            if explicit.is_none() {
                if turn.category == Some(Category::Capital) {
                    last_category = Some(Category::Capital);
                    if last_place.is_some() {
                        break;
                    }
                } else if last_category.is_none() && turn.category.is_some() {
                    last_category = turn.category;
                }
            }

            if last_place.is_none() {
                let lowered = turn.text.to_lowercase();
                if let Some(topic) = self.gazetteer.first_mention(&lowered) {
                    context.current_topic = Some(topic.to_string());
                    last_place = Some(topic.to_string());
                }
            }
        }

        let place = last_place?;
        context.current_topic = Some(place.clone());
        explicit
            .or(last_category)
            .map(|category| Resolution::new(Some(place), category))
    }
}

/// Category of the newest turn that asked for a capital or places.
fn latest_topical_category(history: &[Turn]) -> Option<Category> {
    history.iter().rev().find_map(|turn| match turn.category {
        Some(c @ (Category::Capital | Category::Places)) => Some(c),
        _ => None,
    })
}

// =============================================================================
// Tests
// =============================================================================
