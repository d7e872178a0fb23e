//! Sliding-window conversation memory and prompt construction.

use std::collections::VecDeque;

use crate::types::Turn;

/// Fixed preamble placed ahead of every generation prompt.
pub const PROMPT_PREAMBLE: &str = "The following is a conversation with an AI assistant. \
The assistant is helpful, knowledgeable, and direct.\n\n";

// =============================================================================
// ConversationBuffer
// =============================================================================

/// Fixed-capacity, chronologically ordered log of turns.
///
/// Holds `2 * exchanges` turns (one user and one bot turn per exchange).
/// Appending to a full buffer evicts the oldest turn.
#[derive(Debug, Clone)]
pub struct ConversationBuffer {
    turns: VecDeque<Turn>,
    capacity: usize,
}

impl ConversationBuffer {
    /// Create a buffer remembering `exchanges` user/bot pairs.
    pub fn new(exchanges: usize) -> Self {
        Self::with_capacity(exchanges.saturating_mul(2))
    }

    /// Create a buffer holding at most `capacity` turns.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            turns: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn append(&mut self, turn: Turn) {
        if self.capacity == 0 {
            return;
        }
        if self.turns.len() == self.capacity {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
    }

    /// Ordered copy of the buffer, newest last.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn size(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Render the buffer as newline-joined `Role: message` lines.
    pub fn context(&self) -> String {
        render_history(self.turns.iter())
    }

    /// Build a generation prompt from the buffered history and a new input.
    pub fn prompt(&self, new_input: &str) -> String {
        build_prompt(self.turns.iter(), new_input)
    }
}

// =============================================================================
// Prompt construction
// =============================================================================

/// Render turns as `Role: message` lines joined by newlines.
pub fn render_history<'a>(turns: impl IntoIterator<Item = &'a Turn>) -> String {
    turns
        .into_iter()
        .map(|t| format!("{}: {}", t.role.label(), t.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Assemble preamble, history and the trailing `User:`/`Assistant:` cue.
pub fn build_prompt<'a>(history: impl IntoIterator<Item = &'a Turn>, new_input: &str) -> String {
    let context = render_history(history);
    if context.is_empty() {
        format!("{PROMPT_PREAMBLE}User: {new_input}\nAssistant:")
    } else {
        format!("{PROMPT_PREAMBLE}{context}\nUser: {new_input}\nAssistant:")
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, Role};

    fn user(text: &str) -> Turn {
        Turn::user(text, None)
    }

    // ---- Capacity and eviction ----

    #[test]
    fn test_new_buffer_capacity_is_twice_exchanges() {
        let buf = ConversationBuffer::new(5);
        assert_eq!(buf.capacity(), 10);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_append_within_capacity_keeps_all() {
        let mut buf = ConversationBuffer::with_capacity(4);
        buf.append(user("a"));
        buf.append(user("b"));
        assert_eq!(buf.size(), 2);
    }

    #[test]
    fn test_overflow_keeps_most_recent_in_order() {
        let mut buf = ConversationBuffer::with_capacity(3);
        for i in 0..7 {
            buf.append(user(&format!("turn {}", i)));
        }
        let texts: Vec<String> = buf.snapshot().into_iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["turn 4", "turn 5", "turn 6"]);
    }

    #[test]
    fn test_size_never_exceeds_capacity() {
        let mut buf = ConversationBuffer::new(2);
        for i in 0..25 {
            buf.append(user(&i.to_string()));
            assert!(buf.size() <= buf.capacity());
        }
        assert_eq!(buf.size(), 4);
    }

    #[test]
    fn test_zero_capacity_stays_empty() {
        let mut buf = ConversationBuffer::with_capacity(0);
        buf.append(user("dropped"));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut buf = ConversationBuffer::new(3);
        buf.append(user("a"));
        buf.clear();
        assert_eq!(buf.size(), 0);
        assert_eq!(buf.capacity(), 6);
    }

    #[test]
    fn test_snapshot_is_detached_copy() {
        let mut buf = ConversationBuffer::new(2);
        buf.append(user("first"));
        let snap = buf.snapshot();
        buf.append(user("second"));
        assert_eq!(snap.len(), 1);
        assert_eq!(buf.size(), 2);
    }

    // ---- Context and prompt ----

    #[test]
    fn test_context_empty_buffer() {
        assert_eq!(ConversationBuffer::new(1).context(), "");
    }

    #[test]
    fn test_context_lines_use_role_labels() {
        let mut buf = ConversationBuffer::new(2);
        buf.append(Turn::user("capital of france", Some(Category::Capital)));
        buf.append(Turn::new(Role::Bot, "The capital of France is Paris.", None));
        assert_eq!(
            buf.context(),
            "User: capital of france\nBot: The capital of France is Paris."
        );
    }

    #[test]
    fn test_prompt_without_history() {
        let buf = ConversationBuffer::new(2);
        let prompt = buf.prompt("tell me a joke");
        assert_eq!(
            prompt,
            "The following is a conversation with an AI assistant. The assistant is helpful, \
             knowledgeable, and direct.\n\nUser: tell me a joke\nAssistant:"
        );
    }

    #[test]
    fn test_prompt_with_history() {
        let mut buf = ConversationBuffer::new(2);
        buf.append(user("hello"));
        buf.append(Turn::bot("Hi there!", Some(Category::Greeting)));
        let prompt = buf.prompt("how are you");
        assert!(prompt.starts_with(PROMPT_PREAMBLE));
        assert!(prompt.ends_with("User: hello\nBot: Hi there!\nUser: how are you\nAssistant:"));
    }
}
