//! Shared types for the conversational engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    User,
    Bot,
}

impl Role {
    /// Label used when the turn is rendered into a prompt.
    pub fn label(self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Bot => "Bot",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Inferred intent class of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Capital,
    Places,
    Greeting,
    General,
    Error,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Capital => "capital",
            Category::Places => "places",
            Category::Greeting => "greeting",
            Category::General => "general",
            Category::Error => "error",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single entry in the conversation log. Never mutated after it is
/// appended to a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub category: Option<Category>,
}

impl Turn {
    pub fn new(role: Role, text: impl Into<String>, category: Option<Category>) -> Self {
        Self {
            role,
            text: text.into(),
            category,
        }
    }

    pub fn user(text: impl Into<String>, category: Option<Category>) -> Self {
        Self::new(Role::User, text, category)
    }

    pub fn bot(text: impl Into<String>, category: Option<Category>) -> Self {
        Self::new(Role::Bot, text, category)
    }
}

/// Most recently disambiguated subject of the conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub current_topic: Option<String>,
}

impl SessionContext {
    pub fn with_topic(topic: impl Into<String>) -> Self {
        Self {
            current_topic: Some(topic.into()),
        }
    }

    pub fn clear(&mut self) {
        self.current_topic = None;
    }
}

/// Outcome of query resolution: what the user is asking about and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub topic: Option<String>,
    pub category: Category,
}

impl Resolution {
    pub fn new(topic: Option<String>, category: Category) -> Self {
        Self { topic, category }
    }

    pub fn general() -> Self {
        Self::new(None, Category::General)
    }
}

/// Text produced for a turn, before or after post-processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub category: Category,
}

impl Reply {
    pub fn new(text: impl Into<String>, category: Category) -> Self {
        Self {
            text: text.into(),
            category,
        }
    }
}
