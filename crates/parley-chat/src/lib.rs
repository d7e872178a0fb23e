//! Conversational engine for Parley.
//!
//! Resolves follow-up questions against a bounded conversation memory,
//! answers capital and sightseeing questions from a gazetteer, and falls back
//! to a text-generation backend for everything else.

pub mod buffer;
pub mod error;
pub mod gazetteer;
pub mod generator;
pub mod keywords;
pub mod postprocess;
pub mod provider;
pub mod resolver;
pub mod session;
pub mod types;

pub use buffer::{build_prompt, render_history, ConversationBuffer};
pub use error::ChatError;
pub use gazetteer::{Gazetteer, TopicEntry};
pub use generator::{
    DecodingConfig, GeneratorBackend, MockGenerator, OfflineGenerator, OllamaGenerator,
    TextGenerator,
};
pub use postprocess::ResponseFilter;
pub use provider::{Answer, AnswerProvider, AnswerSource};
pub use resolver::{QueryResolver, QuerySignals};
pub use session::ChatSession;
pub use types::{Category, Reply, Resolution, Role, SessionContext, Turn};
