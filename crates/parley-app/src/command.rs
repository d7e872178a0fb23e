//! Slash commands recognized at the chat prompt.

pub const HELP_TEXT: &str = "\
Available commands:
  /help   Show this list
  /clear  Forget the conversation so far
  /exit   Quit Parley";

/// A slash command typed instead of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Exit,
    Clear,
    Help,
    /// Any other `/`-prefixed input, lowercased.
    Unknown(String),
}

impl Command {
    /// Parse trimmed input. Returns `None` for ordinary messages.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if !input.starts_with('/') {
            return None;
        }

        let name = input.to_lowercase();
        Some(match name.as_str() {
            "/exit" | "/quit" => Self::Exit,
            "/clear" => Self::Clear,
            "/help" => Self::Help,
            _ => Self::Unknown(name),
        })
    }
}
