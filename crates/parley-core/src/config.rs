use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ParleyError, Result};

/// Backends accepted in `[generation] backend`.
pub const SUPPORTED_BACKENDS: &[&str] = &["ollama", "offline"];

/// Top-level configuration for the Parley chatbot.
///
/// Loaded from `~/.parley/config.toml` by default. Every section falls back
/// to its defaults when missing from the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParleyConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

impl ParleyConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ParleyConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Load configuration for startup.
    ///
    /// A missing file is created with defaults. An existing file that cannot
    /// be read, parsed or validated is an error and is left untouched.
    /// Returns the configuration and whether the file was created.
    pub fn load_or_init(path: &Path) -> Result<(Self, bool)> {
        if path.exists() {
            return Ok((Self::load(path)?, false));
        }
        let config = Self::default();
        config.save(path)?;
        Ok((config, true))
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.memory.max_turns == 0 {
            return Err(ParleyError::Config(
                "memory.max_turns must be at least 1".to_string(),
            ));
        }
        let generation = &self.generation;
        if !SUPPORTED_BACKENDS.contains(&generation.backend.as_str()) {
            return Err(ParleyError::Config(format!(
                "unknown generation backend '{}' (expected one of: {})",
                generation.backend,
                SUPPORTED_BACKENDS.join(", ")
            )));
        }
        if generation.max_new_tokens == 0 {
            return Err(ParleyError::Config(
                "generation.max_new_tokens must be at least 1".to_string(),
            ));
        }
        if generation.temperature < 0.0 {
            return Err(ParleyError::Config(
                "generation.temperature must not be negative".to_string(),
            ));
        }
        if !(generation.top_p > 0.0 && generation.top_p <= 1.0) {
            return Err(ParleyError::Config(
                "generation.top_p must be in (0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

/// Conversation memory configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Number of user/bot exchanges to remember. The buffer holds twice
    /// this many turns.
    pub max_turns: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self { max_turns: 5 }
    }
}

/// Text-generation backend and decoding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Backend: "ollama" or "offline".
    pub backend: String,
    /// Base URL of the generation server.
    pub endpoint: String,
    /// Model name passed to the backend.
    pub model: String,
    /// Upper bound on generated tokens per reply.
    pub max_new_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus sampling threshold.
    pub top_p: f32,
    /// Top-k sampling cutoff.
    pub top_k: u32,
    /// Penalty applied to repeated tokens.
    pub repetition_penalty: f32,
    /// Size of word n-grams that may not repeat in a reply (0 disables).
    pub no_repeat_ngram_size: usize,
    /// Overall time limit for one generation in seconds (0 = unbounded).
    pub timeout_secs: u64,
    /// HTTP client timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            backend: "ollama".to_string(),
            endpoint: "http://127.0.0.1:11434".to_string(),
            model: "llama3.2:1b".to_string(),
            max_new_tokens: 50,
            temperature: 0.3,
            top_p: 0.85,
            top_k: 20,
            repetition_penalty: 1.5,
            no_repeat_ngram_size: 3,
            timeout_secs: 0,
            request_timeout_secs: 120,
        }
    }
}

/// Static knowledge (gazetteer) configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Optional TOML gazetteer replacing the built-in table.
    pub gazetteer_path: Option<String>,
}

/// Per-session settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seed for the reply randomizer. Unset means seeded from entropy.
    pub seed: Option<u64>,
}
