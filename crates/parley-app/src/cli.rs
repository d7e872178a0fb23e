//! CLI argument definitions for the Parley chat binary.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use parley_core::config::ParleyConfig;
use std::path::{Path, PathBuf};

/// Parley: a terminal chatbot that remembers what you were talking about.
#[derive(Parser, Debug)]
#[command(name = "parley", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Model name served by the generation backend.
    #[arg(short = 'm', long = "model")]
    pub model: Option<String>,

    /// Base URL of the Ollama server.
    #[arg(short = 'e', long = "endpoint")]
    pub endpoint: Option<String>,

    /// Number of user/bot exchanges kept as conversation memory.
    #[arg(short = 'n', long = "memory-turns")]
    pub memory_turns: Option<usize>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Answer only from built-in knowledge; never contact a model server.
    #[arg(long = "offline")]
    pub offline: bool,

    /// Seed for reproducible greeting and fallback choices.
    #[arg(long = "seed")]
    pub seed: Option<u64>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > PARLEY_CONFIG env var > ~/.parley/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("PARLEY_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the model name.
    ///
    /// Priority: --model flag > PARLEY_MODEL env var > config file value.
    pub fn resolve_model(&self, config_model: &str) -> String {
        flag_or_env(self.model.as_deref(), "PARLEY_MODEL").unwrap_or_else(|| config_model.to_string())
    }

    /// Resolve the backend endpoint.
    ///
    /// Priority: --endpoint flag > PARLEY_ENDPOINT env var > config file value.
    pub fn resolve_endpoint(&self, config_endpoint: &str) -> String {
        flag_or_env(self.endpoint.as_deref(), "PARLEY_ENDPOINT")
            .unwrap_or_else(|| config_endpoint.to_string())
    }

    /// Resolve the backend name. `--offline` forces the offline backend.
    pub fn resolve_backend(&self, config_backend: &str) -> String {
        if self.offline {
            "offline".to_string()
        } else {
            config_backend.to_string()
        }
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }

    /// Load the configuration file, apply CLI overrides and validate.
    ///
    /// A missing file is created with defaults; a malformed one is an error.
    /// Returns the configuration and whether the file was created.
    pub fn load_config(&self, path: &Path) -> parley_core::Result<(ParleyConfig, bool)> {
        let (mut config, created) = ParleyConfig::load_or_init(path)?;
        self.apply(&mut config);
        config.validate()?;
        Ok((config, created))
    }

    /// Apply every CLI override to a loaded configuration.
    pub fn apply(&self, config: &mut ParleyConfig) {
        config.generation.model = self.resolve_model(&config.generation.model);
        config.generation.endpoint = self.resolve_endpoint(&config.generation.endpoint);
        config.generation.backend = self.resolve_backend(&config.generation.backend);
        config.general.log_level = self.resolve_log_level(&config.general.log_level);
        if let Some(turns) = self.memory_turns {
            config.memory.max_turns = turns;
        }
        if self.seed.is_some() {
            config.session.seed = self.seed;
        }
    }
}

fn flag_or_env(flag: Option<&str>, var: &str) -> Option<String> {
    flag.map(str::to_string)
        .or_else(|| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".parley").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".parley").join("config.toml");
    }
    PathBuf::from("config.toml")
}
