//! Text-generation backends.
//!
//! - `OllamaGenerator` calls a local Ollama server over HTTP.
//! - `OfflineGenerator` has no model and always reports the backend as
//!   unavailable, so factual answers still work without a server.
//! - `MockGenerator` returns scripted replies for tests.

use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use parley_core::config::GenerationConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ChatError;

// =============================================================================
// Decoding configuration
// =============================================================================

/// Fixed decoding parameters sent with every generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodingConfig {
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub repetition_penalty: f32,
    /// Word n-gram size that may not repeat within one reply (0 disables).
    pub no_repeat_ngram_size: usize,
}

impl Default for DecodingConfig {
    fn default() -> Self {
        Self::from(&GenerationConfig::default())
    }
}

impl From<&GenerationConfig> for DecodingConfig {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            max_new_tokens: config.max_new_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            top_k: config.top_k,
            repetition_penalty: config.repetition_penalty,
            no_repeat_ngram_size: config.no_repeat_ngram_size,
        }
    }
}

// =============================================================================
// Trait
// =============================================================================

/// A backend that continues a prompt with generated text.
pub trait TextGenerator: Send + Sync {
    /// Generate a continuation of `prompt`.
    ///
    /// The returned text may or may not repeat the prompt; callers strip an
    /// echoed prefix themselves.
    fn generate(
        &self,
        prompt: &str,
        config: &DecodingConfig,
    ) -> impl Future<Output = Result<String, ChatError>> + Send;
}

// =============================================================================
// Ollama
// =============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    raw: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    num_predict: u32,
    temperature: f32,
    top_p: f32,
    top_k: u32,
    repeat_penalty: f32,
}

impl From<&DecodingConfig> for GenerateOptions {
    fn from(config: &DecodingConfig) -> Self {
        Self {
            num_predict: config.max_new_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            top_k: config.top_k,
            repeat_penalty: config.repetition_penalty,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

/// Ollama HTTP client using the raw `/api/generate` completion endpoint.
pub struct OllamaGenerator {
    http_client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OllamaGenerator {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, ChatError> {
        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            http_client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Check that the server answers and has the configured model pulled.
    pub async fn health_check(&self) -> Result<(), ChatError> {
        let url = format!("{}/api/tags", self.endpoint);
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| ChatError::BackendUnavailable(format!("{}: {}", self.endpoint, e)))?;

        if !response.status().is_success() {
            return Err(ChatError::BackendUnavailable(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }

        let tags: TagsResponse = response.json().await?;
        if !has_model(&tags.models, &self.model) {
            return Err(ChatError::BackendUnavailable(format!(
                "model '{}' is not available; run `ollama pull {}`",
                self.model, self.model
            )));
        }

        info!(endpoint = %self.endpoint, model = %self.model, "Generation backend ready");
        Ok(())
    }
}

fn has_model(models: &[ModelTag], wanted: &str) -> bool {
    let with_latest = format!("{}:latest", wanted);
    models
        .iter()
        .any(|m| m.name == wanted || m.name == with_latest)
}

impl TextGenerator for OllamaGenerator {
    async fn generate(&self, prompt: &str, config: &DecodingConfig) -> Result<String, ChatError> {
        let url = format!("{}/api/generate", self.endpoint);
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            raw: true,
            options: GenerateOptions::from(config),
        };

        debug!(model = %self.model, prompt_chars = prompt.len(), "Generation request");

        let response = self.http_client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Generation backend returned an error");
            return Err(ChatError::Generation(format!(
                "backend returned {}: {}",
                status, body
            )));
        }

        let body: GenerateResponse = response.json().await?;
        debug!(response_chars = body.response.len(), "Generation response");

        Ok(truncate_repeated_ngrams(
            &body.response,
            config.no_repeat_ngram_size,
        ))
    }
}

/// Cut `text` just before the word that would complete an n-gram already
/// seen earlier in the text. Comparison is case-insensitive.
pub fn truncate_repeated_ngrams(text: &str, n: usize) -> String {
    if n == 0 {
        return text.to_string();
    }
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() < n {
        return text.to_string();
    }

    let mut seen: HashSet<Vec<String>> = HashSet::new();
    for start in 0..=words.len() - n {
        let gram: Vec<String> = words[start..start + n]
            .iter()
            .map(|w| w.to_lowercase())
            .collect();
        if !seen.insert(gram) {
            return words[..start + n - 1].join(" ");
        }
    }
    text.to_string()
}

// =============================================================================
// Offline
// =============================================================================

/// Backend used when no model is configured.
#[derive(Debug, Clone, Default)]
pub struct OfflineGenerator;

impl TextGenerator for OfflineGenerator {
    async fn generate(&self, _prompt: &str, _config: &DecodingConfig) -> Result<String, ChatError> {
        Err(ChatError::BackendUnavailable(
            "no generation backend configured".to_string(),
        ))
    }
}

// =============================================================================
// Backend selection
// =============================================================================

/// Concrete backend chosen from configuration.
pub enum GeneratorBackend {
    Ollama(OllamaGenerator),
    Offline(OfflineGenerator),
}

impl GeneratorBackend {
    pub fn from_config(config: &GenerationConfig) -> Result<Self, ChatError> {
        match config.backend.as_str() {
            "ollama" => Ok(Self::Ollama(OllamaGenerator::new(
                config.endpoint.clone(),
                config.model.clone(),
                Duration::from_secs(config.request_timeout_secs),
            )?)),
            "offline" => Ok(Self::Offline(OfflineGenerator)),
            other => Err(ChatError::BackendUnavailable(format!(
                "unknown backend '{}'",
                other
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ollama(_) => "ollama",
            Self::Offline(_) => "offline",
        }
    }

    /// Verify the backend can serve requests. Offline always passes.
    pub async fn health_check(&self) -> Result<(), ChatError> {
        match self {
            Self::Ollama(g) => g.health_check().await,
            Self::Offline(_) => Ok(()),
        }
    }
}

impl TextGenerator for GeneratorBackend {
    async fn generate(&self, prompt: &str, config: &DecodingConfig) -> Result<String, ChatError> {
        match self {
            Self::Ollama(g) => g.generate(prompt, config).await,
            Self::Offline(g) => g.generate(prompt, config).await,
        }
    }
}

// =============================================================================
// Mock
// =============================================================================

/// Scripted generator for tests.
///
/// Queued outcomes are returned in order; once the queue is empty every call
/// returns the fallback reply. Prompts are recorded for inspection.
#[derive(Debug, Default)]
pub struct MockGenerator {
    script: Mutex<VecDeque<Result<String, String>>>,
    fallback: String,
    prompts: Mutex<Vec<String>>,
    stalled: bool,
}

impl MockGenerator {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            fallback: fallback.into(),
            ..Self::default()
        }
    }

    /// A generator whose calls never complete.
    pub fn stalled() -> Self {
        Self {
            stalled: true,
            ..Self::default()
        }
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.lock_script().push_back(Ok(reply.into()));
    }

    pub fn push_failure(&self, message: impl Into<String>) {
        self.lock_script().push_back(Err(message.into()));
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, String>>> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TextGenerator for MockGenerator {
    async fn generate(&self, prompt: &str, _config: &DecodingConfig) -> Result<String, ChatError> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());

        if self.stalled {
            std::future::pending::<()>().await;
        }

        let next = self.lock_script().pop_front();
        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(ChatError::Generation(message)),
            None => Ok(self.fallback.clone()),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Decoding config ----

    #[test]
    fn test_decoding_defaults() {
        let d = DecodingConfig::default();
        assert_eq!(d.max_new_tokens, 50);
        assert!((d.temperature - 0.3).abs() < f32::EPSILON);
        assert!((d.top_p - 0.85).abs() < f32::EPSILON);
        assert_eq!(d.top_k, 20);
        assert!((d.repetition_penalty - 1.5).abs() < f32::EPSILON);
        assert_eq!(d.no_repeat_ngram_size, 3);
    }

    #[test]
    fn test_request_serialization() {
        let config = DecodingConfig::default();
        let request = GenerateRequest {
            model: "llama3.2:1b",
            prompt: "User: hi\nAssistant:",
            stream: false,
            raw: true,
            options: GenerateOptions::from(&config),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "llama3.2:1b");
        assert_eq!(json["stream"], false);
        assert_eq!(json["raw"], true);
        assert_eq!(json["options"]["num_predict"], 50);
        assert_eq!(json["options"]["top_k"], 20);
    }

    #[test]
    fn test_response_deserialization_ignores_extra_fields() {
        let body = r#"{"model":"m","response":" Paris is lovely.","done":true}"#;
        let parsed: GenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.response, " Paris is lovely.");
    }

    #[test]
    fn test_has_model_accepts_latest_tag() {
        let tags: TagsResponse =
            serde_json::from_str(r#"{"models":[{"name":"phi3:latest"},{"name":"llama3.2:1b"}]}"#)
                .unwrap();
        assert!(has_model(&tags.models, "phi3"));
        assert!(has_model(&tags.models, "llama3.2:1b"));
        assert!(!has_model(&tags.models, "mistral"));
    }

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let g = OllamaGenerator::new("http://localhost:11434/", "m", Duration::from_secs(1)).unwrap();
        assert_eq!(g.endpoint(), "http://localhost:11434");
        assert_eq!(g.model(), "m");
    }

    // ---- N-gram constraint ----

    #[test]
    fn test_truncate_repeated_trigram() {
        let text = "the cat sat on the cat sat down";
        assert_eq!(truncate_repeated_ngrams(text, 3), "the cat sat on the cat");
    }

    #[test]
    fn test_truncate_is_case_insensitive() {
        assert_eq!(truncate_repeated_ngrams("Go to Rome and go to rome", 3), "Go to Rome and go to");
    }

    #[test]
    fn test_truncate_without_repeats_preserves_text() {
        let text = "Paris is  the capital.\nIt is lovely.";
        assert_eq!(truncate_repeated_ngrams(text, 3), text);
    }

    #[test]
    fn test_truncate_disabled_or_short() {
        assert_eq!(truncate_repeated_ngrams("a a a a", 0), "a a a a");
        assert_eq!(truncate_repeated_ngrams("a b", 3), "a b");
    }

    // ---- Backends ----

    #[tokio::test]
    async fn test_offline_generator_is_unavailable() {
        let result = OfflineGenerator.generate("x", &DecodingConfig::default()).await;
        assert!(matches!(result, Err(ChatError::BackendUnavailable(_))));
    }

    #[test]
    fn test_backend_from_config() {
        let mut config = GenerationConfig::default();
        assert_eq!(GeneratorBackend::from_config(&config).unwrap().name(), "ollama");
        config.backend = "offline".to_string();
        assert_eq!(GeneratorBackend::from_config(&config).unwrap().name(), "offline");
        config.backend = "gpt".to_string();
        assert!(GeneratorBackend::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_offline_backend_health_check_passes() {
        let backend = GeneratorBackend::Offline(OfflineGenerator);
        assert!(backend.health_check().await.is_ok());
        let result = backend.generate("x", &DecodingConfig::default()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_mock_generator_script_then_fallback() {
        let mock = MockGenerator::new("fallback text");
        mock.push_reply("first");
        mock.push_failure("boom");
        let cfg = DecodingConfig::default();

        assert_eq!(mock.generate("p1", &cfg).await.unwrap(), "first");
        assert!(matches!(mock.generate("p2", &cfg).await, Err(ChatError::Generation(_))));
        assert_eq!(mock.generate("p3", &cfg).await.unwrap(), "fallback text");
        assert_eq!(mock.prompts(), vec!["p1", "p2", "p3"]);
    }

    #[tokio::test]
    async fn test_mock_stalled_never_completes() {
        let mock = MockGenerator::stalled();
        let result = tokio::time::timeout(
            Duration::from_millis(20),
            mock.generate("p", &DecodingConfig::default()),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(mock.prompts().len(), 1);
    }
}
