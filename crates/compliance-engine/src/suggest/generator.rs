//! External clause generation
//!
//! The provider only sees the [`ClauseGenerator`] trait. The production
//! implementation talks to an OpenAI-compatible chat-completions endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Default chat-completions endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Default model name
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

const SYSTEM_MESSAGE: &str = "You are a skilled legal drafting assistant.";
const TEMPERATURE: f32 = 0.2;
const MAX_TOKENS: u32 = 450;

/// Failures of the external generation path.
///
/// These never reach callers of the text provider; they select the template
/// fallback and are logged.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Clause generation is not configured")]
    NotConfigured,

    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Generation service returned HTTP {0}")]
    Status(u16),

    #[error("Malformed generation response: {0}")]
    Malformed(String),

    #[error("Generation service returned no text")]
    Empty,

    #[error("Generation timed out after {0}ms")]
    Timeout(u64),
}

/// What the generator is asked to draft
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationPrompt {
    pub clause: String,
    pub context: Option<String>,
}

impl GenerationPrompt {
    pub fn new(clause: &str, context: Option<&str>) -> Self {
        Self {
            clause: clause.to_string(),
            context: context.map(String::from),
        }
    }

    pub fn system_message(&self) -> &'static str {
        SYSTEM_MESSAGE
    }

    pub fn user_message(&self) -> String {
        let context = match self.context.as_deref() {
            Some(c) if !c.is_empty() => c,
            _ => "No context provided.",
        };
        format!(
            "Draft a clear legal clause titled '{}'. Context: {}\n\nWrite a concise, professional clause suitable for inclusion in a contract.",
            self.clause, context
        )
    }
}

/// A source of freshly drafted clause text
#[async_trait]
pub trait ClauseGenerator: Send + Sync {
    async fn generate(&self, prompt: &GenerationPrompt) -> Result<String, GenerationError>;
}

/// Generator settings, normally read from the environment
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub api_key: Option<String>,
    pub enabled: bool,
    pub model: String,
    pub endpoint: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            enabled: true,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

impl GeneratorConfig {
    /// Load configuration from environment variables
    ///
    /// Expected variables:
    /// - OPENAI_API_KEY: credential (generation is off without it)
    /// - CLAUSE_GENERATION_ENABLED: "false"/"0"/"no"/"off" disables generation
    /// - CLAUSE_GENERATION_MODEL: model name (default: gpt-3.5-turbo)
    /// - CLAUSE_GENERATION_URL: chat-completions endpoint
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`GeneratorConfig::from_env`] with an injectable variable source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let enabled = match lookup("CLAUSE_GENERATION_ENABLED") {
            Some(flag) => !matches!(
                flag.trim().to_lowercase().as_str(),
                "false" | "0" | "no" | "off"
            ),
            None => defaults.enabled,
        };

        Self {
            api_key: lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty()),
            enabled,
            model: lookup("CLAUSE_GENERATION_MODEL")
                .filter(|m| !m.trim().is_empty())
                .unwrap_or(defaults.model),
            endpoint: lookup("CLAUSE_GENERATION_URL")
                .filter(|u| !u.trim().is_empty())
                .unwrap_or(defaults.endpoint),
        }
    }

    /// Credential present and availability flag on
    pub fn is_configured(&self) -> bool {
        self.enabled && self.api_key.is_some()
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Extract the first choice's text from a chat-completions body
pub fn parse_completion(body: &str) -> Result<String, GenerationError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| GenerationError::Malformed(e.to_string()))?;

    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .unwrap_or_default();

    if text.is_empty() {
        Err(GenerationError::Empty)
    } else {
        Ok(text)
    }
}

/// Chat-completions client
pub struct OpenAiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiGenerator {
    pub fn new(config: &GeneratorConfig) -> Result<Self, GenerationError> {
        let api_key = match (&config.api_key, config.enabled) {
            (Some(key), true) => key.clone(),
            _ => return Err(GenerationError::NotConfigured),
        };

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| GenerationError::Client(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ClauseGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &GenerationPrompt) -> Result<String, GenerationError> {
        let user_message = prompt.user_message();
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: prompt.system_message(),
                },
                ChatMessage {
                    role: "user",
                    content: &user_message,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        debug!(clause = %prompt.clause, model = %self.model, "Requesting clause generation");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        parse_completion(&body)
    }
}
