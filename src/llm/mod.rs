//! Completion provider module.
//!
//! One capability trait, [`CompletionProvider`], with two transports:
//! the Anthropic Messages API (Claude) and the OpenAI-compatible chat
//! completions API (GPT-4o and DeepSeek). Providers are built once at
//! startup and handed to the planner through a [`ProviderRegistry`].

mod anthropic;
mod error;
mod openai;
pub mod parse;

pub use anthropic::{AnthropicClient, DEFAULT_CLAUDE_MODEL};
pub use error::{classify_http_status, LlmError, LlmErrorKind};
pub use openai::{OpenAiCompatClient, DEFAULT_DEEPSEEK_MODEL, DEFAULT_GPT4O_MODEL};
pub use parse::{parse_structured, ExtractionError, ExtractionSource, ParseError, Parsed};

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Role in a chat conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A message in a chat conversation. Transient; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        ChatMessage {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

/// Build the message sequence for a single prompt: optional system
/// instruction first, then the user prompt.
pub fn prompt_messages(system: Option<&str>, prompt: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = system {
        messages.push(ChatMessage::system(system));
    }
    messages.push(ChatMessage::user(prompt));
    messages
}

/// JSON schema the completion must conform to.
///
/// Providers that support schema-constrained tool calls force a call to a
/// single tool with this schema; the rest ignore it and the caller falls
/// back to extraction from free text.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    pub name: String,
    pub description: String,
    pub schema: serde_json::Value,
}

/// Optional parameters for a completion.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    /// Sampling temperature.
    pub temperature: Option<f64>,
    /// Maximum output tokens to generate.
    pub max_tokens: Option<u32>,
    /// Request structured output shaped by this schema.
    pub output_schema: Option<OutputSchema>,
}

/// Token usage information (if provided by the upstream provider).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Create a usage object ensuring `total_tokens` is consistent.
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// Result of a completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Completion text. For structured completions this is the JSON of the
    /// forced tool call's arguments.
    pub text: String,
    /// True when `text` came from a schema-constrained tool call.
    pub structured: bool,
    pub model: Option<String>,
    pub usage: Option<TokenUsage>,
}

/// The three supported providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Claude,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "gpt4o")]
    Gpt4o,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Claude => "claude",
            ProviderKind::DeepSeek => "deepseek",
            ProviderKind::Gpt4o => "gpt4o",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised provider name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported model '{0}'")]
pub struct UnknownProvider(pub String);

impl FromStr for ProviderKind {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "claude" | "anthropic" => Ok(ProviderKind::Claude),
            "deepseek" => Ok(ProviderKind::DeepSeek),
            "gpt4o" | "gpt-4o" | "openai" => Ok(ProviderKind::Gpt4o),
            _ => Err(UnknownProvider(s.to_string())),
        }
    }
}

/// Capability shared by every completion provider.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Which provider this is.
    fn kind(&self) -> ProviderKind;

    /// Model identifier sent upstream.
    fn model(&self) -> &str;

    /// Send one completion request. No retries.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<Completion, LlmError>;
}

/// Shared handle to a provider.
pub type ProviderRef = Arc<dyn CompletionProvider>;

/// Providers available to this process, keyed by kind.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<ProviderKind, ProviderRef>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider, replacing any previous one of the same kind.
    pub fn register(&mut self, provider: ProviderRef) {
        self.providers.insert(provider.kind(), provider);
    }

    pub fn with(mut self, provider: ProviderRef) -> Self {
        self.register(provider);
        self
    }

    pub fn get(&self, kind: ProviderKind) -> Option<ProviderRef> {
        self.providers.get(&kind).cloned()
    }

    pub fn kinds(&self) -> Vec<ProviderKind> {
        self.providers.keys().copied().collect()
    }
}

/// Send a prepared request and return the body of a 2xx response.
///
/// Transport failures and non-success statuses become [`LlmError`]s.
pub(crate) async fn send_request(request: reqwest::RequestBuilder) -> Result<String, LlmError> {
    let response = match request.send().await {
        Ok(r) => r,
        Err(e) => {
            if e.is_timeout() {
                return Err(LlmError::network_error(format!("Request timeout: {}", e)));
            } else if e.is_connect() {
                return Err(LlmError::network_error(format!("Connection failed: {}", e)));
            } else {
                return Err(LlmError::network_error(format!("Request failed: {}", e)));
            }
        }
    };

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| LlmError::network_error(format!("Failed to read response body: {}", e)))?;

    if !status.is_success() {
        return Err(LlmError::from_status(status.as_u16(), body));
    }

    Ok(body)
}

/// Build a reqwest client with the configured request timeout.
pub(crate) fn http_client(timeout: std::time::Duration) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LlmError::configuration(format!("Failed to build HTTP client: {}", e)))
}

/// Scripted provider used by tests across the crate.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Returns queued replies in order and records every request.
    pub struct ScriptedProvider {
        kind: ProviderKind,
        replies: Mutex<Vec<Result<Completion, LlmError>>>,
        pub calls: Mutex<Vec<(Vec<ChatMessage>, ChatOptions)>>,
    }

    impl ScriptedProvider {
        pub fn new(kind: ProviderKind) -> Self {
            Self {
                kind,
                replies: Mutex::new(Vec::new()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn reply(self, text: impl Into<String>) -> Self {
            self.push(Ok(Completion {
                text: text.into(),
                structured: false,
                model: None,
                usage: None,
            }))
        }

        pub fn fail(self, error: LlmError) -> Self {
            self.push(Err(error))
        }

        fn push(self, reply: Result<Completion, LlmError>) -> Self {
            self.replies.lock().unwrap().push(reply);
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn last_call(&self) -> Option<(Vec<ChatMessage>, ChatOptions)> {
            self.calls.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        fn model(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            messages: &[ChatMessage],
            options: &ChatOptions,
        ) -> Result<Completion, LlmError> {
            self.calls
                .lock()
                .unwrap()
                .push((messages.to_vec(), options.clone()));
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                return Err(LlmError::network_error("no scripted reply".to_string()));
            }
            replies.remove(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedProvider;
    use super::*;

    #[test]
    fn provider_kind_parses_known_names() {
        assert_eq!("claude".parse::<ProviderKind>(), Ok(ProviderKind::Claude));
        assert_eq!("DeepSeek".parse::<ProviderKind>(), Ok(ProviderKind::DeepSeek));
        assert_eq!("gpt-4o".parse::<ProviderKind>(), Ok(ProviderKind::Gpt4o));
        assert!("invalid_model".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn provider_kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(ProviderKind::DeepSeek).unwrap(),
            serde_json::json!("deepseek")
        );
    }

    #[test]
    fn prompt_messages_puts_system_first() {
        let messages = prompt_messages(Some("be brief"), "plan my day");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1], ChatMessage::user("plan my day"));

        let bare = prompt_messages(None, "hi");
        assert_eq!(bare, vec![ChatMessage::user("hi")]);
    }

    #[test]
    fn registry_looks_up_by_kind() {
        let registry = ProviderRegistry::new()
            .with(Arc::new(ScriptedProvider::new(ProviderKind::Claude)))
            .with(Arc::new(ScriptedProvider::new(ProviderKind::Gpt4o)));
        assert!(registry.get(ProviderKind::Claude).is_some());
        assert!(registry.get(ProviderKind::DeepSeek).is_none());
        assert_eq!(
            registry.kinds(),
            vec![ProviderKind::Claude, ProviderKind::Gpt4o]
        );
    }
}
