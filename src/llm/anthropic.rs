//! Anthropic Messages API client (Claude).
//!
//! Structured output uses a forced tool call: the request declares a single
//! tool whose `input_schema` is the requested schema and sets `tool_choice`
//! to that tool, so the model's answer arrives as the tool input.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{
    http_client, send_request, ChatMessage, ChatOptions, Completion, CompletionProvider, LlmError,
    ProviderKind, Role, TokenUsage,
};

pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_CLAUDE_MODEL: &str = "claude-3-5-sonnet-20241022";
/// The Messages API requires `max_tokens`.
const DEFAULT_MAX_TOKENS: u32 = 2000;

/// Claude completion provider.
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl AnthropicClient {
    /// Create a new client against the public Anthropic endpoint.
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key,
            base_url: ANTHROPIC_API_URL.to_string(),
            model,
        })
    }

    /// Point the client at a different base URL (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build the request body.
    ///
    /// System messages are concatenated into the top-level `system` field;
    /// the Messages API only accepts user/assistant turns in `messages`.
    fn build_request(&self, messages: &[ChatMessage], options: &ChatOptions) -> AnthropicRequest {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();

        let turns = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| AnthropicMessage {
                role: if m.role == Role::Assistant { "assistant" } else { "user" },
                content: m.content.clone(),
            })
            .collect();

        let (tools, tool_choice) = match &options.output_schema {
            Some(schema) => (
                Some(vec![AnthropicTool {
                    name: schema.name.clone(),
                    description: schema.description.clone(),
                    input_schema: schema.schema.clone(),
                }]),
                Some(serde_json::json!({ "type": "tool", "name": schema.name })),
            ),
            None => (None, None),
        };

        AnthropicRequest {
            model: self.model.clone(),
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system: if system.is_empty() {
                None
            } else {
                Some(system.join("\n\n"))
            },
            messages: turns,
            temperature: options.temperature,
            tools,
            tool_choice,
        }
    }
}

/// Turn a decoded response into a [`Completion`].
fn into_completion(response: AnthropicResponse, structured: bool) -> Result<Completion, LlmError> {
    let usage = response
        .usage
        .map(|u| TokenUsage::new(u.input_tokens, u.output_tokens));

    if structured {
        if let Some(input) = response
            .content
            .iter()
            .find(|b| b.block_type == "tool_use")
            .and_then(|b| b.input.as_ref())
        {
            return Ok(Completion {
                text: input.to_string(),
                structured: true,
                model: response.model,
                usage,
            });
        }
        tracing::warn!("Claude ignored the forced tool call; falling back to text content");
    }

    let text: String = response
        .content
        .iter()
        .filter(|b| b.block_type == "text")
        .filter_map(|b| b.text.as_deref())
        .collect::<Vec<_>>()
        .join("");

    if text.trim().is_empty() {
        return Err(LlmError::empty_completion(format!(
            "Claude returned no text (stop_reason: {})",
            response.stop_reason.as_deref().unwrap_or("unknown")
        )));
    }

    Ok(Completion {
        text,
        structured: false,
        model: response.model,
        usage,
    })
}

#[async_trait]
impl CompletionProvider for AnthropicClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Claude
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<Completion, LlmError> {
        let request = self.build_request(messages, options);
        tracing::debug!(
            "Sending request to Claude: model={}, structured={}",
            self.model,
            request.tools.is_some()
        );

        let body = send_request(
            self.client
                .post(format!("{}/messages", self.base_url))
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("Content-Type", "application/json")
                .json(&request),
        )
        .await?;

        let parsed: AnthropicResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::parse_error(format!("Failed to parse response: {}, body: {}", e, body))
        })?;

        into_completion(parsed, options.output_schema.is_some())
    }
}

/// Messages API request format.
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<AnthropicTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

/// Messages API response format.
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicContentBlock>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    input: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
}
