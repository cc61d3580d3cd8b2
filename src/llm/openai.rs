//! OpenAI-compatible chat completions client.
//!
//! Serves both GPT-4o (OpenAI) and DeepSeek, which speaks the same wire
//! format at a different base URL. GPT-4o receives structured-output
//! requests as a forced function call; DeepSeek gets free text and the
//! caller extracts JSON from it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{
    http_client, send_request, ChatMessage, ChatOptions, Completion, CompletionProvider, LlmError,
    ProviderKind, TokenUsage,
};

pub const OPENAI_API_URL: &str = "https://api.openai.com/v1";
pub const DEEPSEEK_API_URL: &str = "https://api.deepseek.com";
pub const DEFAULT_GPT4O_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_DEEPSEEK_MODEL: &str = "deepseek-chat";
const GPT4O_MAX_TOKENS: u32 = 1000;

/// OpenAI-compatible completion provider.
pub struct OpenAiCompatClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    kind: ProviderKind,
    /// Whether `output_schema` is sent as a forced function call.
    function_calling: bool,
    /// Used when the caller does not set `max_tokens`.
    default_max_tokens: Option<u32>,
}

impl OpenAiCompatClient {
    /// GPT-4o via the OpenAI API, structured output through function calls.
    pub fn gpt4o(api_key: String, model: String, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key,
            base_url: OPENAI_API_URL.to_string(),
            model,
            kind: ProviderKind::Gpt4o,
            function_calling: true,
            default_max_tokens: Some(GPT4O_MAX_TOKENS),
        })
    }

    /// DeepSeek chat, free text only.
    pub fn deepseek(api_key: String, model: String, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key,
            base_url: DEEPSEEK_API_URL.to_string(),
            model,
            kind: ProviderKind::DeepSeek,
            function_calling: false,
            default_max_tokens: None,
        })
    }

    /// Point the client at a different base URL (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_request(&self, messages: &[ChatMessage], options: &ChatOptions) -> ChatRequest {
        let schema = options
            .output_schema
            .as_ref()
            .filter(|_| self.function_calling);

        ChatRequest {
            model: self.model.clone(),
            messages: messages.to_vec(),
            temperature: options.temperature,
            max_tokens: options.max_tokens.or(self.default_max_tokens),
            stream: false,
            tools: schema.map(|s| {
                vec![ToolDefinition {
                    tool_type: "function",
                    function: FunctionDefinition {
                        name: s.name.clone(),
                        description: s.description.clone(),
                        parameters: s.schema.clone(),
                    },
                }]
            }),
            tool_choice: schema.map(|s| {
                serde_json::json!({ "type": "function", "function": { "name": s.name } })
            }),
        }
    }
}

/// Turn a decoded response into a [`Completion`].
fn into_completion(
    response: ChatResponse,
    provider: ProviderKind,
    structured: bool,
) -> Result<Completion, LlmError> {
    let usage = response
        .usage
        .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens));

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::parse_error("No choices in response".to_string()))?;

    if structured {
        if let Some(call) = choice
            .message
            .tool_calls
            .as_ref()
            .and_then(|calls| calls.first())
        {
            return Ok(Completion {
                text: call.function.arguments.clone(),
                structured: true,
                model: response.model,
                usage,
            });
        }
        tracing::warn!("{} ignored the forced function call; falling back to text content", provider);
    }

    match choice.message.content {
        Some(text) if !text.trim().is_empty() => Ok(Completion {
            text,
            structured: false,
            model: response.model,
            usage,
        }),
        _ => Err(LlmError::empty_completion(format!(
            "{} returned no content (finish_reason: {})",
            provider,
            choice.finish_reason.as_deref().unwrap_or("unknown")
        ))),
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompatClient {
    fn kind(&self) -> ProviderKind {
        self.kind
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
        let structured = request.tools.is_some();
        tracing::debug!(
            "Sending request to {}: model={}, structured={}",
            self.kind,
            self.model,
            structured
        );

        let body = send_request(
            self.client
                .post(format!("{}/chat/completions", self.base_url))
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&request),
        )
        .await?;

        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::parse_error(format!("Failed to parse response: {}, body: {}", e, body))
        })?;

        into_completion(parsed, self.kind, structured)
    }
}

/// Chat completions request format.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct ToolDefinition {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: FunctionDefinition,
}

#[derive(Debug, Serialize)]
struct FunctionDefinition {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

/// Chat completions response format.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ResponseToolCall {
    function: ResponseFunctionCall,
}

#[derive(Debug, Deserialize)]
struct ResponseFunctionCall {
    /// Arguments as a JSON string.
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}
