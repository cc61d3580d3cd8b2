//! Configuration management for taskplan.
//!
//! Configuration is read from environment variables:
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `8000`.
//! - `PLAN_PROVIDER` - Optional. Provider for planning endpoints (`claude`, `deepseek`, `gpt4o`). Defaults to `gpt4o`.
//! - `ANTHROPIC_API_KEY`, `DEEPSEEK_API_KEY`, `OPENAI_API_KEY` - Optional. A provider without a key is not registered.
//! - `CLAUDE_MODEL`, `DEEPSEEK_MODEL`, `GPT4O_MODEL` - Optional. Model overrides.
//! - `ANTHROPIC_BASE_URL`, `DEEPSEEK_BASE_URL`, `OPENAI_BASE_URL` - Optional. Base URL overrides.
//! - `LLM_TIMEOUT_SECS` - Optional. Provider request timeout. Defaults to `60`.
//! - `PLAN_MAX_TASK_MINUTES` - Optional. Upper bound on a single planned task.
//! - `PLAN_WAITING_PERIODS` - Optional. Ask for waiting-period hints. Defaults to `false`.
//! - `SUPABASE_URL`, `SUPABASE_SERVICE_ROLE_KEY` - Optional. Tasks are kept in memory without them.
//! - `STORE_TIMEOUT_SECS` - Optional. Supabase request timeout. Defaults to `30`.
//! - `CORS_ALLOWED_ORIGINS` - Optional. Comma-separated origins. Defaults to `http://localhost:5173,http://localhost:3000`.

use std::time::Duration;

use thiserror::Error;

use crate::llm::{
    AnthropicClient, LlmError, OpenAiCompatClient, ProviderKind, ProviderRegistry,
    DEFAULT_CLAUDE_MODEL, DEFAULT_DEEPSEEK_MODEL, DEFAULT_GPT4O_MODEL,
};
use crate::planner::PlanPolicy;
use crate::util::env_var_bool;

pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173,http://localhost:3000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to build provider: {0}")]
    Provider(#[from] LlmError),
}

/// Credentials and overrides for one completion provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
}

/// Task persistence configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Supabase project URL
    pub supabase_url: Option<String>,

    /// Supabase service role key (for full access)
    pub supabase_service_role_key: Option<String>,

    /// Per-request timeout for Supabase calls
    pub timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            supabase_url: None,
            supabase_service_role_key: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl StoreConfig {
    /// Check if Supabase persistence is configured.
    pub fn is_enabled(&self) -> bool {
        self.supabase_url.is_some() && self.supabase_service_role_key.is_some()
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Provider used by the planning endpoints
    pub plan_provider: ProviderKind,

    pub claude: Option<ProviderConfig>,
    pub deepseek: Option<ProviderConfig>,
    pub gpt4o: Option<ProviderConfig>,

    /// Per-request timeout for provider calls
    pub llm_timeout: Duration,

    pub policy: PlanPolicy,

    pub store: StoreConfig,

    /// Origins allowed to call the API from a browser
    pub cors_origins: Vec<String>,
}

/// Read a variable, treating empty values as unset.
fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}

fn provider_from_env(
    key_var: &str,
    model_var: &str,
    base_url_var: &str,
    default_model: &str,
) -> Option<ProviderConfig> {
    env_opt(key_var).map(|api_key| ProviderConfig {
        api_key,
        model: env_opt(model_var).unwrap_or_else(|| default_model.to_string()),
        base_url: env_opt(base_url_var),
    })
}

/// Split a comma-separated origin list, dropping blanks.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for unparseable values and
    /// `ConfigError::MissingEnvVar` when the key for `PLAN_PROVIDER` is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env_opt("HOST").unwrap_or_else(|| "127.0.0.1".to_string());

        let port = match env_opt("PORT") {
            Some(raw) => parse_var("PORT", &raw)?,
            None => 8000,
        };

        let plan_provider = match env_opt("PLAN_PROVIDER") {
            Some(raw) => parse_var("PLAN_PROVIDER", &raw)?,
            None => ProviderKind::Gpt4o,
        };

        let llm_timeout = match env_opt("LLM_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_var("LLM_TIMEOUT_SECS", &raw)?),
            None => Duration::from_secs(60),
        };

        let store_timeout = match env_opt("STORE_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_var("STORE_TIMEOUT_SECS", &raw)?),
            None => Duration::from_secs(30),
        };

        let max_task_minutes = match env_opt("PLAN_MAX_TASK_MINUTES") {
            Some(raw) => Some(parse_var("PLAN_MAX_TASK_MINUTES", &raw)?),
            None => None,
        };

        let config = Self {
            host,
            port,
            plan_provider,
            claude: provider_from_env(
                "ANTHROPIC_API_KEY",
                "CLAUDE_MODEL",
                "ANTHROPIC_BASE_URL",
                DEFAULT_CLAUDE_MODEL,
            ),
            deepseek: provider_from_env(
                "DEEPSEEK_API_KEY",
                "DEEPSEEK_MODEL",
                "DEEPSEEK_BASE_URL",
                DEFAULT_DEEPSEEK_MODEL,
            ),
            gpt4o: provider_from_env(
                "OPENAI_API_KEY",
                "GPT4O_MODEL",
                "OPENAI_BASE_URL",
                DEFAULT_GPT4O_MODEL,
            ),
            llm_timeout,
            policy: PlanPolicy {
                max_task_minutes,
                waiting_periods: env_var_bool("PLAN_WAITING_PERIODS", false),
            },
            store: StoreConfig {
                supabase_url: env_opt("SUPABASE_URL"),
                supabase_service_role_key: env_opt("SUPABASE_SERVICE_ROLE_KEY"),
                timeout: store_timeout,
            },
            cors_origins: parse_origins(
                &env_opt("CORS_ALLOWED_ORIGINS").unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string()),
            ),
        };

        config.check_plan_provider()?;
        Ok(config)
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(plan_provider: ProviderKind) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            plan_provider,
            claude: None,
            deepseek: None,
            gpt4o: None,
            llm_timeout: Duration::from_secs(60),
            policy: PlanPolicy::default(),
            store: StoreConfig::default(),
            cors_origins: parse_origins(DEFAULT_CORS_ORIGINS),
        }
    }

    pub fn provider_config(&self, kind: ProviderKind) -> Option<&ProviderConfig> {
        match kind {
            ProviderKind::Claude => self.claude.as_ref(),
            ProviderKind::DeepSeek => self.deepseek.as_ref(),
            ProviderKind::Gpt4o => self.gpt4o.as_ref(),
        }
    }

    /// The planning provider must have credentials.
    fn check_plan_provider(&self) -> Result<(), ConfigError> {
        if self.provider_config(self.plan_provider).is_some() {
            return Ok(());
        }
        let var = match self.plan_provider {
            ProviderKind::Claude => "ANTHROPIC_API_KEY",
            ProviderKind::DeepSeek => "DEEPSEEK_API_KEY",
            ProviderKind::Gpt4o => "OPENAI_API_KEY",
        };
        Err(ConfigError::MissingEnvVar(var.to_string()))
    }

    /// Build one client per configured provider.
    pub fn build_providers(&self) -> Result<ProviderRegistry, ConfigError> {
        let mut registry = ProviderRegistry::new();

        if let Some(cfg) = &self.claude {
            let mut client =
                AnthropicClient::new(cfg.api_key.clone(), cfg.model.clone(), self.llm_timeout)?;
            if let Some(url) = &cfg.base_url {
                client = client.with_base_url(url.as_str());
            }
            registry.register(std::sync::Arc::new(client));
        }
        if let Some(cfg) = &self.deepseek {
            let mut client =
                OpenAiCompatClient::deepseek(cfg.api_key.clone(), cfg.model.clone(), self.llm_timeout)?;
            if let Some(url) = &cfg.base_url {
                client = client.with_base_url(url.as_str());
            }
            registry.register(std::sync::Arc::new(client));
        }
        if let Some(cfg) = &self.gpt4o {
            let mut client =
                OpenAiCompatClient::gpt4o(cfg.api_key.clone(), cfg.model.clone(), self.llm_timeout)?;
            if let Some(url) = &cfg.base_url {
                client = client.with_base_url(url.as_str());
            }
            registry.register(std::sync::Arc::new(client));
        }

        for kind in registry.kinds() {
            tracing::info!("Registered completion provider: {}", kind);
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::CompletionProvider;

    fn key(model: &str) -> Option<ProviderConfig> {
        Some(ProviderConfig {
            api_key: "test-key".to_string(),
            model: model.to_string(),
            base_url: None,
        })
    }

    #[test]
    fn origins_are_split_and_trimmed() {
        assert_eq!(
            parse_origins(" http://a.test , ,http://b.test"),
            vec!["http://a.test", "http://b.test"]
        );
        assert_eq!(parse_origins(DEFAULT_CORS_ORIGINS).len(), 2);
    }

    #[test]
    fn plan_provider_needs_a_key() {
        let mut config = Config::new(ProviderKind::Claude);
        assert!(matches!(
            config.check_plan_provider(),
            Err(ConfigError::MissingEnvVar(var)) if var == "ANTHROPIC_API_KEY"
        ));

        config.claude = key(DEFAULT_CLAUDE_MODEL);
        assert!(config.check_plan_provider().is_ok());
    }

    #[test]
    fn only_configured_providers_are_registered() {
        let mut config = Config::new(ProviderKind::Gpt4o);
        config.gpt4o = key(DEFAULT_GPT4O_MODEL);
        config.deepseek = Some(ProviderConfig {
            api_key: "test-key".to_string(),
            model: DEFAULT_DEEPSEEK_MODEL.to_string(),
            base_url: Some("http://localhost:9999".to_string()),
        });

        let registry = config.build_providers().unwrap();
        assert_eq!(
            registry.kinds(),
            vec![ProviderKind::DeepSeek, ProviderKind::Gpt4o]
        );
        let gpt = registry.get(ProviderKind::Gpt4o).unwrap();
        assert_eq!(gpt.model(), DEFAULT_GPT4O_MODEL);
    }

    #[test]
    fn invalid_numbers_are_reported_by_name() {
        let err = parse_var::<u16>("PORT", "eighty").unwrap_err();
        assert!(err.to_string().starts_with("Invalid value for PORT"));
    }
}
