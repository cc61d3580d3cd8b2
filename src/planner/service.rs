//! The planning pipeline.
//!
//! prompt template -> completion provider -> parse -> validate -> assemble
//! -> (optionally) persist. One provider call per operation, no retries.

use std::sync::Arc;

use serde_json::Value;

use super::assemble::{assemble_breakdown, assemble_subtasks, assemble_tasks, Breakdown, Owner};
use super::error::PlanError;
use super::prompts::{breakdown_prompt, plan_prompt, subtasks_prompt, PlanPolicy, PromptTemplate};
use super::validate::{validate_breakdown, validate_subtasks, validate_tasks, ValidationError};
use crate::llm::{
    parse_structured, ChatMessage, ChatOptions, CompletionProvider, Parsed, ProviderKind, ProviderRef,
    ProviderRegistry,
};
use crate::store::TaskStore;
use crate::task::{parse_calendar_date, Subtask, SubtaskId, Task, TaskId};

/// Sampling temperature for every provider call.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Providers accepted by [`Planner::chat`].
const CHAT_PROVIDERS: &[ProviderKind] = &[ProviderKind::Claude, ProviderKind::DeepSeek];

/// Runs planning operations against injected providers and a task store.
#[derive(Clone)]
pub struct Planner {
    providers: ProviderRegistry,
    default_provider: ProviderKind,
    store: Arc<dyn TaskStore>,
    policy: PlanPolicy,
    temperature: f64,
}

fn require_text(value: &str, field: &str) -> Result<(), PlanError> {
    if value.trim().is_empty() {
        return Err(PlanError::InvalidInput(format!("'{}' must not be empty", field)));
    }
    Ok(())
}

impl Planner {
    pub fn new(
        providers: ProviderRegistry,
        default_provider: ProviderKind,
        store: Arc<dyn TaskStore>,
    ) -> Self {
        Self {
            providers,
            default_provider,
            store,
            policy: PlanPolicy::default(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_policy(mut self, policy: PlanPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn default_provider(&self) -> ProviderKind {
        self.default_provider
    }

    pub fn is_persistent(&self) -> bool {
        self.store.is_persistent()
    }

    fn provider(&self, kind: ProviderKind) -> Result<ProviderRef, PlanError> {
        self.providers
            .get(kind)
            .ok_or_else(|| PlanError::ProviderUnavailable(format!("{} is not configured", kind)))
    }

    /// Call the default provider with a template and validate the result.
    async fn structured<T>(
        &self,
        template: PromptTemplate,
        validate: impl FnOnce(&Value) -> Result<T, ValidationError>,
    ) -> Result<T, PlanError> {
        let provider = self.provider(self.default_provider)?;
        let options = ChatOptions {
            temperature: Some(self.temperature),
            max_tokens: None,
            output_schema: Some(template.schema.clone()),
        };

        let completion = provider.complete(&template.messages(), &options).await?;
        tracing::debug!(
            "{} returned {} bytes (structured={}, model={:?}, usage={:?})",
            provider.kind(),
            completion.text.len(),
            completion.structured,
            completion.model,
            completion.usage
        );

        let malformed = |reason: String| {
            tracing::warn!(
                "Malformed response from {}: {}; raw text: {}",
                provider.kind(),
                reason,
                completion.text
            );
            PlanError::MalformedResponse(reason)
        };

        let parsed = parse_structured(&completion.text).map_err(|e| malformed(e.to_string()))?;
        if let Parsed::Extracted { source, .. } = &parsed {
            tracing::debug!("Recovered JSON from {:?}", source);
        }

        validate(parsed.value()).map_err(|e| malformed(e.to_string()))
    }

    /// Turn free-form goals into tasks. Nothing is persisted.
    pub async fn plan(&self, prompt: &str) -> Result<Vec<Task>, PlanError> {
        require_text(prompt, "prompt")?;
        let policy = &self.policy;
        let drafts = self
            .structured(plan_prompt(policy, prompt), |v| validate_tasks(v, policy))
            .await?;
        Ok(assemble_tasks(drafts, None)?)
    }

    /// Plan a user's day and persist every task.
    ///
    /// Inputs and the date are checked before the provider is called. Tasks
    /// are inserted one at a time; a failed insert keeps the earlier ones.
    pub async fn plan_for_day(
        &self,
        prompt: &str,
        user_id: &str,
        date: &str,
    ) -> Result<Vec<Task>, PlanError> {
        require_text(prompt, "prompt")?;
        require_text(user_id, "user_id")?;
        let owner = Owner::parse(user_id, date)?;

        let policy = &self.policy;
        let drafts = self
            .structured(plan_prompt(policy, prompt), |v| validate_tasks(v, policy))
            .await?;
        let tasks = assemble_tasks(drafts, Some(&owner))?;

        let mut stored = Vec::with_capacity(tasks.len());
        for task in &tasks {
            stored.push(self.store.insert_task(task).await?);
        }
        tracing::info!(
            "Planned {} tasks for {} on {}",
            stored.len(),
            owner.user_id,
            owner.date
        );
        Ok(stored)
    }

    /// Estimate one task and split it into subtasks. Nothing is persisted.
    pub async fn breakdown(&self, name: &str, description: &str) -> Result<Breakdown, PlanError> {
        require_text(name, "name")?;
        let draft = self
            .structured(breakdown_prompt(name, description), validate_breakdown)
            .await?;
        Ok(assemble_breakdown(draft)?)
    }

    /// Generate and persist subtasks for a stored task.
    pub async fn generate_subtasks(
        &self,
        task_id: TaskId,
        name: &str,
        description: &str,
        duration_minutes: u32,
    ) -> Result<Vec<Subtask>, PlanError> {
        require_text(name, "name")?;
        let drafts = self
            .structured(
                subtasks_prompt(name, description, duration_minutes),
                validate_subtasks,
            )
            .await?;
        let subtasks = assemble_subtasks(drafts, Some(task_id))?;

        let mut stored = Vec::with_capacity(subtasks.len());
        for subtask in &subtasks {
            stored.push(self.store.insert_subtask(subtask).await?);
        }
        tracing::info!("Generated {} subtasks for task {}", stored.len(), task_id);
        Ok(stored)
    }

    /// Forward a conversation to the named provider and return its text.
    ///
    /// The model name is checked before any provider call.
    pub async fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String, PlanError> {
        let kind = model
            .parse::<ProviderKind>()
            .ok()
            .filter(|kind| CHAT_PROVIDERS.contains(kind))
            .ok_or_else(|| PlanError::UnsupportedModel(model.to_string()))?;
        if messages.is_empty() {
            return Err(PlanError::InvalidInput("'messages' must not be empty".to_string()));
        }

        let provider = self.provider(kind)?;
        let options = ChatOptions {
            temperature: Some(self.temperature),
            ..ChatOptions::default()
        };
        Ok(provider.complete(messages, &options).await?.text)
    }

    /// Stored tasks for one user and day, with subtasks, highest priority first.
    pub async fn tasks_for_day(&self, user_id: &str, date: &str) -> Result<Vec<Task>, PlanError> {
        require_text(user_id, "user_id")?;
        let date = parse_calendar_date(date)?;
        Ok(self.store.tasks_for_day(user_id.trim(), date).await?)
    }

    pub async fn set_task_completed(&self, id: TaskId, is_completed: bool) -> Result<(), PlanError> {
        Ok(self.store.set_task_completed(id, is_completed).await?)
    }

    pub async fn set_subtask_completed(
        &self,
        id: SubtaskId,
        is_completed: bool,
    ) -> Result<(), PlanError> {
        Ok(self.store.set_subtask_completed(id, is_completed).await?)
    }
}
