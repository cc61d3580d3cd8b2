//! Supabase task store over PostgREST.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use super::{StoreError, TaskStore};
use crate::task::{Subtask, SubtaskId, Task, TaskId};

pub struct SupabaseStore {
    client: Client,
    url: String,
    service_role_key: String,
}

/// Row written to `tasks`. Subtasks live in their own table.
#[derive(Debug, Serialize)]
struct TaskRow<'a> {
    id: TaskId,
    name: &'a str,
    description: &'a str,
    duration_minutes: u32,
    priority: u8,
    is_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<NaiveDate>,
}

impl<'a> From<&'a Task> for TaskRow<'a> {
    fn from(task: &'a Task) -> Self {
        Self {
            id: task.id,
            name: &task.name,
            description: &task.description,
            duration_minutes: task.duration_minutes,
            priority: task.priority,
            is_completed: task.is_completed,
            user_id: task.user_id.as_deref(),
            date: task.date,
        }
    }
}

impl SupabaseStore {
    /// Every request is bounded by `timeout`.
    pub fn new(url: &str, service_role_key: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Http(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            service_role_key: service_role_key.to_string(),
        })
    }

    fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.service_role_key)
            .header("Authorization", format!("Bearer {}", self.service_role_key))
    }

    /// Send a request and decode the returned row list.
    async fn rows<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Vec<T>, StoreError> {
        let resp = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| StoreError::Decode(format!("{}: {}", e, text)))
    }

    /// POST one row with `return=representation` and return the stored row.
    async fn insert_row<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &'static str,
        body: &B,
    ) -> Result<T, StoreError> {
        let request = self
            .client
            .post(format!("{}/{}", self.rest_url(), table))
            .header("Content-Type", "application/json")
            .header("Prefer", "return=representation")
            .json(body);

        self.rows(request)
            .await?
            .into_iter()
            .next()
            .ok_or(StoreError::EmptyRepresentation(table))
    }

    /// PATCH `is_completed` on one row by id.
    async fn set_completed(
        &self,
        table: &'static str,
        label: &str,
        id: Uuid,
        is_completed: bool,
    ) -> Result<(), StoreError> {
        let request = self
            .client
            .patch(format!("{}/{}", self.rest_url(), table))
            .query(&[("id", format!("eq.{}", id))])
            .header("Content-Type", "application/json")
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({ "is_completed": is_completed }));

        let updated: Vec<serde_json::Value> = self.rows(request).await?;
        if updated.is_empty() {
            return Err(StoreError::NotFound(format!("{} {}", label, id)));
        }
        Ok(())
    }
}

#[async_trait]
impl TaskStore for SupabaseStore {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn insert_task(&self, task: &Task) -> Result<Task, StoreError> {
        tracing::debug!("Inserting task {} ({})", task.id, task.name);
        let mut stored: Task = self.insert_row("tasks", &TaskRow::from(task)).await?;
        stored.hints = task.hints.clone();
        Ok(stored)
    }

    async fn insert_subtask(&self, subtask: &Subtask) -> Result<Subtask, StoreError> {
        tracing::debug!("Inserting subtask {} ({})", subtask.id, subtask.name);
        self.insert_row("subtasks", subtask).await
    }

    async fn tasks_for_day(&self, user_id: &str, date: NaiveDate) -> Result<Vec<Task>, StoreError> {
        let request = self
            .client
            .get(format!("{}/tasks", self.rest_url()))
            .query(&[
                ("select", "*,subtasks(*)".to_string()),
                ("user_id", format!("eq.{}", user_id)),
                ("date", format!("eq.{}", date)),
                ("order", "priority.asc".to_string()),
            ]);
        self.rows(request).await
    }

    async fn set_task_completed(&self, id: TaskId, is_completed: bool) -> Result<(), StoreError> {
        self.set_completed("tasks", "Task", id.as_uuid(), is_completed)
            .await
    }

    async fn set_subtask_completed(&self, id: SubtaskId, is_completed: bool) -> Result<(), StoreError> {
        self.set_completed("subtasks", "Subtask", id.as_uuid(), is_completed)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::WaitingHints;

    #[test]
    fn task_row_leaves_out_subtasks_and_hints() {
        let task = Task::new("Write blog", "Tech post", 300, 1)
            .unwrap()
            .with_hints(WaitingHints {
                has_waiting_periods: Some(false),
                waiting_period_length: Some(0),
                can_be_interleaved: Some(false),
            })
            .owned_by("user-1", NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());

        let row = serde_json::to_value(TaskRow::from(&task)).unwrap();
        assert_eq!(row["date"], "2024-05-01");
        assert_eq!(row["user_id"], "user-1");
        assert_eq!(row["is_completed"], false);
        assert!(row.get("subtasks").is_none());
        assert!(row.get("has_waiting_periods").is_none());
    }

    #[test]
    fn stored_rows_decode_with_embedded_subtasks() {
        let rows = serde_json::json!([{
            "id": "6f1c1f0e-8d7a-4b7e-9a53-2a1f0c6b7d11",
            "name": "Write blog",
            "description": "Tech post",
            "duration_minutes": 300,
            "priority": 1,
            "is_completed": false,
            "user_id": "user-1",
            "date": "2024-05-01",
            "created_at": "2024-05-01T08:00:00+00:00",
            "subtasks": [{
                "id": "0b0e3a55-56f4-4b0c-8c4b-2d3c9a4e1f22",
                "task_id": "6f1c1f0e-8d7a-4b7e-9a53-2a1f0c6b7d11",
                "name": "Outline",
                "description": "sections",
                "duration_minutes": 60,
                "is_completed": true
            }]
        }]);
        let tasks: Vec<Task> = serde_json::from_value(rows).unwrap();
        let subtasks = tasks[0].subtasks.as_ref().unwrap();
        assert_eq!(subtasks[0].task_id, Some(tasks[0].id));
        assert!(subtasks[0].is_completed);
    }

    #[test]
    fn base_url_is_normalised() {
        let store =
            SupabaseStore::new("https://example.supabase.co/", "key", Duration::from_secs(5)).unwrap();
        assert_eq!(store.rest_url(), "https://example.supabase.co/rest/v1");
    }
}
