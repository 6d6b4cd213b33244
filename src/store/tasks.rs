/// Tasks assigned to interns
use crate::{
    error::{ApiError, ApiResult},
    store::{
        fetch_page,
        interns::{Counter, InternStore},
        new_id, Filters, Page, Pagination, UpdateBuilder,
    },
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use std::sync::Arc;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TaskStatus {
    NotStarted,
    Open,
    InProgress,
    OnHold,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not_started",
            TaskStatus::Open => "open",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::OnHold => "on_hold",
            TaskStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub intern_id: String,
    pub title: String,
    pub description: Option<String>,
    pub project: Option<String>,
    pub priority: String,
    pub status: TaskStatus,
    pub assigned_by: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTask {
    #[validate(length(min = 1))]
    pub intern_id: String,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: Option<String>,
    pub project: Option<String>,
    pub priority: Option<String>,
    pub status: Option<TaskStatus>,
    pub assigned_by: Option<String>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TaskPatch {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub project: Option<String>,
    pub priority: Option<String>,
    pub status: Option<TaskStatus>,
    pub assigned_by: Option<String>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskQuery {
    pub intern_id: Option<String>,
    pub status: Option<TaskStatus>,
}

pub struct TaskStore {
    db: SqlitePool,
    interns: Arc<InternStore>,
}

impl TaskStore {
    pub fn new(db: SqlitePool, interns: Arc<InternStore>) -> Self {
        Self { db, interns }
    }

    pub async fn create(&self, req: CreateTask, created_by: &str) -> ApiResult<Task> {
        req.validate()?;

        if !self.interns.exists(&req.intern_id).await? {
            return Err(ApiError::NotFound("Intern not found".to_string()));
        }

        let id = new_id();
        let now = Utc::now();
        let status = req.status.unwrap_or(TaskStatus::NotStarted);
        let completed_at = (status == TaskStatus::Completed).then_some(now);

        sqlx::query(
            "INSERT INTO tasks (id, intern_id, title, description, project, priority, status, assigned_by,
                                due_date, completed_at, created_by, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
        )
        .bind(&id)
        .bind(&req.intern_id)
        .bind(req.title.trim())
        .bind(&req.description)
        .bind(&req.project)
        .bind(req.priority.as_deref().unwrap_or("medium"))
        .bind(status)
        .bind(&req.assigned_by)
        .bind(req.due_date)
        .bind(completed_at)
        .bind(created_by)
        .bind(now)
        .execute(&self.db)
        .await?;

        self.interns.adjust(&req.intern_id, Counter::TaskCount, 1).await?;
        if status == TaskStatus::Completed {
            self.interns
                .adjust(&req.intern_id, Counter::CompletedTasks, 1)
                .await?;
        }

        tracing::debug!(task_id = %id, intern_id = %req.intern_id, "task created");
        self.get(&id).await
    }

    pub async fn get(&self, id: &str) -> ApiResult<Task> {
        sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))
    }

    pub async fn list(&self, query: TaskQuery, page: Pagination) -> ApiResult<Page<Task>> {
        let filters = Filters::new()
            .eq("intern_id", query.intern_id)
            .eq("status", query.status.map(|s| s.as_str()));

        fetch_page(
            &self.db,
            "SELECT * FROM tasks",
            "SELECT COUNT(*) FROM tasks",
            &filters,
            "created_at DESC",
            page,
        )
        .await
    }

    /// Apply a patch. Entering `completed` stamps the completion time and
    /// bumps the intern's completed counter exactly once; leaving it undoes both.
    pub async fn update(&self, id: &str, patch: TaskPatch) -> ApiResult<Task> {
        patch.validate()?;
        let current = self.get(id).await?;

        let update = UpdateBuilder::new("tasks")
            .set_opt("title", patch.title)
            .set_opt("description", patch.description)
            .set_opt("project", patch.project)
            .set_opt("priority", patch.priority)
            .set_opt("assigned_by", patch.assigned_by)
            .set_opt("due_date", patch.due_date);

        if update.is_empty() && patch.status.is_none() {
            return Err(ApiError::Validation("No fields to update".to_string()));
        }

        if let Some(status) = patch.status {
            self.transition(&current, status).await?;
        }

        if !update.is_empty() {
            update.execute(&self.db, "id", id).await?;
        }

        self.get(id).await
    }

    async fn transition(&self, task: &Task, status: TaskStatus) -> ApiResult<()> {
        let now = Utc::now();

        let sql = if status == TaskStatus::Completed {
            "UPDATE tasks SET status = ?1, completed_at = ?2, updated_at = ?2
             WHERE id = ?3 AND status != 'completed'"
        } else {
            "UPDATE tasks SET status = ?1, completed_at = NULL, updated_at = ?2
             WHERE id = ?3 AND status = 'completed'"
        };

        let changed = sqlx::query(sql)
            .bind(status)
            .bind(now)
            .bind(&task.id)
            .execute(&self.db)
            .await?
            .rows_affected();

        if changed == 1 {
            let delta = if status == TaskStatus::Completed { 1 } else { -1 };
            self.interns
                .adjust(&task.intern_id, Counter::CompletedTasks, delta)
                .await?;
            tracing::debug!(task_id = %task.id, status = status.as_str(), "task completion changed");
        } else if status != TaskStatus::Completed {
            // Moving between non-terminal states
            sqlx::query("UPDATE tasks SET status = ?1, updated_at = ?2 WHERE id = ?3")
                .bind(status)
                .bind(now)
                .bind(&task.id)
                .execute(&self.db)
                .await?;
        }

        Ok(())
    }

    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        let task = self.get(id).await?;

        let result = sqlx::query("DELETE FROM tasks WHERE id = ?1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Task not found".to_string()));
        }

        self.interns.adjust(&task.intern_id, Counter::TaskCount, -1).await?;
        if task.status == TaskStatus::Completed {
            self.interns
                .adjust(&task.intern_id, Counter::CompletedTasks, -1)
                .await?;
        }
        Ok(())
    }
}
