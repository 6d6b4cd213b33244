/// Projects and their assigned interns
use crate::{
    error::{ApiError, ApiResult},
    store::{interns::InternStore, new_id, tasks::Task, UpdateBuilder},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use std::sync::Arc;
use validator::Validate;

const PROJECT_SELECT: &str = "SELECT p.*,
        (SELECT json_group_array(pi.intern_id) FROM project_interns pi WHERE pi.project_id = p.id) AS intern_ids
    FROM projects p";

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub scrum_master: Option<String>,
    #[sqlx(json)]
    pub intern_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Recent task activity on a project
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProjectUpdate {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub task: Task,
    pub intern_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProject {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub scrum_master: Option<String>,
    #[serde(default)]
    pub intern_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProjectPatch {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub scrum_master: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignInterns {
    pub intern_ids: Vec<String>,
}

pub struct ProjectStore {
    db: SqlitePool,
    interns: Arc<InternStore>,
}

impl ProjectStore {
    pub fn new(db: SqlitePool, interns: Arc<InternStore>) -> Self {
        Self { db, interns }
    }

    pub async fn create(&self, req: CreateProject) -> ApiResult<Project> {
        req.validate()?;
        let id = new_id();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO projects (id, name, description, status, start_date, end_date, scrum_master, created_at, updated_at)
             VALUES (?1, ?2, ?3, 'active', ?4, ?5, ?6, ?7, ?7)",
        )
        .bind(&id)
        .bind(req.name.trim())
        .bind(&req.description)
        .bind(req.start_date)
        .bind(req.end_date)
        .bind(&req.scrum_master)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(|e| ApiError::unique_or(e, "Project already exists"))?;

        if !req.intern_ids.is_empty() {
            let valid = self.existing_interns(&req.intern_ids).await?;
            self.link(&id, req.name.trim(), &valid).await?;
        }

        tracing::info!(project_id = %id, name = %req.name, "project created");
        self.get(&id).await
    }

    pub async fn get(&self, id: &str) -> ApiResult<Project> {
        sqlx::query_as::<_, Project>(&format!("{} WHERE p.id = ?1", PROJECT_SELECT))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))
    }

    pub async fn list(&self) -> ApiResult<Vec<Project>> {
        Ok(
            sqlx::query_as(&format!("{} ORDER BY p.created_at DESC", PROJECT_SELECT))
                .fetch_all(&self.db)
                .await?,
        )
    }

    /// Projects whose intern set contains the profile with this email
    pub async fn assigned_to(&self, email: &str) -> ApiResult<Vec<Project>> {
        let Some(intern) = self.interns.find_by_email(email).await? else {
            return Ok(Vec::new());
        };

        Ok(sqlx::query_as(&format!(
            "{} WHERE p.id IN (SELECT project_id FROM project_interns WHERE intern_id = ?1)
             ORDER BY p.created_at DESC",
            PROJECT_SELECT
        ))
        .bind(&intern.id)
        .fetch_all(&self.db)
        .await?)
    }

    pub async fn update(&self, id: &str, patch: ProjectPatch) -> ApiResult<Project> {
        patch.validate()?;

        let changed = UpdateBuilder::new("projects")
            .on_conflict("Project already exists")
            .set_opt("name", patch.name)
            .set_opt("description", patch.description)
            .set_opt("status", patch.status)
            .set_opt("start_date", patch.start_date)
            .set_opt("end_date", patch.end_date)
            .set_opt("scrum_master", patch.scrum_master)
            .execute(&self.db, "id", id)
            .await?;

        if changed == 0 {
            return Err(ApiError::NotFound("Project not found".to_string()));
        }
        self.get(id).await
    }

    /// Union the given interns into the project; unknown ids are skipped
    pub async fn assign(&self, id: &str, intern_ids: &[String]) -> ApiResult<Project> {
        if intern_ids.is_empty() {
            return Err(ApiError::Validation("No interns provided".to_string()));
        }

        let project = self.get(id).await?;
        let valid = self.existing_interns(intern_ids).await?;
        if valid.is_empty() {
            return Err(ApiError::NotFound("No valid interns found".to_string()));
        }

        self.link(&project.id, &project.name, &valid).await?;

        sqlx::query("UPDATE projects SET updated_at = ?1 WHERE id = ?2")
            .bind(Utc::now())
            .bind(&project.id)
            .execute(&self.db)
            .await?;

        tracing::info!(project_id = %project.id, assigned = valid.len(), "interns assigned to project");
        self.get(id).await
    }

    async fn existing_interns(&self, intern_ids: &[String]) -> ApiResult<Vec<String>> {
        let mut valid = Vec::with_capacity(intern_ids.len());
        for intern_id in intern_ids {
            if !valid.contains(intern_id) && self.interns.exists(intern_id).await? {
                valid.push(intern_id.clone());
            }
        }
        Ok(valid)
    }

    async fn link(&self, project_id: &str, project_name: &str, intern_ids: &[String]) -> ApiResult<()> {
        if intern_ids.is_empty() {
            return Ok(());
        }

        let now = Utc::now();
        let mut qb = QueryBuilder::<Sqlite>::new(
            "INSERT OR IGNORE INTO project_interns (project_id, intern_id, added_at) ",
        );
        qb.push_values(intern_ids, |mut row, intern_id| {
            row.push_bind(project_id).push_bind(intern_id).push_bind(now);
        });
        qb.build().execute(&self.db).await?;

        self.interns.set_current_project(intern_ids, project_name).await
    }

    /// Latest tasks filed under the project's name, intern names joined
    pub async fn updates(&self, id: &str, limit: i64) -> ApiResult<Vec<ProjectUpdate>> {
        let project = self.get(id).await?;

        Ok(sqlx::query_as(
            "SELECT t.*, i.name AS intern_name
             FROM tasks t LEFT JOIN interns i ON i.id = t.intern_id
             WHERE t.project = ?1
             ORDER BY t.updated_at DESC, t.created_at DESC
             LIMIT ?2",
        )
        .bind(&project.name)
        .bind(limit)
        .fetch_all(&self.db)
        .await?)
    }
}
