/// Intern cohorts keyed by a human batch id
use crate::{
    error::{ApiError, ApiResult},
    store::{catalog::CatalogStore, fetch_all, interns::Intern, new_id, Filters, UpdateBuilder},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use std::sync::Arc;
use validator::Validate;

pub const DEFAULT_MAX_INTERNS: i64 = 50;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub id: String,
    pub batch_id: String,
    pub name: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub duration: i64,
    pub max_interns: i64,
    pub scrum_master: Option<String>,
    pub status: String,
    pub year_id: Option<String>,
    pub month_id: Option<String>,
    pub organization_id: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Batch with category names and intern counts by status
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub batch: Batch,
    pub year: Option<String>,
    pub month: Option<String>,
    pub organization: Option<String>,
    pub total_interns: i64,
    pub active_interns: i64,
    pub completed_interns: i64,
    pub dropped_interns: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDetail {
    #[serde(flatten)]
    pub summary: BatchSummary,
    pub interns: Vec<Intern>,
    pub average_task_completion: f64,
    #[serde(rename = "averageDSUStreak")]
    pub average_dsu_streak: f64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBatch {
    #[validate(length(min = 1, max = 50))]
    pub batch_id: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[validate(range(min = 0))]
    pub duration: Option<i64>,
    #[validate(range(min = 1))]
    pub max_interns: Option<i64>,
    pub scrum_master: Option<String>,
    pub year_id: Option<String>,
    pub month_id: Option<String>,
    pub organization_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BatchPatch {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[validate(range(min = 0))]
    pub duration: Option<i64>,
    #[validate(range(min = 1))]
    pub max_interns: Option<i64>,
    pub scrum_master: Option<String>,
    pub status: Option<String>,
    pub year_id: Option<String>,
    pub month_id: Option<String>,
    pub organization_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchQuery {
    pub status: Option<String>,
}

/// `upcoming` before the start date, `completed` after the end date, else `active`
pub fn derive_status(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> &'static str {
    if start > today {
        "upcoming"
    } else if end < today {
        "completed"
    } else {
        "active"
    }
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

const SUMMARY_SELECT: &str = "SELECT b.*,
        COALESCE(y.label, CAST(y.year AS TEXT)) AS year,
        m.name AS month,
        o.name AS organization,
        COALESCE(c.total, 0) AS total_interns,
        COALESCE(c.active, 0) AS active_interns,
        COALESCE(c.completed, 0) AS completed_interns,
        COALESCE(c.dropped, 0) AS dropped_interns
    FROM batches b
    LEFT JOIN batch_years y ON y.id = b.year_id
    LEFT JOIN batch_months m ON m.id = b.month_id
    LEFT JOIN organizations o ON o.id = b.organization_id
    LEFT JOIN (
        SELECT batch,
               COUNT(*) AS total,
               SUM(status = 'active') AS active,
               SUM(status = 'completed') AS completed,
               SUM(status = 'dropped') AS dropped
        FROM interns GROUP BY batch
    ) c ON c.batch = b.batch_id";

pub struct BatchStore {
    db: SqlitePool,
    catalog: Arc<CatalogStore>,
}

impl BatchStore {
    pub fn new(db: SqlitePool, catalog: Arc<CatalogStore>) -> Self {
        Self { db, catalog }
    }

    pub async fn create(&self, req: CreateBatch, created_by: &str) -> ApiResult<BatchSummary> {
        req.validate()?;

        if req.end_date < req.start_date {
            return Err(ApiError::Validation(
                "endDate must not be before startDate".to_string(),
            ));
        }

        self.catalog
            .ensure_refs(
                req.year_id.as_deref(),
                req.month_id.as_deref(),
                req.organization_id.as_deref(),
            )
            .await?;

        let now = Utc::now();
        let status = derive_status(req.start_date, req.end_date, now.date_naive());
        let duration = req
            .duration
            .unwrap_or_else(|| (req.end_date - req.start_date).num_days().max(0));

        sqlx::query(
            "INSERT INTO batches (id, batch_id, name, description, start_date, end_date, duration, max_interns,
                                  scrum_master, status, year_id, month_id, organization_id, created_by,
                                  created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)",
        )
        .bind(new_id())
        .bind(req.batch_id.trim())
        .bind(req.name.trim())
        .bind(&req.description)
        .bind(req.start_date)
        .bind(req.end_date)
        .bind(duration)
        .bind(req.max_interns.unwrap_or(DEFAULT_MAX_INTERNS))
        .bind(&req.scrum_master)
        .bind(status)
        .bind(&req.year_id)
        .bind(&req.month_id)
        .bind(&req.organization_id)
        .bind(created_by)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(|e| ApiError::unique_or(e, "Batch ID already exists"))?;

        tracing::info!(batch_id = %req.batch_id, status, "batch created");
        self.summary(req.batch_id.trim()).await
    }

    pub async fn list(&self, query: BatchQuery) -> ApiResult<Vec<BatchSummary>> {
        let filters = Filters::new().eq("b.status", query.status);
        fetch_all(&self.db, SUMMARY_SELECT, &filters, "b.start_date DESC").await
    }

    pub async fn summary(&self, batch_id: &str) -> ApiResult<BatchSummary> {
        let filters = Filters::new().eq("b.batch_id", Some(batch_id));
        fetch_all::<BatchSummary>(&self.db, SUMMARY_SELECT, &filters, "b.batch_id")
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::NotFound("Batch not found".to_string()))
    }

    /// Summary plus members and their average progress
    pub async fn detail(&self, batch_id: &str) -> ApiResult<BatchDetail> {
        let summary = self.summary(batch_id).await?;
        let interns = self.interns(batch_id).await?;

        let (average_task_completion, average_dsu_streak) = if interns.is_empty() {
            (0.0, 0.0)
        } else {
            let n = interns.len() as f64;
            let completion: f64 = interns
                .iter()
                .map(|i| i.completed_tasks as f64 / i.task_count.max(1) as f64 * 100.0)
                .sum();
            let streak: f64 = interns.iter().map(|i| i.dsu_streak as f64).sum();
            (round_to(completion / n, 2), round_to(streak / n, 1))
        };

        Ok(BatchDetail {
            summary,
            interns,
            average_task_completion,
            average_dsu_streak,
        })
    }

    pub async fn interns(&self, batch_id: &str) -> ApiResult<Vec<Intern>> {
        Ok(
            sqlx::query_as("SELECT * FROM interns WHERE batch = ?1 ORDER BY name ASC")
                .bind(batch_id)
                .fetch_all(&self.db)
                .await?,
        )
    }

    pub async fn update(&self, batch_id: &str, patch: BatchPatch) -> ApiResult<BatchSummary> {
        patch.validate()?;

        self.catalog
            .ensure_refs(
                patch.year_id.as_deref(),
                patch.month_id.as_deref(),
                patch.organization_id.as_deref(),
            )
            .await?;

        let changed = UpdateBuilder::new("batches")
            .set_opt("name", patch.name)
            .set_opt("description", patch.description)
            .set_opt("start_date", patch.start_date)
            .set_opt("end_date", patch.end_date)
            .set_opt("duration", patch.duration)
            .set_opt("max_interns", patch.max_interns)
            .set_opt("scrum_master", patch.scrum_master)
            .set_opt("status", patch.status)
            .set_opt("year_id", patch.year_id)
            .set_opt("month_id", patch.month_id)
            .set_opt("organization_id", patch.organization_id)
            .execute(&self.db, "batch_id", batch_id)
            .await?;

        if changed == 0 {
            return Err(ApiError::NotFound("Batch not found".to_string()));
        }
        self.summary(batch_id).await
    }

    /// Refused while any intern still belongs to the batch
    pub async fn delete(&self, batch_id: &str) -> ApiResult<()> {
        let members: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM interns WHERE batch = ?1")
            .bind(batch_id)
            .fetch_one(&self.db)
            .await?;

        if members > 0 {
            return Err(ApiError::Validation(format!(
                "Cannot delete batch with {} interns. Remove interns first.",
                members
            )));
        }

        let result = sqlx::query("DELETE FROM batches WHERE batch_id = ?1")
            .bind(batch_id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Batch not found".to_string()));
        }

        tracing::info!(batch_id = %batch_id, "batch deleted");
        Ok(())
    }
}
