/// Daily stand-up entries
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

const DUPLICATE_ENTRY: &str = "DSU already exists for this date";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum DsuStatus {
    Pending,
    Submitted,
    Reviewed,
}

impl DsuStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DsuStatus::Pending => "pending",
            DsuStatus::Submitted => "submitted",
            DsuStatus::Reviewed => "reviewed",
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DsuEntry {
    pub id: String,
    pub intern_id: String,
    pub date: NaiveDate,
    pub yesterday: String,
    pub today: String,
    pub blockers: Option<String>,
    pub learnings: Option<String>,
    pub status: DsuStatus,
    pub feedback: Option<String>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Entry joined with its intern's name and batch
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DsuListItem {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub entry: DsuEntry,
    pub intern_name: Option<String>,
    pub batch: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDsu {
    #[validate(length(min = 1))]
    pub intern_id: String,
    pub date: NaiveDate,
    #[validate(length(min = 1))]
    pub yesterday: String,
    #[validate(length(min = 1))]
    pub today: String,
    pub blockers: Option<String>,
    pub learnings: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DsuPatch {
    pub yesterday: Option<String>,
    pub today: Option<String>,
    pub blockers: Option<String>,
    pub learnings: Option<String>,
    pub status: Option<DsuStatus>,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DsuQuery {
    pub intern_id: Option<String>,
    pub batch: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

pub struct DsuStore {
    db: SqlitePool,
    interns: Arc<InternStore>,
}

impl DsuStore {
    pub fn new(db: SqlitePool, interns: Arc<InternStore>) -> Self {
        Self { db, interns }
    }

    /// Submit an entry; one per intern per day
    pub async fn create(&self, req: CreateDsu) -> ApiResult<DsuEntry> {
        req.validate()?;

        if !self.interns.exists(&req.intern_id).await? {
            return Err(ApiError::NotFound("Intern not found".to_string()));
        }

        let id = new_id();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO dsu_entries (id, intern_id, date, yesterday, today, blockers, learnings, status,
                                      submitted_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'submitted', ?8, ?8, ?8)",
        )
        .bind(&id)
        .bind(&req.intern_id)
        .bind(req.date)
        .bind(&req.yesterday)
        .bind(&req.today)
        .bind(&req.blockers)
        .bind(&req.learnings)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(|e| ApiError::unique_or(e, DUPLICATE_ENTRY))?;

        self.interns.adjust(&req.intern_id, Counter::DsuStreak, 1).await?;

        tracing::debug!(dsu_id = %id, intern_id = %req.intern_id, date = %req.date, "dsu submitted");
        self.get(&id).await
    }

    pub async fn get(&self, id: &str) -> ApiResult<DsuEntry> {
        sqlx::query_as::<_, DsuEntry>("SELECT * FROM dsu_entries WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::NotFound("DSU entry not found".to_string()))
    }

    /// Newest first, intern name and batch joined in the same statement
    pub async fn list(&self, query: DsuQuery, page: Pagination) -> ApiResult<Page<DsuListItem>> {
        let filters = Filters::new()
            .eq("d.intern_id", query.intern_id)
            .eq("i.batch", query.batch)
            .cmp("d.date", ">=", query.date_from)
            .cmp("d.date", "<=", query.date_to);

        fetch_page(
            &self.db,
            "SELECT d.*, i.name AS intern_name, i.batch AS batch
             FROM dsu_entries d LEFT JOIN interns i ON i.id = d.intern_id",
            "SELECT COUNT(*) FROM dsu_entries d LEFT JOIN interns i ON i.id = d.intern_id",
            &filters,
            "d.date DESC, d.created_at DESC",
            page,
        )
        .await
    }

    /// Patch an entry. Feedback from a reviewer marks the entry reviewed.
    pub async fn update(&self, id: &str, patch: DsuPatch, reviewer: Option<&str>) -> ApiResult<DsuEntry> {
        let mut update = UpdateBuilder::new("dsu_entries")
            .set_opt("yesterday", patch.yesterday)
            .set_opt("today", patch.today)
            .set_opt("blockers", patch.blockers)
            .set_opt("learnings", patch.learnings);

        match (patch.feedback, reviewer) {
            (Some(feedback), Some(reviewer)) => {
                update = update
                    .set("feedback", feedback)
                    .set("reviewed_by", reviewer)
                    .set("reviewed_at", Utc::now())
                    .set("status", DsuStatus::Reviewed.as_str());
            }
            (Some(_), None) => {
                return Err(ApiError::Authorization(
                    "Only reviewers can leave feedback".to_string(),
                ));
            }
            (None, _) => {
                update = update.set_opt("status", patch.status.map(|s| s.as_str()));
            }
        }

        let changed = update.execute(&self.db, "id", id).await?;
        if changed == 0 {
            return Err(ApiError::NotFound("DSU entry not found".to_string()));
        }
        self.get(id).await
    }
}
