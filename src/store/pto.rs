/// Leave and work-from-home requests
use crate::{
    error::{ApiError, ApiResult},
    store::{fetch_page, interns::InternStore, new_id, Filters, Page, Pagination, UpdateBuilder},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use std::sync::Arc;

pub const LEAVE_TYPES: [&str; 2] = ["PTO", "WFH"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

impl LeaveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveStatus::Pending => "pending",
            LeaveStatus::Approved => "approved",
            LeaveStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Pto {
    pub id: String,
    pub intern_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: String,
    pub leave_type: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub number_of_days: i64,
    pub reason: Option<String>,
    pub status: LeaveStatus,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request joined with the intern's batch
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PtoListItem {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub pto: Pto,
    pub intern_name: Option<String>,
    pub batch: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePto {
    #[serde(default)]
    pub intern_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub leave_type: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PtoPatch {
    pub status: Option<LeaveStatus>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PtoQuery {
    pub status: Option<LeaveStatus>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub intern_id: Option<String>,
}

/// Inclusive day span; end before start is rejected
pub fn day_span(start: NaiveDate, end: NaiveDate) -> ApiResult<i64> {
    if end < start {
        return Err(ApiError::Validation(
            "endDate must not be before startDate".to_string(),
        ));
    }
    Ok((end - start).num_days() + 1)
}

pub struct PtoStore {
    db: SqlitePool,
    interns: Arc<InternStore>,
}

impl PtoStore {
    pub fn new(db: SqlitePool, interns: Arc<InternStore>) -> Self {
        Self { db, interns }
    }

    pub async fn create(&self, req: CreatePto) -> ApiResult<Pto> {
        let kind = req.kind.as_deref().unwrap_or("PTO").trim().to_uppercase();
        if !LEAVE_TYPES.contains(&kind.as_str()) {
            return Err(ApiError::Validation("Invalid PTO type".to_string()));
        }

        let number_of_days = day_span(req.start_date, req.end_date)?;

        let leave_type = match (kind.as_str(), req.leave_type) {
            ("PTO", None) => Some("casual".to_string()),
            (_, leave_type) => leave_type,
        };

        // Resolve by id, then by email
        let mut intern = None;
        if !req.intern_id.is_empty() {
            intern = match self.interns.get(&req.intern_id).await {
                Ok(found) => Some(found),
                Err(ApiError::NotFound(_)) => None,
                Err(e) => return Err(e),
            };
        }
        if intern.is_none() {
            if let Some(email) = req.email.as_deref() {
                intern = self.interns.find_by_email(email).await?;
            }
        }
        let intern = intern.ok_or_else(|| ApiError::NotFound("Intern not found".to_string()))?;

        let id = new_id();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO pto (id, intern_id, name, email, type, leave_type, start_date, end_date,
                              number_of_days, reason, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 'pending', ?11, ?11)",
        )
        .bind(&id)
        .bind(&intern.id)
        .bind(req.name.unwrap_or_else(|| intern.name.clone()))
        .bind(req.email.unwrap_or_else(|| intern.email.clone()))
        .bind(&kind)
        .bind(&leave_type)
        .bind(req.start_date)
        .bind(req.end_date)
        .bind(number_of_days)
        .bind(&req.reason)
        .bind(now)
        .execute(&self.db)
        .await?;

        tracing::info!(pto_id = %id, intern_id = %intern.id, kind = %kind, days = number_of_days, "leave requested");
        self.get(&id).await
    }

    pub async fn get(&self, id: &str) -> ApiResult<Pto> {
        sqlx::query_as::<_, Pto>("SELECT * FROM pto WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::NotFound("PTO not found".to_string()))
    }

    pub async fn list(&self, query: PtoQuery, page: Pagination) -> ApiResult<Page<PtoListItem>> {
        let filters = Filters::new()
            .eq("p.status", query.status.map(|s| s.as_str()))
            .eq("p.type", query.kind.map(|k| k.to_uppercase()))
            .eq("p.intern_id", query.intern_id);

        fetch_page(
            &self.db,
            "SELECT p.*, COALESCE(p.name, i.name) AS intern_name, i.batch AS batch
             FROM pto p LEFT JOIN interns i ON i.id = p.intern_id",
            "SELECT COUNT(*) FROM pto p",
            &filters,
            "p.created_at DESC",
            page,
        )
        .await
    }

    /// Approve, reject or amend a request. A decision records who made it.
    pub async fn decide(&self, id: &str, patch: PtoPatch, decided_by: &str) -> ApiResult<Pto> {
        let mut update = UpdateBuilder::new("pto")
            .set_opt("status", patch.status.map(|s| s.as_str()))
            .set_opt("reason", patch.reason);

        if matches!(patch.status, Some(LeaveStatus::Approved | LeaveStatus::Rejected)) {
            update = update
                .set("approved_by", decided_by)
                .set("approved_at", Utc::now());
        }

        let changed = update.execute(&self.db, "id", id).await?;
        if changed == 0 {
            return Err(ApiError::NotFound("PTO not found".to_string()));
        }

        tracing::info!(pto_id = %id, status = ?patch.status, by = %decided_by, "leave request updated");
        self.get(id).await
    }
}
