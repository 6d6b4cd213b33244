/// Office attendance marked by staff
use crate::{
    error::{ApiError, ApiResult},
    store::{fetch_all, interns::InternStore, new_id, Filters},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    HalfDay,
    Late,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: String,
    pub intern_id: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub remarks: Option<String>,
    pub marked_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAttendance {
    pub intern_id: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttendanceQuery {
    pub date: Option<NaiveDate>,
    pub intern_id: Option<String>,
}

pub struct AttendanceStore {
    db: SqlitePool,
    interns: Arc<InternStore>,
}

impl AttendanceStore {
    pub fn new(db: SqlitePool, interns: Arc<InternStore>) -> Self {
        Self { db, interns }
    }

    /// Insert or overwrite the record for (intern, date)
    pub async fn mark(&self, req: MarkAttendance, marked_by: &str) -> ApiResult<AttendanceRecord> {
        if !self.interns.exists(&req.intern_id).await? {
            return Err(ApiError::NotFound("Intern not found".to_string()));
        }

        let now = Utc::now();

        sqlx::query(
            "INSERT INTO office_attendance (id, intern_id, date, status, remarks, marked_by, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
             ON CONFLICT (intern_id, date) DO UPDATE SET
                status = excluded.status,
                remarks = excluded.remarks,
                marked_by = excluded.marked_by,
                updated_at = excluded.updated_at",
        )
        .bind(new_id())
        .bind(&req.intern_id)
        .bind(req.date)
        .bind(req.status)
        .bind(&req.remarks)
        .bind(marked_by)
        .bind(now)
        .execute(&self.db)
        .await?;

        sqlx::query_as("SELECT * FROM office_attendance WHERE intern_id = ?1 AND date = ?2")
            .bind(&req.intern_id)
            .bind(req.date)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::Internal("Failed to save attendance".to_string()))
    }

    pub async fn list(&self, query: AttendanceQuery) -> ApiResult<Vec<AttendanceRecord>> {
        let filters = Filters::new()
            .eq("date", query.date)
            .eq("intern_id", query.intern_id);
        fetch_all(&self.db, "SELECT * FROM office_attendance", &filters, "updated_at DESC").await
    }
}
