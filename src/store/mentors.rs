/// Peer mentorship requests between users
use crate::{
    account::AccountManager,
    db::account::{Account, Role},
    error::{ApiError, ApiResult},
    store::{fetch_all, new_id, Filters},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MentorRequest {
    pub id: String,
    pub requester_user_id: String,
    pub requester_email: String,
    pub requester_name: String,
    pub mentor_user_id: String,
    pub mentor_email: String,
    pub mentor_name: String,
    pub status: RequestStatus,
    pub approved_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMentorRequest {
    pub mentor_user_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MentorDecision {
    pub status: RequestStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MentorQuery {
    pub status: Option<RequestStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MentorContact {
    pub user_id: String,
    pub name: String,
    pub email: String,
}

/// Approved relationships for one user
#[derive(Debug, Clone, Serialize)]
pub struct Mentorships {
    pub mentor: Option<MentorContact>,
    pub mentees: Vec<MentorContact>,
}

pub struct MentorStore {
    db: SqlitePool,
    accounts: Arc<AccountManager>,
}

impl MentorStore {
    pub fn new(db: SqlitePool, accounts: Arc<AccountManager>) -> Self {
        Self { db, accounts }
    }

    /// Ask another intern to mentor the requester
    pub async fn create(&self, requester: &Account, req: CreateMentorRequest) -> ApiResult<MentorRequest> {
        if requester.id == req.mentor_user_id {
            return Err(ApiError::Validation(
                "Cannot request yourself as mentor".to_string(),
            ));
        }

        let mentor = self
            .accounts
            .find_by_id(&req.mentor_user_id)
            .await?
            .filter(|m| m.role == Role::Intern)
            .ok_or_else(|| ApiError::NotFound("Mentor not found".to_string()))?;

        let pending: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM mentor_requests
                           WHERE requester_user_id = ?1 AND mentor_user_id = ?2 AND status = 'pending')",
        )
        .bind(&requester.id)
        .bind(&mentor.id)
        .fetch_one(&self.db)
        .await?;
        if pending {
            return Err(ApiError::Validation("Request already pending".to_string()));
        }

        let id = new_id();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO mentor_requests (id, requester_user_id, requester_email, requester_name,
                                          mentor_user_id, mentor_email, mentor_name, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'pending', ?8, ?8)",
        )
        .bind(&id)
        .bind(&requester.id)
        .bind(&requester.email)
        .bind(&requester.name)
        .bind(&mentor.id)
        .bind(&mentor.email)
        .bind(&mentor.name)
        .bind(now)
        .execute(&self.db)
        .await?;

        tracing::info!(request_id = %id, requester = %requester.id, mentor = %mentor.id, "mentor requested");
        self.get(&id).await
    }

    pub async fn get(&self, id: &str) -> ApiResult<MentorRequest> {
        sqlx::query_as::<_, MentorRequest>("SELECT * FROM mentor_requests WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::NotFound("Mentor request not found".to_string()))
    }

    pub async fn list(&self, query: MentorQuery) -> ApiResult<Vec<MentorRequest>> {
        let filters = Filters::new().eq("status", query.status.map(|s| s.as_str()));
        fetch_all(&self.db, "SELECT * FROM mentor_requests", &filters, "created_at DESC").await
    }

    /// Requests the user made or received
    pub async fn for_user(&self, user_id: &str) -> ApiResult<Vec<MentorRequest>> {
        Ok(sqlx::query_as(
            "SELECT * FROM mentor_requests
             WHERE requester_user_id = ?1 OR mentor_user_id = ?1
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?)
    }

    pub async fn decide(&self, id: &str, decision: MentorDecision, decided_by: &str) -> ApiResult<MentorRequest> {
        let result = sqlx::query(
            "UPDATE mentor_requests SET status = ?1, approved_by = ?2, updated_at = ?3 WHERE id = ?4",
        )
        .bind(decision.status)
        .bind(decided_by)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Mentor request not found".to_string()));
        }
        self.get(id).await
    }

    pub async fn mentorships(&self, user_id: &str) -> ApiResult<Mentorships> {
        let mentor = sqlx::query_as::<_, MentorContact>(
            "SELECT mentor_user_id AS user_id, mentor_name AS name, mentor_email AS email
             FROM mentor_requests
             WHERE requester_user_id = ?1 AND status = 'approved'
             ORDER BY updated_at DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        let mentees = sqlx::query_as::<_, MentorContact>(
            "SELECT requester_user_id AS user_id, requester_name AS name, requester_email AS email
             FROM mentor_requests
             WHERE mentor_user_id = ?1 AND status = 'approved'
             ORDER BY updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(Mentorships { mentor, mentees })
    }
}
