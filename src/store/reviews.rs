/// Performance reviews of interns
use crate::{
    error::{ApiError, ApiResult},
    store::{fetch_all, interns::InternStore, new_id, Filters},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use std::sync::Arc;
use validator::Validate;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReview {
    pub id: String,
    pub intern_id: String,
    pub technical_skills: i64,
    pub communication_skills: i64,
    pub punctuality: i64,
    pub problem_solving: i64,
    pub teamwork: i64,
    pub overall_rating: f64,
    pub performance_review: Option<String>,
    pub continuation_decision: Option<bool>,
    pub comments: Option<String>,
    pub review_type: Option<String>,
    pub review_date: NaiveDate,
    pub reviewed_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReview {
    #[validate(length(min = 1))]
    pub intern_id: String,
    #[validate(range(min = 1, max = 5))]
    pub technical_skills: i64,
    #[validate(range(min = 1, max = 5))]
    pub communication_skills: i64,
    #[validate(range(min = 1, max = 5))]
    pub punctuality: i64,
    #[validate(range(min = 1, max = 5))]
    pub problem_solving: i64,
    #[validate(range(min = 1, max = 5))]
    pub teamwork: i64,
    #[validate(range(min = 0.0, max = 5.0))]
    pub overall_rating: f64,
    pub performance_review: Option<String>,
    pub continuation_decision: Option<bool>,
    pub comments: Option<String>,
    pub review_type: Option<String>,
    pub review_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewQuery {
    pub intern_id: Option<String>,
}

pub struct ReviewStore {
    db: SqlitePool,
    interns: Arc<InternStore>,
}

impl ReviewStore {
    pub fn new(db: SqlitePool, interns: Arc<InternStore>) -> Self {
        Self { db, interns }
    }

    pub async fn create(&self, req: CreateReview, reviewed_by: &str) -> ApiResult<PerformanceReview> {
        req.validate()?;

        if !self.interns.exists(&req.intern_id).await? {
            return Err(ApiError::NotFound("Intern not found".to_string()));
        }

        let id = new_id();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO performance_reviews (id, intern_id, technical_skills, communication_skills, punctuality,
                                              problem_solving, teamwork, overall_rating, performance_review,
                                              continuation_decision, comments, review_type, review_date,
                                              reviewed_by, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)",
        )
        .bind(&id)
        .bind(&req.intern_id)
        .bind(req.technical_skills)
        .bind(req.communication_skills)
        .bind(req.punctuality)
        .bind(req.problem_solving)
        .bind(req.teamwork)
        .bind(req.overall_rating)
        .bind(&req.performance_review)
        .bind(req.continuation_decision)
        .bind(&req.comments)
        .bind(&req.review_type)
        .bind(req.review_date.unwrap_or_else(|| now.date_naive()))
        .bind(reviewed_by)
        .bind(now)
        .execute(&self.db)
        .await?;

        tracing::info!(review_id = %id, intern_id = %req.intern_id, by = %reviewed_by, "performance review recorded");

        Ok(sqlx::query_as("SELECT * FROM performance_reviews WHERE id = ?1")
            .bind(&id)
            .fetch_one(&self.db)
            .await?)
    }

    /// Newest review first
    pub async fn list(&self, query: ReviewQuery) -> ApiResult<Vec<PerformanceReview>> {
        let filters = Filters::new().eq("intern_id", query.intern_id);
        fetch_all(
            &self.db,
            "SELECT * FROM performance_reviews",
            &filters,
            "review_date DESC, created_at DESC",
        )
        .await
    }
}
