/// Batch categories: years, months and organizations
use crate::{
    error::{ApiError, ApiResult},
    store::new_id,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use validator::Validate;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BatchYear {
    pub id: String,
    pub year: i64,
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BatchMonth {
    pub id: String,
    pub name: String,
    #[serde(rename = "order")]
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBatchYear {
    #[validate(range(min = 2000, max = 2100))]
    pub year: i64,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBatchMonth {
    #[validate(length(min = 1, max = 20))]
    pub name: String,
    #[validate(range(min = 1, max = 12))]
    pub order: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOrganization {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

pub struct CatalogStore {
    db: SqlitePool,
}

impl CatalogStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn list_years(&self) -> ApiResult<Vec<BatchYear>> {
        Ok(sqlx::query_as("SELECT * FROM batch_years ORDER BY year DESC")
            .fetch_all(&self.db)
            .await?)
    }

    pub async fn create_year(&self, req: CreateBatchYear) -> ApiResult<BatchYear> {
        req.validate()?;
        let id = new_id();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO batch_years (id, year, label, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
        )
        .bind(&id)
        .bind(req.year)
        .bind(&req.label)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(|e| ApiError::unique_or(e, "Batch year already exists"))?;

        Ok(sqlx::query_as("SELECT * FROM batch_years WHERE id = ?1")
            .bind(&id)
            .fetch_one(&self.db)
            .await?)
    }

    pub async fn list_months(&self) -> ApiResult<Vec<BatchMonth>> {
        Ok(sqlx::query_as("SELECT * FROM batch_months ORDER BY sort_order ASC")
            .fetch_all(&self.db)
            .await?)
    }

    pub async fn create_month(&self, req: CreateBatchMonth) -> ApiResult<BatchMonth> {
        req.validate()?;
        let id = new_id();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO batch_months (id, name, sort_order, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
        )
        .bind(&id)
        .bind(req.name.trim())
        .bind(req.order)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(|e| ApiError::unique_or(e, "Batch month already exists"))?;

        Ok(sqlx::query_as("SELECT * FROM batch_months WHERE id = ?1")
            .bind(&id)
            .fetch_one(&self.db)
            .await?)
    }

    pub async fn list_organizations(&self) -> ApiResult<Vec<Organization>> {
        Ok(sqlx::query_as("SELECT * FROM organizations ORDER BY name ASC")
            .fetch_all(&self.db)
            .await?)
    }

    pub async fn create_organization(&self, req: CreateOrganization) -> ApiResult<Organization> {
        req.validate()?;
        let id = new_id();
        let now = Utc::now();

        sqlx::query("INSERT INTO organizations (id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)")
            .bind(&id)
            .bind(req.name.trim())
            .bind(now)
            .execute(&self.db)
            .await
            .map_err(|e| ApiError::unique_or(e, "Organization already exists"))?;

        Ok(sqlx::query_as("SELECT * FROM organizations WHERE id = ?1")
            .bind(&id)
            .fetch_one(&self.db)
            .await?)
    }

    /// Check that each given category reference points at a stored row
    pub async fn ensure_refs(
        &self,
        year_id: Option<&str>,
        month_id: Option<&str>,
        organization_id: Option<&str>,
    ) -> ApiResult<()> {
        let checks = [
            ("batch_years", year_id, "Batch year not found"),
            ("batch_months", month_id, "Batch month not found"),
            ("organizations", organization_id, "Organization not found"),
        ];

        for (table, id, missing) in checks {
            let Some(id) = id else { continue };
            let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1)", table);
            let exists: bool = sqlx::query_scalar(&sql).bind(id).fetch_one(&self.db).await?;
            if !exists {
                return Err(ApiError::NotFound(missing.to_string()));
            }
        }
        Ok(())
    }
}
