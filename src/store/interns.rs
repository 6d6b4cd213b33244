/// Intern profiles and their denormalized counters
use crate::{
    error::{ApiError, ApiResult},
    store::{fetch_page, new_id, Filters, Page, Pagination, UpdateBuilder},
    validation,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use validator::Validate;

const DUPLICATE_INTERN: &str = "Intern already exists";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Intern {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub college: Option<String>,
    pub degree: Option<String>,
    pub branch: Option<String>,
    pub year: Option<i64>,
    pub cgpa: Option<f64>,
    pub domain: Option<String>,
    pub intern_type: Option<String>,
    pub pay_type: Option<String>,
    pub is_paid: bool,
    pub status: String,
    pub current_project: Option<String>,
    pub mentor: Option<String>,
    pub batch: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub joined_date: Option<NaiveDate>,
    pub task_count: i64,
    pub completed_tasks: i64,
    pub dsu_streak: i64,
    #[sqlx(json)]
    pub skills: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntern {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub phone: Option<String>,
    pub college: Option<String>,
    pub degree: Option<String>,
    pub branch: Option<String>,
    pub year: Option<i64>,
    #[validate(range(min = 0.0, max = 10.0))]
    pub cgpa: Option<f64>,
    pub domain: Option<String>,
    pub intern_type: Option<String>,
    pub pay_type: Option<String>,
    #[serde(default)]
    pub is_paid: bool,
    pub mentor: Option<String>,
    pub batch: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub skills: Vec<String>,
}

/// Admin-patchable intern fields
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InternPatch {
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub college: Option<String>,
    pub degree: Option<String>,
    pub branch: Option<String>,
    pub year: Option<i64>,
    #[validate(range(min = 0.0, max = 10.0))]
    pub cgpa: Option<f64>,
    pub domain: Option<String>,
    pub intern_type: Option<String>,
    pub pay_type: Option<String>,
    pub is_paid: Option<bool>,
    pub status: Option<String>,
    pub current_project: Option<String>,
    pub mentor: Option<String>,
    pub batch: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub skills: Option<Vec<String>>,
}

/// Fields an intern may set on their own profile
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProfilePatch {
    pub current_project: Option<String>,
    pub mentor: Option<String>,
    pub skills: Option<Vec<String>>,
    pub phone: Option<String>,
    pub intern_type: Option<String>,
    pub pay_type: Option<String>,
    pub college: Option<String>,
    pub degree: Option<String>,
    pub batch: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub joined_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternQuery {
    pub status: Option<String>,
    pub intern_type: Option<String>,
    pub batch: Option<String>,
}

/// Counters kept on the intern row for cheap dashboard reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    TaskCount,
    CompletedTasks,
    DsuStreak,
}

impl Counter {
    fn column(self) -> &'static str {
        match self {
            Counter::TaskCount => "task_count",
            Counter::CompletedTasks => "completed_tasks",
            Counter::DsuStreak => "dsu_streak",
        }
    }
}

pub struct InternStore {
    db: SqlitePool,
}

impl InternStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create an intern in `onboarding` with zeroed counters, joined today
    pub async fn create(&self, req: CreateIntern) -> ApiResult<Intern> {
        req.validate()?;
        let email = validation::normalize_email(&req.email);

        if self.find_by_email(&email).await?.is_some() {
            return Err(ApiError::Validation(DUPLICATE_INTERN.to_string()));
        }

        if let Some(batch_id) = req.batch.as_deref() {
            self.ensure_batch_has_room(batch_id).await?;
        }

        let id = new_id();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO interns (id, name, email, phone, college, degree, branch, year, cgpa, domain,
                                  intern_type, pay_type, is_paid, status, mentor, batch, start_date, end_date,
                                  joined_date, task_count, completed_tasks, dsu_streak, skills, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, 'onboarding', ?14, ?15, ?16, ?17,
                     ?18, 0, 0, 0, ?19, ?20, ?20)",
        )
        .bind(&id)
        .bind(req.name.trim())
        .bind(&email)
        .bind(&req.phone)
        .bind(&req.college)
        .bind(&req.degree)
        .bind(&req.branch)
        .bind(req.year)
        .bind(req.cgpa)
        .bind(&req.domain)
        .bind(&req.intern_type)
        .bind(&req.pay_type)
        .bind(req.is_paid)
        .bind(&req.mentor)
        .bind(&req.batch)
        .bind(req.start_date)
        .bind(req.end_date)
        .bind(now.date_naive())
        .bind(sqlx::types::Json(&req.skills))
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(|e| ApiError::unique_or(e, DUPLICATE_INTERN))?;

        tracing::info!(intern_id = %id, batch = ?req.batch, "intern created");
        self.get(&id).await
    }

    /// Moving into a different batch needs the same checks as creating into it
    async fn ensure_can_move(&self, current: Option<&str>, target: Option<&str>) -> ApiResult<()> {
        match target {
            Some(batch_id) if current != Some(batch_id) => self.ensure_batch_has_room(batch_id).await,
            _ => Ok(()),
        }
    }

    async fn ensure_batch_has_room(&self, batch_id: &str) -> ApiResult<()> {
        let row: Option<(i64, i64)> = sqlx::query_as(
            "SELECT b.max_interns, (SELECT COUNT(*) FROM interns i WHERE i.batch = b.batch_id)
             FROM batches b WHERE b.batch_id = ?1",
        )
        .bind(batch_id)
        .fetch_optional(&self.db)
        .await?;

        match row {
            None => Err(ApiError::NotFound("Batch not found".to_string())),
            Some((max, current)) if current >= max => {
                Err(ApiError::Validation("Batch is full".to_string()))
            }
            Some(_) => Ok(()),
        }
    }

    pub async fn get(&self, id: &str) -> ApiResult<Intern> {
        sqlx::query_as::<_, Intern>("SELECT * FROM interns WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::NotFound("Intern not found".to_string()))
    }

    pub async fn find_by_email(&self, email: &str) -> ApiResult<Option<Intern>> {
        let intern = sqlx::query_as::<_, Intern>("SELECT * FROM interns WHERE email = ?1")
            .bind(validation::normalize_email(email))
            .fetch_optional(&self.db)
            .await?;
        Ok(intern)
    }

    pub async fn exists(&self, id: &str) -> ApiResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM interns WHERE id = ?1)")
            .bind(id)
            .fetch_one(&self.db)
            .await?;
        Ok(exists)
    }

    pub async fn list(&self, query: InternQuery, page: Pagination) -> ApiResult<Page<Intern>> {
        let filters = Filters::new()
            .eq("status", query.status)
            .eq("intern_type", query.intern_type)
            .eq("batch", query.batch);

        fetch_page(
            &self.db,
            "SELECT * FROM interns",
            "SELECT COUNT(*) FROM interns",
            &filters,
            "created_at DESC",
            page,
        )
        .await
    }

    pub async fn update(&self, id: &str, patch: InternPatch) -> ApiResult<Intern> {
        patch.validate()?;

        if patch.batch.is_some() {
            let current = self.get(id).await?;
            self.ensure_can_move(current.batch.as_deref(), patch.batch.as_deref())
                .await?;
        }

        let changed = UpdateBuilder::new("interns")
            .on_conflict(DUPLICATE_INTERN)
            .set_opt("name", patch.name)
            .set_opt("email", patch.email.map(|e| validation::normalize_email(&e)))
            .set_opt("phone", patch.phone)
            .set_opt("college", patch.college)
            .set_opt("degree", patch.degree)
            .set_opt("branch", patch.branch)
            .set_opt("year", patch.year)
            .set_opt("cgpa", patch.cgpa)
            .set_opt("domain", patch.domain)
            .set_opt("intern_type", patch.intern_type)
            .set_opt("pay_type", patch.pay_type)
            .set_opt("is_paid", patch.is_paid)
            .set_opt("status", patch.status)
            .set_opt("current_project", patch.current_project)
            .set_opt("mentor", patch.mentor)
            .set_opt("batch", patch.batch)
            .set_opt("start_date", patch.start_date)
            .set_opt("end_date", patch.end_date)
            .set_opt("skills", patch.skills)
            .execute(&self.db, "id", id)
            .await?;

        if changed == 0 {
            return Err(ApiError::NotFound("Intern not found".to_string()));
        }
        self.get(id).await
    }

    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM interns WHERE id = ?1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Intern not found".to_string()));
        }
        Ok(())
    }

    /// Update the caller's profile, creating an `active` one on first write
    pub async fn upsert_profile(&self, email: &str, name: &str, patch: ProfilePatch) -> ApiResult<Intern> {
        let email = validation::normalize_email(email);

        let existing = self.find_by_email(&email).await?;
        let current_batch = existing.as_ref().and_then(|i| i.batch.as_deref());
        self.ensure_can_move(current_batch, patch.batch.as_deref())
            .await?;

        if existing.is_none() {
            self.insert_minimal(name, &email, "active").await?;
        }

        let update = UpdateBuilder::new("interns")
            .set_opt("current_project", patch.current_project)
            .set_opt("mentor", patch.mentor)
            .set_opt("skills", patch.skills)
            .set_opt("phone", patch.phone)
            .set_opt("intern_type", patch.intern_type)
            .set_opt("pay_type", patch.pay_type)
            .set_opt("college", patch.college)
            .set_opt("degree", patch.degree)
            .set_opt("batch", patch.batch)
            .set_opt("start_date", patch.start_date)
            .set_opt("end_date", patch.end_date)
            .set_opt("joined_date", patch.joined_date);

        if !update.is_empty() {
            update.execute(&self.db, "email", &email).await?;
        }

        self.find_by_email(&email)
            .await?
            .ok_or_else(|| ApiError::Internal("Failed to update profile".to_string()))
    }

    /// Bare profile for a newly registered account
    pub async fn insert_minimal(&self, name: &str, email: &str, status: &str) -> ApiResult<Intern> {
        let id = new_id();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO interns (id, name, email, status, joined_date, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        )
        .bind(&id)
        .bind(name)
        .bind(validation::normalize_email(email))
        .bind(status)
        .bind(now.date_naive())
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(|e| ApiError::unique_or(e, DUPLICATE_INTERN))?;

        self.get(&id).await
    }

    /// Atomic in-store increment (negative to decrement, floored at zero)
    pub async fn adjust(&self, intern_id: &str, counter: Counter, delta: i64) -> ApiResult<()> {
        let column = counter.column();
        let sql = format!(
            "UPDATE interns SET {col} = MAX({col} + ?1, 0), updated_at = ?2 WHERE id = ?3",
            col = column
        );

        sqlx::query(&sql)
            .bind(delta)
            .bind(Utc::now())
            .bind(intern_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Stamp the current project on each listed intern
    pub async fn set_current_project(&self, intern_ids: &[String], project: &str) -> ApiResult<()> {
        if intern_ids.is_empty() {
            return Ok(());
        }

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE interns SET current_project = ");
        qb.push_bind(project)
            .push(", updated_at = ")
            .push_bind(Utc::now())
            .push(" WHERE id IN (");
        let mut ids = qb.separated(", ");
        for id in intern_ids {
            ids.push_bind(id);
        }
        ids.push_unseparated(")");

        qb.build().execute(&self.db).await?;
        Ok(())
    }
}
