/// Resource repositories
///
/// One store per entity table. Shared here: pagination, equality/range
/// filters, and partial updates built on `sqlx::QueryBuilder`.

pub mod attendance;
pub mod batches;
pub mod catalog;
pub mod dsu;
pub mod interns;
pub mod mentors;
pub mod projects;
pub mod pto;
pub mod reviews;
pub mod tasks;

pub use attendance::AttendanceStore;
pub use batches::BatchStore;
pub use catalog::CatalogStore;
pub use dsu::DsuStore;
pub use interns::InternStore;
pub use mentors::MentorStore;
pub use projects::ProjectStore;
pub use pto::PtoStore;
pub use reviews::ReviewStore;
pub use tasks::TaskStore;

use crate::error::{ApiError, ApiResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, Sqlite, SqlitePool};

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Fresh machine-generated row id
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// One page of results plus the unpaged total
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub skip: i64,
    pub limit: i64,
}

/// `skip`/`limit` query parameters
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    pub fn new(skip: i64, limit: i64) -> ApiResult<Self> {
        let page = Self { skip, limit };
        page.validate()?;
        Ok(page)
    }

    pub fn validate(&self) -> ApiResult<()> {
        if self.skip < 0 {
            return Err(ApiError::Validation("skip must be non-negative".to_string()));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.limit) {
            return Err(ApiError::Validation(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        Ok(())
    }
}

/// Clamp a dashboard-style `limit` into `1..=max`
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> ApiResult<i64> {
    let limit = limit.unwrap_or(default);
    if (1..=max).contains(&limit) {
        Ok(limit)
    } else {
        Err(ApiError::Validation(format!("limit must be between 1 and {}", max)))
    }
}

/// A value bound into a dynamically built statement
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Int(i64),
    Real(f64),
    Bool(bool),
    Date(NaiveDate),
    Time(DateTime<Utc>),
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v as i64)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Real(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(v)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::Time(v)
    }
}

impl From<Vec<String>> for SqlValue {
    fn from(v: Vec<String>) -> Self {
        // Lists are stored as JSON text
        SqlValue::Text(serde_json::Value::from(v).to_string())
    }
}

fn push_value(qb: &mut QueryBuilder<'_, Sqlite>, value: SqlValue) {
    match value {
        SqlValue::Text(v) => qb.push_bind(v),
        SqlValue::Int(v) => qb.push_bind(v),
        SqlValue::Real(v) => qb.push_bind(v),
        SqlValue::Bool(v) => qb.push_bind(v),
        SqlValue::Date(v) => qb.push_bind(v),
        SqlValue::Time(v) => qb.push_bind(v),
    };
}

/// AND-joined `WHERE` conditions; each is an expression ending in an operator
#[derive(Debug, Clone, Default)]
pub struct Filters {
    conditions: Vec<(String, SqlValue)>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// `column = value` when a value is given
    pub fn eq<V: Into<SqlValue>>(self, column: &str, value: Option<V>) -> Self {
        self.cmp(column, "=", value)
    }

    /// `column <op> value` when a value is given
    pub fn cmp<V: Into<SqlValue>>(mut self, column: &str, op: &str, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.conditions
                .push((format!("{} {} ", column, op), value.into()));
        }
        self
    }

    pub fn apply(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        for (i, (expr, value)) in self.conditions.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            qb.push(expr);
            push_value(qb, value.clone());
        }
    }
}

/// Run a filtered, ordered, paged select plus its count
///
/// `select` and `count` are the statement heads up to (not including) `WHERE`.
pub async fn fetch_page<T>(
    pool: &SqlitePool,
    select: &str,
    count: &str,
    filters: &Filters,
    order_by: &str,
    page: Pagination,
) -> ApiResult<Page<T>>
where
    T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    page.validate()?;

    let mut count_qb = QueryBuilder::<Sqlite>::new(count);
    filters.apply(&mut count_qb);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut qb = QueryBuilder::<Sqlite>::new(select);
    filters.apply(&mut qb);
    qb.push(" ORDER BY ");
    qb.push(order_by);
    qb.push(" LIMIT ");
    qb.push_bind(page.limit);
    qb.push(" OFFSET ");
    qb.push_bind(page.skip);

    let items = qb.build_query_as::<T>().fetch_all(pool).await?;

    Ok(Page {
        items,
        total,
        skip: page.skip,
        limit: page.limit,
    })
}

/// Run a filtered select without paging
pub async fn fetch_all<T>(
    pool: &SqlitePool,
    select: &str,
    filters: &Filters,
    order_by: &str,
) -> ApiResult<Vec<T>>
where
    T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    let mut qb = QueryBuilder::<Sqlite>::new(select);
    filters.apply(&mut qb);
    qb.push(" ORDER BY ");
    qb.push(order_by);

    Ok(qb.build_query_as::<T>().fetch_all(pool).await?)
}

/// Partial `UPDATE` touching only the fields that were provided
#[derive(Debug)]
pub struct UpdateBuilder {
    table: &'static str,
    sets: Vec<(&'static str, SqlValue)>,
    conflict_message: Option<&'static str>,
}

impl UpdateBuilder {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            sets: Vec::new(),
            conflict_message: None,
        }
    }

    /// Message for a unique-key collision caused by this update
    pub fn on_conflict(mut self, message: &'static str) -> Self {
        self.conflict_message = Some(message);
        self
    }

    pub fn set<V: Into<SqlValue>>(mut self, column: &'static str, value: V) -> Self {
        self.sets.push((column, value.into()));
        self
    }

    pub fn set_opt<V: Into<SqlValue>>(self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.set(column, value),
            None => self,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Apply to the row whose `key_column` equals `key`, stamping `updated_at`.
    /// Returns the number of rows changed; empty patches are rejected.
    pub async fn execute(self, pool: &SqlitePool, key_column: &str, key: &str) -> ApiResult<u64> {
        if self.sets.is_empty() {
            return Err(ApiError::Validation("No fields to update".to_string()));
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!("UPDATE {} SET ", self.table));
        for (column, value) in self.sets {
            qb.push(column);
            qb.push(" = ");
            push_value(&mut qb, value);
            qb.push(", ");
        }
        qb.push("updated_at = ");
        qb.push_bind(Utc::now());
        qb.push(format!(" WHERE {} = ", key_column));
        qb.push_bind(key.to_string());

        let conflict = self.conflict_message;
        let result = qb.build().execute(pool).await.map_err(|e| match conflict {
            Some(message) => ApiError::unique_or(e, message),
            None => ApiError::Database(e),
        })?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[derive(Debug, FromRow)]
    struct Org {
        name: String,
    }

    async fn seed_orgs(pool: &SqlitePool, names: &[&str]) {
        for name in names {
            sqlx::query(
                "INSERT INTO organizations (id, name, created_at, updated_at) VALUES (?, ?, ?, ?)",
            )
            .bind(new_id())
            .bind(*name)
            .bind(Utc::now())
            .bind(Utc::now())
            .execute(pool)
            .await
            .unwrap();
        }
    }

    #[test]
    fn test_pagination_bounds() {
        assert!(Pagination::new(0, 1).is_ok());
        assert!(Pagination::new(0, 100).is_ok());
        assert!(Pagination::new(0, 0).is_err());
        assert!(Pagination::new(0, 101).is_err());
        assert!(Pagination::new(-1, 10).is_err());
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None, 10, 50).unwrap(), 10);
        assert_eq!(clamp_limit(Some(50), 10, 50).unwrap(), 50);
        assert!(clamp_limit(Some(51), 10, 50).is_err());
    }

    #[tokio::test]
    async fn test_fetch_page_counts_before_paging() {
        let pool = testing::test_pool().await;
        seed_orgs(&pool, &["acme", "globex", "initech"]).await;

        let page: Page<Org> = fetch_page(
            &pool,
            "SELECT name FROM organizations",
            "SELECT COUNT(*) FROM organizations",
            &Filters::new(),
            "name ASC",
            Pagination::new(1, 1).unwrap(),
        )
        .await
        .unwrap();

        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name, "globex");

        let filtered: Page<Org> = fetch_page(
            &pool,
            "SELECT name FROM organizations",
            "SELECT COUNT(*) FROM organizations",
            &Filters::new().eq("name", Some("acme")).eq::<&str>("name", None),
            "name ASC",
            Pagination::default(),
        )
        .await
        .unwrap();
        assert_eq!(filtered.total, 1);
    }

    #[tokio::test]
    async fn test_update_builder_rejects_empty_and_maps_conflicts() {
        let pool = testing::test_pool().await;
        seed_orgs(&pool, &["acme", "globex"]).await;

        let err = UpdateBuilder::new("organizations")
            .execute(&pool, "name", "acme")
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "No fields to update");

        let err = UpdateBuilder::new("organizations")
            .on_conflict("Organization already exists")
            .set("name", "globex")
            .execute(&pool, "name", "acme")
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "Organization already exists");

        let changed = UpdateBuilder::new("organizations")
            .set_opt::<&str>("name", None)
            .set("name", "acme corp")
            .execute(&pool, "name", "acme")
            .await
            .unwrap();
        assert_eq!(changed, 1);
    }
}
