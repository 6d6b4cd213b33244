/// Read-side rollups for the admin dashboard
///
/// Every widget is answered by a single statement that joins what it needs;
/// nothing here loops a lookup per row.
use crate::{
    db::account::Role,
    error::{ApiError, ApiResult},
    store::{
        attendance::AttendanceRecord, batches::round_to, batches::Batch, dsu::DsuEntry,
        pto::PtoListItem, tasks::Task,
    },
};
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

pub const ACTIVITY_DEFAULT_LIMIT: i64 = 50;
pub const ACTIVITY_MAX_LIMIT: i64 = 200;

#[derive(Debug, Clone, Default, FromRow)]
struct StatCounts {
    total_interns: i64,
    active_interns: i64,
    submitted_dsus: i64,
    pending_dsus: i64,
    project_interns: i64,
    rs_interns: i64,
    completed_tasks: i64,
    total_tasks: i64,
    pending_ptos: i64,
    approved_ptos: i64,
    active_batches: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_interns: i64,
    pub active_interns: i64,
    pub dsu_completion: f64,
    #[serde(rename = "submittedDSUs")]
    pub submitted_dsus: i64,
    #[serde(rename = "pendingDSUs")]
    pub pending_dsus: i64,
    pub project_interns: i64,
    pub rs_interns: i64,
    pub task_completion: f64,
    pub completed_tasks: i64,
    pub total_tasks: i64,
    #[serde(rename = "pendingPTOs")]
    pub pending_ptos: i64,
    #[serde(rename = "approvedPTOs")]
    pub approved_ptos: i64,
    pub active_batches: i64,
}

/// `part / whole` as a percentage with one decimal, 0 when `whole` is 0
pub fn percentage(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    round_to(part as f64 / whole as f64 * 100.0, 1)
}

/// DSU row with the submitting intern's identity
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DashboardDsu {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub entry: DsuEntry,
    pub intern_name: Option<String>,
    pub intern_email: Option<String>,
    pub batch: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BatchPerformance {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub batch: Batch,
    pub avg_task_completion: f64,
    #[serde(rename = "avgDSUStreak")]
    pub avg_dsu_streak: f64,
}

/// Account merged with its intern profile, when one exists
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PerformanceUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub employee_id: Option<String>,
    pub is_active: bool,
    pub is_approved: bool,
    #[serde(rename = "internId", skip_serializing_if = "Option::is_none")]
    pub intern_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch: Option<String>,
    #[serde(rename = "internType", skip_serializing_if = "Option::is_none")]
    pub intern_type: Option<String>,
    #[serde(rename = "taskCount", skip_serializing_if = "Option::is_none")]
    pub task_count: Option<i64>,
    #[serde(rename = "completedTasks", skip_serializing_if = "Option::is_none")]
    pub completed_tasks: Option<i64>,
    #[serde(rename = "dsuStreak", skip_serializing_if = "Option::is_none")]
    pub dsu_streak: Option<i64>,
    #[serde(rename = "currentProject", skip_serializing_if = "Option::is_none")]
    pub current_project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub college: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cgpa: Option<f64>,
    #[serde(rename = "joinedDate", skip_serializing_if = "Option::is_none")]
    pub joined_date: Option<NaiveDate>,
    #[sqlx(json)]
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityReport {
    pub role: Role,
    pub tasks: Vec<Task>,
    pub dsus: Vec<DsuEntry>,
    pub attendance: Vec<AttendanceRecord>,
}

const DSU_WITH_INTERN: &str = "SELECT d.*, i.name AS intern_name, i.email AS intern_email, i.batch AS batch
    FROM dsu_entries d LEFT JOIN interns i ON i.id = d.intern_id";

fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

pub struct DashboardAggregator {
    db: SqlitePool,
}

impl DashboardAggregator {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn stats(&self) -> ApiResult<DashboardStats> {
        self.stats_at(Utc::now()).await
    }

    /// Headline counters as of `now`, in one round trip
    pub async fn stats_at(&self, now: DateTime<Utc>) -> ApiResult<DashboardStats> {
        let counts: StatCounts = sqlx::query_as(
            "SELECT
                (SELECT COUNT(*) FROM users
                  WHERE role IN ('intern', 'scrum_master') AND is_approved = 1) AS total_interns,
                (SELECT COUNT(*) FROM users
                  WHERE role IN ('intern', 'scrum_master') AND is_approved = 1 AND is_active = 1) AS active_interns,
                (SELECT COUNT(*) FROM dsu_entries
                  WHERE date = ?1 AND status IN ('submitted', 'reviewed')) AS submitted_dsus,
                (SELECT COUNT(*) FROM dsu_entries WHERE date = ?1 AND status = 'pending') AS pending_dsus,
                (SELECT COUNT(*) FROM interns WHERE intern_type = 'project') AS project_interns,
                (SELECT COUNT(*) FROM interns WHERE intern_type = 'rs') AS rs_interns,
                (SELECT COUNT(*) FROM tasks WHERE status = 'completed') AS completed_tasks,
                (SELECT COUNT(*) FROM tasks) AS total_tasks,
                (SELECT COUNT(*) FROM pto WHERE status = 'pending') AS pending_ptos,
                (SELECT COUNT(*) FROM pto WHERE status = 'approved' AND created_at >= ?2) AS approved_ptos,
                (SELECT COUNT(*) FROM batches WHERE status = 'active') AS active_batches",
        )
        .bind(now.date_naive())
        .bind(month_start(now))
        .fetch_one(&self.db)
        .await?;

        let stats = DashboardStats {
            total_interns: counts.total_interns,
            active_interns: counts.active_interns,
            dsu_completion: percentage(counts.submitted_dsus, counts.active_interns),
            submitted_dsus: counts.submitted_dsus,
            pending_dsus: counts.pending_dsus,
            project_interns: counts.project_interns,
            rs_interns: counts.rs_interns,
            task_completion: percentage(counts.completed_tasks, counts.total_tasks),
            completed_tasks: counts.completed_tasks,
            total_tasks: counts.total_tasks,
            pending_ptos: counts.pending_ptos,
            approved_ptos: counts.approved_ptos,
            active_batches: counts.active_batches,
        };

        tracing::debug!(
            submitted = stats.submitted_dsus,
            active = stats.active_interns,
            dsu_completion = stats.dsu_completion,
            "dashboard stats computed"
        );
        Ok(stats)
    }

    /// Today's entries with a non-empty blocker; all of them when `limit` is None
    pub async fn blocked_dsus(&self, today: NaiveDate, limit: Option<i64>) -> ApiResult<Vec<DashboardDsu>> {
        let rows = sqlx::query_as(&format!(
            "{} WHERE d.date = ?1 AND d.blockers IS NOT NULL AND TRIM(d.blockers) != ''
             ORDER BY d.submitted_at DESC LIMIT ?2",
            DSU_WITH_INTERN
        ))
        .bind(today)
        .bind(limit.unwrap_or(-1))
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    pub async fn recent_dsus(&self, limit: i64) -> ApiResult<Vec<DashboardDsu>> {
        let rows = sqlx::query_as(&format!(
            "{} ORDER BY d.submitted_at DESC LIMIT ?1",
            DSU_WITH_INTERN
        ))
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    pub async fn pending_ptos(&self, limit: i64) -> ApiResult<Vec<PtoListItem>> {
        let rows = sqlx::query_as(
            "SELECT p.*, COALESCE(p.name, i.name) AS intern_name, i.batch AS batch
             FROM pto p LEFT JOIN interns i ON i.id = p.intern_id
             WHERE p.status = 'pending'
             ORDER BY p.created_at DESC LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    /// Average completion and streak per active or completed batch
    pub async fn batch_performance(&self) -> ApiResult<Vec<BatchPerformance>> {
        let mut rows: Vec<BatchPerformance> = sqlx::query_as(
            "SELECT b.*,
                    COALESCE(AVG(i.completed_tasks * 100.0 / MAX(i.task_count, 1)), 0.0) AS avg_task_completion,
                    COALESCE(AVG(i.dsu_streak * 1.0), 0.0) AS avg_dsu_streak
             FROM batches b LEFT JOIN interns i ON i.batch = b.batch_id
             WHERE b.status IN ('active', 'completed')
             GROUP BY b.id
             ORDER BY b.start_date DESC",
        )
        .fetch_all(&self.db)
        .await?;

        for row in &mut rows {
            row.avg_task_completion = round_to(row.avg_task_completion, 2);
            row.avg_dsu_streak = round_to(row.avg_dsu_streak, 1);
        }
        Ok(rows)
    }

    /// Interns and scrum masters (or one role), each merged with a profile by email
    pub async fn performance_users(&self, role: Option<Role>) -> ApiResult<Vec<PerformanceUser>> {
        let mut sql = String::from(
            "SELECT u.id, u.name, u.email, u.role, u.employee_id, u.is_active, u.is_approved,
                    i.id AS intern_id, i.batch, i.intern_type, i.task_count, i.completed_tasks,
                    i.dsu_streak, i.current_project, i.phone, i.college, i.cgpa, i.joined_date,
                    COALESCE(i.skills, '[]') AS skills
             FROM users u LEFT JOIN interns i ON i.email = u.email",
        );
        match role {
            Some(_) => sql.push_str(" WHERE u.role = ?1"),
            None => sql.push_str(" WHERE u.role IN ('intern', 'scrum_master')"),
        }
        sql.push_str(" ORDER BY u.created_at DESC");

        let mut query = sqlx::query_as::<_, PerformanceUser>(&sql);
        if let Some(role) = role {
            query = query.bind(role.as_str());
        }
        Ok(query.fetch_all(&self.db).await?)
    }

    /// Recent work for one user. Interns: their tasks and entries.
    /// Scrum masters: entries they reviewed and attendance they marked.
    pub async fn activity(&self, user_id: &str, limit: i64) -> ApiResult<ActivityReport> {
        let user: Option<(String, String, String)> =
            sqlx::query_as("SELECT role, username, email FROM users WHERE id = ?1")
                .bind(user_id)
                .fetch_optional(&self.db)
                .await?;
        let (role, username, email) =
            user.ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
        let role: Role = role.parse()?;

        let mut report = ActivityReport {
            role,
            tasks: Vec::new(),
            dsus: Vec::new(),
            attendance: Vec::new(),
        };

        match role {
            Role::Intern => {
                report.tasks = sqlx::query_as(
                    "SELECT t.* FROM tasks t JOIN interns i ON i.id = t.intern_id
                     WHERE i.email = ?1 ORDER BY t.created_at DESC LIMIT ?2",
                )
                .bind(&email)
                .bind(limit)
                .fetch_all(&self.db)
                .await?;

                report.dsus = sqlx::query_as(
                    "SELECT d.* FROM dsu_entries d JOIN interns i ON i.id = d.intern_id
                     WHERE i.email = ?1 ORDER BY d.date DESC LIMIT ?2",
                )
                .bind(&email)
                .bind(limit)
                .fetch_all(&self.db)
                .await?;
            }
            Role::ScrumMaster => {
                report.dsus = sqlx::query_as(
                    "SELECT * FROM dsu_entries WHERE reviewed_by = ?1 ORDER BY reviewed_at DESC LIMIT ?2",
                )
                .bind(&username)
                .bind(limit)
                .fetch_all(&self.db)
                .await?;

                report.attendance = sqlx::query_as(
                    "SELECT * FROM office_attendance WHERE marked_by = ?1 ORDER BY updated_at DESC LIMIT ?2",
                )
                .bind(&username)
                .bind(limit)
                .fetch_all(&self.db)
                .await?;
            }
            Role::Admin => {}
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        store::{
            dsu::{CreateDsu, DsuPatch, DsuStore},
            interns::InternStore,
            tasks::{CreateTask, TaskPatch, TaskStatus, TaskStore},
        },
        testing,
    };
    use std::sync::Arc;

    #[test]
    fn test_percentage_guards_zero() {
        assert_eq!(percentage(3, 0), 0.0);
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(2, 2), 100.0);
    }

    #[test]
    fn test_month_start() {
        let now = Utc.with_ymd_and_hms(2024, 6, 17, 13, 5, 0).unwrap();
        assert_eq!(month_start(now), Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn test_stats_on_empty_store() {
        let dashboard = DashboardAggregator::new(testing::test_pool().await);
        let stats = dashboard.stats().await.unwrap();
        assert_eq!(stats.active_interns, 0);
        assert_eq!(stats.dsu_completion, 0.0);
        assert_eq!(stats.task_completion, 0.0);

        let json = serde_json::to_value(&stats).unwrap();
        assert!(json.get("submittedDSUs").is_some());
        assert!(json.get("approvedPTOs").is_some());
    }

    #[tokio::test]
    async fn test_widgets_join_intern_details() {
        let pool = testing::test_pool().await;
        let interns = Arc::new(InternStore::new(pool.clone()));
        let dsu = DsuStore::new(pool.clone(), interns.clone());
        let tasks = TaskStore::new(pool.clone(), interns.clone());
        let dashboard = DashboardAggregator::new(pool.clone());

        testing::seed_account(&pool, "ravi", Role::Intern).await;
        let intern = interns
            .insert_minimal("Ravi", "ravi@interns360.test", "active")
            .await
            .unwrap();
        let now = Utc::now();
        let today = now.date_naive();

        dsu.create(CreateDsu {
            intern_id: intern.id.clone(),
            date: today,
            yesterday: "setup".to_string(),
            today: "api".to_string(),
            blockers: Some("waiting on credentials".to_string()),
            learnings: None,
        })
        .await
        .unwrap();

        let task = tasks
            .create(
                CreateTask {
                    intern_id: intern.id.clone(),
                    title: "Ship".to_string(),
                    description: None,
                    project: None,
                    priority: None,
                    status: None,
                    assigned_by: None,
                    due_date: None,
                },
                "lead",
            )
            .await
            .unwrap();
        tasks
            .update(
                &task.id,
                TaskPatch {
                    status: Some(TaskStatus::Completed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let stats = dashboard.stats_at(now).await.unwrap();
        assert_eq!(stats.active_interns, 1);
        assert_eq!(stats.submitted_dsus, 1);
        assert_eq!(stats.dsu_completion, 100.0);
        assert_eq!(stats.task_completion, 100.0);

        let blocked = dashboard.blocked_dsus(today, None).await.unwrap();
        assert_eq!(blocked.len(), 1);
        assert_eq!(blocked[0].intern_name.as_deref(), Some("Ravi"));
        assert_eq!(blocked[0].intern_email.as_deref(), Some("ravi@interns360.test"));

        let users = dashboard.performance_users(None).await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].intern_id.as_deref(), Some(intern.id.as_str()));
        assert_eq!(users[0].completed_tasks, Some(1));

        let report = dashboard.activity(&users[0].id, 10).await.unwrap();
        assert_eq!(report.role, Role::Intern);
        assert_eq!(report.tasks.len(), 1);
        assert_eq!(report.dsus.len(), 1);
    }

    #[tokio::test]
    async fn test_scrum_master_activity() {
        let pool = testing::test_pool().await;
        let interns = Arc::new(InternStore::new(pool.clone()));
        let dsu = DsuStore::new(pool.clone(), interns.clone());
        let dashboard = DashboardAggregator::new(pool.clone());

        let sm = testing::seed_account(&pool, "sam", Role::ScrumMaster).await;
        let intern = interns.insert_minimal("Lee", "lee@corp.com", "active").await.unwrap();
        let entry = dsu
            .create(CreateDsu {
                intern_id: intern.id,
                date: "2024-06-03".parse().unwrap(),
                yesterday: "a".to_string(),
                today: "b".to_string(),
                blockers: None,
                learnings: None,
            })
            .await
            .unwrap();
        dsu.update(
            &entry.id,
            DsuPatch {
                feedback: Some("ok".to_string()),
                ..Default::default()
            },
            Some("sam"),
        )
        .await
        .unwrap();

        let report = dashboard.activity(&sm.id, 50).await.unwrap();
        assert_eq!(report.dsus.len(), 1);
        assert!(report.tasks.is_empty());

        let err = dashboard.activity("nobody", 50).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
