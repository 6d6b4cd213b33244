/// Dashboard, analytics and performance endpoints for staff
use crate::{
    api::middleware::{ApiJson, ApiQuery},
    auth::{AdminUser, StaffUser},
    context::AppContext,
    dashboard::{
        ActivityReport, BatchPerformance, DashboardDsu, DashboardStats, PerformanceUser,
        ACTIVITY_DEFAULT_LIMIT, ACTIVITY_MAX_LIMIT,
    },
    db::account::Role,
    error::ApiResult,
    store::{
        clamp_limit,
        pto::PtoListItem,
        reviews::{CreateReview, PerformanceReview, ReviewQuery},
        MAX_PAGE_SIZE,
    },
};
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Deserialize;

/// Dashboard widgets show a handful of rows unless asked otherwise
const WIDGET_DEFAULT_LIMIT: i64 = 5;

/// Build admin API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        // Dashboard widgets
        .route("/admin/dashboard/stats", get(stats))
        .route("/admin/dashboard/blocked-interns", get(blocked_interns))
        .route("/admin/dashboard/blocked-dsus", get(blocked_dsus))
        .route("/admin/dashboard/recent-dsus", get(recent_dsus))
        .route("/admin/dashboard/pending-ptos", get(pending_ptos))
        .route("/admin/analytics/batch-performance", get(batch_performance))
        // Performance
        .route("/admin/performance/users", get(performance_users))
        .route("/admin/performance/activity", get(performance_activity))
        .route(
            "/admin/performance/review",
            get(list_reviews).post(create_review),
        )
}

// ============================================================================
// Dashboard
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct LimitQuery {
    limit: Option<i64>,
}

async fn stats(
    State(ctx): State<AppContext>,
    _staff: StaffUser,
) -> ApiResult<Json<DashboardStats>> {
    Ok(Json(ctx.dashboard.stats().await?))
}

/// Every blocked entry for today
async fn blocked_interns(
    State(ctx): State<AppContext>,
    _staff: StaffUser,
) -> ApiResult<Json<Vec<DashboardDsu>>> {
    let today = Utc::now().date_naive();
    Ok(Json(ctx.dashboard.blocked_dsus(today, None).await?))
}

async fn blocked_dsus(
    State(ctx): State<AppContext>,
    _staff: StaffUser,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> ApiResult<Json<Vec<DashboardDsu>>> {
    let limit = clamp_limit(query.limit, WIDGET_DEFAULT_LIMIT, MAX_PAGE_SIZE)?;
    let today = Utc::now().date_naive();
    Ok(Json(ctx.dashboard.blocked_dsus(today, Some(limit)).await?))
}

async fn recent_dsus(
    State(ctx): State<AppContext>,
    _staff: StaffUser,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> ApiResult<Json<Vec<DashboardDsu>>> {
    let limit = clamp_limit(query.limit, WIDGET_DEFAULT_LIMIT, MAX_PAGE_SIZE)?;
    Ok(Json(ctx.dashboard.recent_dsus(limit).await?))
}

async fn pending_ptos(
    State(ctx): State<AppContext>,
    _staff: StaffUser,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> ApiResult<Json<Vec<PtoListItem>>> {
    let limit = clamp_limit(query.limit, WIDGET_DEFAULT_LIMIT, MAX_PAGE_SIZE)?;
    Ok(Json(ctx.dashboard.pending_ptos(limit).await?))
}

async fn batch_performance(
    State(ctx): State<AppContext>,
    _staff: StaffUser,
) -> ApiResult<Json<Vec<BatchPerformance>>> {
    Ok(Json(ctx.dashboard.batch_performance().await?))
}

// ============================================================================
// Performance
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct PerformanceUsersQuery {
    role: Option<Role>,
}

async fn performance_users(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    ApiQuery(query): ApiQuery<PerformanceUsersQuery>,
) -> ApiResult<Json<Vec<PerformanceUser>>> {
    Ok(Json(ctx.dashboard.performance_users(query.role).await?))
}

#[derive(Debug, Deserialize)]
struct ActivityQuery {
    user_id: String,
    limit: Option<i64>,
}

async fn performance_activity(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    ApiQuery(query): ApiQuery<ActivityQuery>,
) -> ApiResult<Json<ActivityReport>> {
    let limit = clamp_limit(query.limit, ACTIVITY_DEFAULT_LIMIT, ACTIVITY_MAX_LIMIT)?;
    Ok(Json(ctx.dashboard.activity(&query.user_id, limit).await?))
}

async fn list_reviews(
    State(ctx): State<AppContext>,
    _staff: StaffUser,
    ApiQuery(query): ApiQuery<ReviewQuery>,
) -> ApiResult<Json<Vec<PerformanceReview>>> {
    Ok(Json(ctx.reviews.list(query).await?))
}

async fn create_review(
    State(ctx): State<AppContext>,
    StaffUser(staff): StaffUser,
    ApiJson(req): ApiJson<CreateReview>,
) -> ApiResult<(StatusCode, Json<PerformanceReview>)> {
    let review = ctx.reviews.create(req, &staff.account.username).await?;
    Ok((StatusCode::CREATED, Json(review)))
}
