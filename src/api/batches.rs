/// Batch and batch catalog endpoints
use crate::{
    api::middleware::{ApiJson, ApiPath, ApiQuery},
    auth::{AdminUser, AuthUser, StaffUser},
    context::AppContext,
    error::ApiResult,
    store::{
        batches::{BatchDetail, BatchPatch, BatchQuery, BatchSummary, CreateBatch},
        catalog::{
            BatchMonth, BatchYear, CreateBatchMonth, CreateBatchYear, CreateOrganization,
            Organization,
        },
        interns::Intern,
    },
};
use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/batches", get(list_batches).post(create_batch))
        .route(
            "/batches/:batch_id",
            get(get_batch).patch(update_batch).delete(delete_batch),
        )
        .route("/batches/:batch_id/interns", get(batch_interns))
        // Catalog
        .route("/batch-years", get(list_years).post(create_year))
        .route("/batch-months", get(list_months).post(create_month))
        .route(
            "/organizations",
            get(list_organizations).post(create_organization),
        )
}

// ============================================================================
// Batches
// ============================================================================

async fn create_batch(
    State(ctx): State<AppContext>,
    StaffUser(staff): StaffUser,
    ApiJson(req): ApiJson<CreateBatch>,
) -> ApiResult<(StatusCode, Json<BatchSummary>)> {
    let batch = ctx.batches.create(req, &staff.account.username).await?;
    Ok((StatusCode::CREATED, Json(batch)))
}

async fn list_batches(
    State(ctx): State<AppContext>,
    _auth: AuthUser,
    ApiQuery(query): ApiQuery<BatchQuery>,
) -> ApiResult<Json<Vec<BatchSummary>>> {
    Ok(Json(ctx.batches.list(query).await?))
}

async fn get_batch(
    State(ctx): State<AppContext>,
    _auth: AuthUser,
    ApiPath(batch_id): ApiPath<String>,
) -> ApiResult<Json<BatchDetail>> {
    Ok(Json(ctx.batches.detail(&batch_id).await?))
}

async fn update_batch(
    State(ctx): State<AppContext>,
    _staff: StaffUser,
    ApiPath(batch_id): ApiPath<String>,
    ApiJson(patch): ApiJson<BatchPatch>,
) -> ApiResult<Json<BatchSummary>> {
    Ok(Json(ctx.batches.update(&batch_id, patch).await?))
}

async fn delete_batch(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    ApiPath(batch_id): ApiPath<String>,
) -> ApiResult<StatusCode> {
    ctx.batches.delete(&batch_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn batch_interns(
    State(ctx): State<AppContext>,
    _auth: AuthUser,
    ApiPath(batch_id): ApiPath<String>,
) -> ApiResult<Json<Vec<Intern>>> {
    Ok(Json(ctx.batches.interns(&batch_id).await?))
}

// ============================================================================
// Catalog
// ============================================================================

async fn list_years(
    State(ctx): State<AppContext>,
    _auth: AuthUser,
) -> ApiResult<Json<Vec<BatchYear>>> {
    Ok(Json(ctx.catalog.list_years().await?))
}

async fn create_year(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    ApiJson(req): ApiJson<CreateBatchYear>,
) -> ApiResult<(StatusCode, Json<BatchYear>)> {
    Ok((StatusCode::CREATED, Json(ctx.catalog.create_year(req).await?)))
}

async fn list_months(
    State(ctx): State<AppContext>,
    _auth: AuthUser,
) -> ApiResult<Json<Vec<BatchMonth>>> {
    Ok(Json(ctx.catalog.list_months().await?))
}

async fn create_month(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    ApiJson(req): ApiJson<CreateBatchMonth>,
) -> ApiResult<(StatusCode, Json<BatchMonth>)> {
    Ok((StatusCode::CREATED, Json(ctx.catalog.create_month(req).await?)))
}

async fn list_organizations(
    State(ctx): State<AppContext>,
    _auth: AuthUser,
) -> ApiResult<Json<Vec<Organization>>> {
    Ok(Json(ctx.catalog.list_organizations().await?))
}

async fn create_organization(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    ApiJson(req): ApiJson<CreateOrganization>,
) -> ApiResult<(StatusCode, Json<Organization>)> {
    Ok((
        StatusCode::CREATED,
        Json(ctx.catalog.create_organization(req).await?),
    ))
}
