/// Project endpoints
use crate::{
    api::middleware::{ApiJson, ApiPath, ApiQuery},
    auth::{AdminUser, AuthUser},
    context::AppContext,
    error::ApiResult,
    store::{
        clamp_limit,
        projects::{AssignInterns, CreateProject, Project, ProjectPatch, ProjectUpdate},
    },
};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;

const UPDATES_DEFAULT_LIMIT: i64 = 10;
const UPDATES_MAX_LIMIT: i64 = 50;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route("/projects/assigned", get(assigned_projects))
        .route("/projects/:id", patch(update_project))
        .route("/projects/:id/interns", post(assign_interns))
        .route("/projects/:id/updates", get(project_updates))
}

async fn create_project(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    ApiJson(req): ApiJson<CreateProject>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let project = ctx.projects.create(req).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

async fn list_projects(
    State(ctx): State<AppContext>,
    _auth: AuthUser,
) -> ApiResult<Json<Vec<Project>>> {
    Ok(Json(ctx.projects.list().await?))
}

/// Projects the caller's intern profile is assigned to
async fn assigned_projects(
    State(ctx): State<AppContext>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<Project>>> {
    Ok(Json(ctx.projects.assigned_to(&auth.account.email).await?))
}

async fn update_project(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(patch): ApiJson<ProjectPatch>,
) -> ApiResult<Json<Project>> {
    Ok(Json(ctx.projects.update(&id, patch).await?))
}

async fn assign_interns(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(req): ApiJson<AssignInterns>,
) -> ApiResult<Json<Project>> {
    Ok(Json(ctx.projects.assign(&id, &req.intern_ids).await?))
}

#[derive(Debug, Default, Deserialize)]
struct UpdatesQuery {
    limit: Option<i64>,
}

async fn project_updates(
    State(ctx): State<AppContext>,
    _auth: AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiQuery(query): ApiQuery<UpdatesQuery>,
) -> ApiResult<Json<Vec<ProjectUpdate>>> {
    let limit = clamp_limit(query.limit, UPDATES_DEFAULT_LIMIT, UPDATES_MAX_LIMIT)?;
    Ok(Json(ctx.projects.updates(&id, limit).await?))
}
