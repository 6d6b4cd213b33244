/// Task endpoints
use crate::{
    api::middleware::{ApiJson, ApiPath, ApiQuery},
    auth::AuthUser,
    context::AppContext,
    db::account::Role,
    error::ApiResult,
    store::{
        tasks::{CreateTask, Task, TaskPatch, TaskQuery},
        Page, Pagination,
    },
};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/:id", patch(update_task).delete(delete_task))
}

async fn create_task(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    ApiJson(req): ApiJson<CreateTask>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let task = ctx.tasks.create(req, &auth.account.username).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// Interns are pinned to their own profile whatever filter they send
async fn list_tasks(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    ApiQuery(mut query): ApiQuery<TaskQuery>,
    ApiQuery(page): ApiQuery<Pagination>,
) -> ApiResult<Json<Page<Task>>> {
    if auth.role() == Role::Intern {
        page.validate()?;
        match ctx.interns.find_by_email(&auth.account.email).await? {
            Some(profile) => query.intern_id = Some(profile.id),
            None => {
                return Ok(Json(Page {
                    items: Vec::new(),
                    total: 0,
                    skip: page.skip,
                    limit: page.limit,
                }))
            }
        }
    }

    Ok(Json(ctx.tasks.list(query, page).await?))
}

async fn update_task(
    State(ctx): State<AppContext>,
    _auth: AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(patch): ApiJson<TaskPatch>,
) -> ApiResult<Json<Task>> {
    Ok(Json(ctx.tasks.update(&id, patch).await?))
}

async fn delete_task(
    State(ctx): State<AppContext>,
    _auth: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<StatusCode> {
    ctx.tasks.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
