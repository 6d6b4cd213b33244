/// Daily standup endpoints
use crate::{
    api::middleware::{ApiJson, ApiPath, ApiQuery},
    auth::AuthUser,
    context::AppContext,
    error::ApiResult,
    store::{
        dsu::{CreateDsu, DsuEntry, DsuListItem, DsuPatch, DsuQuery},
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
        .route("/dsu-entries", get(list_entries).post(create_entry))
        .route("/dsu-entries/:id", patch(update_entry))
}

async fn create_entry(
    State(ctx): State<AppContext>,
    _auth: AuthUser,
    ApiJson(req): ApiJson<CreateDsu>,
) -> ApiResult<(StatusCode, Json<DsuEntry>)> {
    let entry = ctx.dsu.create(req).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn list_entries(
    State(ctx): State<AppContext>,
    _auth: AuthUser,
    ApiQuery(query): ApiQuery<DsuQuery>,
    ApiQuery(page): ApiQuery<Pagination>,
) -> ApiResult<Json<Page<DsuListItem>>> {
    Ok(Json(ctx.dsu.list(query, page).await?))
}

/// Staff feedback marks the entry reviewed; interns may only edit content
async fn update_entry(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(patch): ApiJson<DsuPatch>,
) -> ApiResult<Json<DsuEntry>> {
    let reviewer = auth.is_staff().then_some(auth.account.username.as_str());
    Ok(Json(ctx.dsu.update(&id, patch, reviewer).await?))
}
