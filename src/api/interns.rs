/// Intern profile endpoints
use crate::{
    api::middleware::{ApiJson, ApiPath, ApiQuery},
    auth::{AdminUser, AuthUser},
    context::AppContext,
    error::ApiResult,
    store::{
        interns::{CreateIntern, Intern, InternPatch, InternQuery, ProfilePatch},
        Page, Pagination,
    },
};
use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/interns", get(list_interns).post(create_intern))
        .route("/interns/me/profile", get(my_profile).put(update_my_profile))
        .route(
            "/interns/:id",
            get(get_intern).patch(update_intern).delete(delete_intern),
        )
}

async fn create_intern(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    ApiJson(req): ApiJson<CreateIntern>,
) -> ApiResult<(StatusCode, Json<Intern>)> {
    let intern = ctx.interns.create(req).await?;
    Ok((StatusCode::CREATED, Json(intern)))
}

async fn list_interns(
    State(ctx): State<AppContext>,
    _auth: AuthUser,
    ApiQuery(query): ApiQuery<InternQuery>,
    ApiQuery(page): ApiQuery<Pagination>,
) -> ApiResult<Json<Page<Intern>>> {
    Ok(Json(ctx.interns.list(query, page).await?))
}

async fn get_intern(
    State(ctx): State<AppContext>,
    _auth: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Intern>> {
    Ok(Json(ctx.interns.get(&id).await?))
}

async fn update_intern(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(patch): ApiJson<InternPatch>,
) -> ApiResult<Json<Intern>> {
    Ok(Json(ctx.interns.update(&id, patch).await?))
}

async fn delete_intern(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<StatusCode> {
    ctx.interns.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
struct ProfileResponse {
    exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Intern>,
}

/// The caller's own profile, keyed by their account email
async fn my_profile(
    State(ctx): State<AppContext>,
    auth: AuthUser,
) -> ApiResult<Json<ProfileResponse>> {
    let data = ctx.interns.find_by_email(&auth.account.email).await?;
    Ok(Json(ProfileResponse {
        exists: data.is_some(),
        data,
    }))
}

async fn update_my_profile(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    ApiJson(patch): ApiJson<ProfilePatch>,
) -> ApiResult<Json<Intern>> {
    let intern = ctx
        .interns
        .upsert_profile(&auth.account.email, &auth.account.name, patch)
        .await?;
    Ok(Json(intern))
}
