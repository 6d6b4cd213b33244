/// Current-user and account administration endpoints
use crate::{
    account::AccountPatch,
    api::middleware::{ApiJson, ApiPath, ApiQuery},
    auth::{AdminUser, AuthUser, StaffUser},
    context::AppContext,
    db::account::{Account, BasicUser, Role},
    error::ApiResult,
};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/users/me", get(me))
        .route("/users", get(list_users))
        .route("/admin/users", get(admin_list_users))
        .route("/admin/users/pending", get(pending_users))
        .route("/admin/users/:id", patch(update_user).delete(delete_user))
}

#[derive(Debug, Default, Deserialize)]
struct RoleQuery {
    role: Option<Role>,
}

async fn me(auth: AuthUser) -> Json<Account> {
    Json(auth.account)
}

/// Directory listing for pickers (mentor selection, assignment)
async fn list_users(
    State(ctx): State<AppContext>,
    _staff: StaffUser,
    ApiQuery(query): ApiQuery<RoleQuery>,
) -> ApiResult<Json<Vec<BasicUser>>> {
    Ok(Json(ctx.accounts.list_basic(query.role).await?))
}

#[derive(Debug, Default, Deserialize)]
struct AdminUsersQuery {
    #[serde(default)]
    pending_only: bool,
    role: Option<Role>,
}

async fn admin_list_users(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    ApiQuery(query): ApiQuery<AdminUsersQuery>,
) -> ApiResult<Json<Vec<Account>>> {
    Ok(Json(ctx.accounts.list(query.pending_only, query.role).await?))
}

async fn pending_users(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
) -> ApiResult<Json<Vec<Account>>> {
    Ok(Json(ctx.accounts.list(true, None).await?))
}

/// Approval, role assignment and activation
async fn update_user(
    State(ctx): State<AppContext>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(patch): ApiJson<AccountPatch>,
) -> ApiResult<Json<Account>> {
    let account = ctx.accounts.update(&id, patch).await?;
    tracing::info!(user_id = %id, by = %admin.account.username, "admin updated account");
    Ok(Json(account))
}

async fn delete_user(
    State(ctx): State<AppContext>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<StatusCode> {
    ctx.accounts.delete(&id, &admin.account.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
