/// Leave and work-from-home request endpoints
use crate::{
    api::middleware::{ApiJson, ApiPath, ApiQuery},
    auth::{AuthUser, StaffUser},
    context::AppContext,
    error::ApiResult,
    store::{
        pto::{CreatePto, Pto, PtoListItem, PtoPatch, PtoQuery},
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
        .route("/pto", get(list_requests).post(create_request))
        .route("/pto/:id", patch(decide_request))
}

async fn create_request(
    State(ctx): State<AppContext>,
    _auth: AuthUser,
    ApiJson(req): ApiJson<CreatePto>,
) -> ApiResult<(StatusCode, Json<Pto>)> {
    let pto = ctx.pto.create(req).await?;
    Ok((StatusCode::CREATED, Json(pto)))
}

async fn list_requests(
    State(ctx): State<AppContext>,
    _auth: AuthUser,
    ApiQuery(query): ApiQuery<PtoQuery>,
    ApiQuery(page): ApiQuery<Pagination>,
) -> ApiResult<Json<Page<PtoListItem>>> {
    Ok(Json(ctx.pto.list(query, page).await?))
}

async fn decide_request(
    State(ctx): State<AppContext>,
    StaffUser(staff): StaffUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(patch): ApiJson<PtoPatch>,
) -> ApiResult<Json<Pto>> {
    let pto = ctx.pto.decide(&id, patch, &staff.account.username).await?;
    Ok(Json(pto))
}
