/// Mentorship request endpoints
use crate::{
    api::middleware::{ApiJson, ApiPath, ApiQuery},
    auth::{AuthUser, StaffUser},
    context::AppContext,
    db::account::Role,
    error::ApiResult,
    require_role,
    store::mentors::{
        CreateMentorRequest, MentorDecision, MentorQuery, MentorRequest, Mentorships,
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
        .route("/mentor-requests", get(list_requests).post(create_request))
        .route("/mentor-requests/me", get(my_requests))
        .route("/mentor-requests/:id", patch(decide_request))
        .route("/mentorships/me", get(my_mentorships))
}

async fn create_request(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    ApiJson(req): ApiJson<CreateMentorRequest>,
) -> ApiResult<(StatusCode, Json<MentorRequest>)> {
    require_role!(auth, Role::Intern, Role::ScrumMaster);

    let request = ctx.mentors.create(&auth.account, req).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

async fn list_requests(
    State(ctx): State<AppContext>,
    _staff: StaffUser,
    ApiQuery(query): ApiQuery<MentorQuery>,
) -> ApiResult<Json<Vec<MentorRequest>>> {
    Ok(Json(ctx.mentors.list(query).await?))
}

/// Requests the caller sent or received
async fn my_requests(
    State(ctx): State<AppContext>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<MentorRequest>>> {
    Ok(Json(ctx.mentors.for_user(&auth.account.id).await?))
}

async fn decide_request(
    State(ctx): State<AppContext>,
    StaffUser(staff): StaffUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(decision): ApiJson<MentorDecision>,
) -> ApiResult<Json<MentorRequest>> {
    let request = ctx
        .mentors
        .decide(&id, decision, &staff.account.username)
        .await?;
    Ok(Json(request))
}

async fn my_mentorships(
    State(ctx): State<AppContext>,
    auth: AuthUser,
) -> ApiResult<Json<Mentorships>> {
    Ok(Json(ctx.mentors.mentorships(&auth.account.id).await?))
}
