/// Office attendance endpoints
use crate::{
    api::middleware::{ApiJson, ApiQuery},
    auth::StaffUser,
    context::AppContext,
    error::ApiResult,
    store::attendance::{AttendanceQuery, AttendanceRecord, MarkAttendance},
};
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};

pub fn routes() -> Router<AppContext> {
    Router::new().route("/office-attendance", get(list_attendance).post(mark_attendance))
}

async fn mark_attendance(
    State(ctx): State<AppContext>,
    StaffUser(staff): StaffUser,
    ApiJson(req): ApiJson<MarkAttendance>,
) -> ApiResult<(StatusCode, Json<AttendanceRecord>)> {
    let record = ctx.attendance.mark(req, &staff.account.username).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn list_attendance(
    State(ctx): State<AppContext>,
    _staff: StaffUser,
    ApiQuery(query): ApiQuery<AttendanceQuery>,
) -> ApiResult<Json<Vec<AttendanceRecord>>> {
    Ok(Json(ctx.attendance.list(query).await?))
}
