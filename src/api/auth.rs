/// Sign-in, registration and credential recovery endpoints
use crate::{
    account::{
        ForgotPasswordRequest, LoginRequest, LoginResponse, OtpRegisterRequest, RegisterRequest,
        ResetPasswordRequest, SendOtpRequest,
    },
    api::middleware::{ApiJson, ApiQuery},
    context::AppContext,
    db::account::Account,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/check-email", get(check_email))
        .route("/auth/send-otp", post(send_otp))
        .route("/auth/register/otp", post(register_with_otp))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
        .route("/auth/sso/azure", post(azure_sso))
        .route("/auth/sso/azure/callback", post(azure_callback))
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: &'static str,
}

async fn login(
    State(ctx): State<AppContext>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let account = ctx.accounts.login(&req.email, &req.password).await?;
    Ok(Json(LoginResponse::issue(&ctx.tokens, account)?))
}

async fn register(
    State(ctx): State<AppContext>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<Account>)> {
    req.validate()?;
    let account = ctx.accounts.register(req).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

#[derive(Debug, Deserialize)]
struct CheckEmailQuery {
    email: String,
}

#[derive(Debug, Serialize)]
struct CheckEmailResponse {
    exists: bool,
}

async fn check_email(
    State(ctx): State<AppContext>,
    ApiQuery(query): ApiQuery<CheckEmailQuery>,
) -> ApiResult<Json<CheckEmailResponse>> {
    let exists = ctx.accounts.email_registered(&query.email).await?;
    Ok(Json(CheckEmailResponse { exists }))
}

async fn send_otp(
    State(ctx): State<AppContext>,
    ApiJson(req): ApiJson<SendOtpRequest>,
) -> ApiResult<Json<MessageResponse>> {
    ctx.otps.send_otp(&req.email).await?;
    Ok(Json(MessageResponse {
        message: "OTP sent successfully",
    }))
}

/// Consume the emailed code, then create the pending account and its intern profile.
/// The code is only consumed once the rest of the request is known to be acceptable.
async fn register_with_otp(
    State(ctx): State<AppContext>,
    ApiJson(req): ApiJson<OtpRegisterRequest>,
) -> ApiResult<(StatusCode, Json<Account>)> {
    req.validate()?;
    ctx.accounts.check_verified_registration(&req).await?;

    ctx.otps.verify_and_consume(&req.email, &req.otp).await?;
    let account = ctx.accounts.register_verified(&req).await?;

    if ctx.interns.find_by_email(&account.email).await?.is_none() {
        ctx.interns
            .insert_minimal(&account.name, &account.email, "onboarding")
            .await?;
    }

    Ok((StatusCode::CREATED, Json(account)))
}

async fn forgot_password(
    State(ctx): State<AppContext>,
    ApiJson(req): ApiJson<ForgotPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    ctx.resets.request_reset(&req.email).await?;
    Ok(Json(MessageResponse {
        message: "Password reset email sent",
    }))
}

async fn reset_password(
    State(ctx): State<AppContext>,
    ApiJson(req): ApiJson<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    ctx.resets
        .complete_reset(&req.token, &req.new_password, &req.confirm_password)
        .await?;
    Ok(Json(MessageResponse {
        message: "Password has been reset",
    }))
}

#[derive(Debug, Deserialize)]
struct SsoRequest {
    access_token: Option<String>,
}

/// Exchange a provider access token for a local session
async fn azure_sso(
    State(ctx): State<AppContext>,
    ApiJson(req): ApiJson<SsoRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let token = req
        .access_token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("Missing access_token".to_string()))?;

    let account = ctx.federation.sign_in(&token).await?;
    Ok(Json(LoginResponse::issue(&ctx.tokens, account)?))
}

#[derive(Debug, Deserialize)]
struct SsoCallbackRequest {
    #[serde(default)]
    code: String,
}

/// Authorization-code redirect leg of the provider sign-in
async fn azure_callback(
    State(ctx): State<AppContext>,
    ApiJson(req): ApiJson<SsoCallbackRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let account = ctx.federation.sign_in_with_code(&req.code).await?;
    Ok(Json(LoginResponse::issue(&ctx.tokens, account)?))
}
