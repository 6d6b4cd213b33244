/// Account management system
///
/// Handles account registration, password sign-in, session tokens,
/// password reset and email verification codes.

mod manager;
pub mod otp;
pub mod password;
pub mod reset;
pub mod token;

pub use manager::{AccountManager, NewAccount};
pub use otp::OtpManager;
pub use reset::PasswordResetFlow;
pub use token::{Claims, TokenIssuer};

use crate::db::account::{Account, Role};
use crate::error::ApiResult;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Self-registration request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub password: String,
    pub employee_id: Option<String>,
}

/// Registration through an emailed verification code
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OtpRegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 6))]
    pub otp: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub password: String,
}

/// Login request
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Session response returned by every sign-in path
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: Account,
}

impl LoginResponse {
    /// Issue a token for an account that already passed the sign-in checks
    pub fn issue(tokens: &TokenIssuer, account: Account) -> ApiResult<Self> {
        let access_token = tokens.issue(&account.username, account.role)?;

        Ok(Self {
            access_token,
            token_type: "bearer".to_string(),
            user: account,
        })
    }
}

/// Fields an admin may change on an account
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountPatch {
    pub name: Option<String>,
    pub employee_id: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub is_approved: Option<bool>,
}

/// Forgot-password request
#[derive(Debug, Clone, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Reset completion request
#[derive(Debug, Clone, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Send-code request
#[derive(Debug, Clone, Deserialize)]
pub struct SendOtpRequest {
    pub email: String,
}
