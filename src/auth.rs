/// Authorization gate: bearer token to account, with role guards
use crate::{
    account::{AccountManager, Claims, TokenIssuer},
    api::middleware::extract_bearer_token,
    context::AppContext,
    db::account::{Account, Role},
    error::{ApiError, ApiResult},
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Resolve a bearer token to an account that may use the API.
///
/// Each step is a hard failure: missing token, bad signature or expiry,
/// unknown subject, inactive account, unapproved non-admin.
pub async fn authenticate(
    accounts: &AccountManager,
    tokens: &TokenIssuer,
    token: Option<&str>,
) -> ApiResult<(Account, Claims)> {
    let token = token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Authentication("no credentials".to_string()))?;

    let claims = tokens.verify(token)?;

    let account = accounts
        .find_by_username(&claims.sub)
        .await?
        .ok_or_else(|| ApiError::Authentication("account not found".to_string()))?;

    AccountManager::ensure_can_sign_in(&account)?;

    Ok((account, claims))
}

/// Authenticated, active and approved caller
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub account: Account,
    pub claims: Claims,
}

impl AuthUser {
    pub fn role(&self) -> Role {
        self.account.role
    }

    /// Flat membership test against the allowed roles
    pub fn require_any(&self, allowed: &[Role]) -> ApiResult<()> {
        if allowed.contains(&self.account.role) {
            Ok(())
        } else {
            tracing::debug!(
                user_id = %self.account.id,
                role = %self.account.role,
                "role not permitted for this operation"
            );
            Err(ApiError::Authorization("Not authorized".to_string()))
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self.account.role, Role::Admin | Role::ScrumMaster)
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers);
        let (account, claims) =
            authenticate(&state.accounts, &state.tokens, token.as_deref()).await?;

        Ok(AuthUser { account, claims })
    }
}

/// Caller with the `admin` role
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

#[async_trait]
impl FromRequestParts<AppContext> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        user.require_any(&[Role::Admin])
            .map_err(|_| ApiError::Authorization("Admin access required".to_string()))?;
        Ok(AdminUser(user))
    }
}

/// Caller with the `admin` or `scrum_master` role
#[derive(Debug, Clone)]
pub struct StaffUser(pub AuthUser);

#[async_trait]
impl FromRequestParts<AppContext> for StaffUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        user.require_any(&[Role::Admin, Role::ScrumMaster])?;
        Ok(StaffUser(user))
    }
}

/// Require one of the listed roles inside a handler.
/// Usage: require_role!(auth, Role::Intern, Role::ScrumMaster);
#[macro_export]
macro_rules! require_role {
    ($auth:expr, $($role:expr),+ $(,)?) => {
        $auth.require_any(&[$($role),+])?
    };
}
