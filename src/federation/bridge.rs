/// Maps verified external profiles onto local accounts
use crate::{
    account::{AccountManager, NewAccount},
    db::account::{Account, Role},
    error::{ApiError, ApiResult},
    federation::{ExternalProfile, IdentityProvider, AZURE_PROVIDER},
    validation,
};
use std::sync::Arc;

pub struct FederationBridge {
    accounts: Arc<AccountManager>,
    provider: Arc<dyn IdentityProvider>,
}

impl FederationBridge {
    pub fn new(accounts: Arc<AccountManager>, provider: Arc<dyn IdentityProvider>) -> Self {
        Self { accounts, provider }
    }

    /// Exchange an external access token for a verified profile
    pub async fn validate(&self, external_token: &str) -> ApiResult<ExternalProfile> {
        if external_token.trim().is_empty() {
            return Err(ApiError::Validation("Missing access_token".to_string()));
        }
        self.provider.fetch_profile(external_token).await
    }

    /// Find, link or create the local account for a profile.
    ///
    /// Lookup order: stored external subject, then email, then a new account.
    pub async fn resolve(&self, profile: &ExternalProfile) -> ApiResult<Account> {
        let email = profile
            .email()
            .ok_or_else(|| ApiError::Validation("External profile has no email".to_string()))?;
        let name = profile.name();

        if let Some(account) = self.accounts.find_by_external_id(&profile.subject).await? {
            tracing::debug!(user_id = %account.id, "federated sign-in matched subject");
            return self.accounts.refresh_profile(&account.id, &name, &email).await;
        }

        if let Some(account) = self.accounts.find_by_email(&email).await? {
            tracing::info!(user_id = %account.id, "linking external identity to existing account");
            return self
                .accounts
                .link_external(&account.id, &profile.subject, AZURE_PROVIDER)
                .await;
        }

        let username = self.derive_username(&email, &profile.subject).await?;
        let is_admin = self.accounts.is_admin_email(&email);

        let account = self
            .accounts
            .insert(NewAccount {
                username,
                email,
                name,
                employee_id: None,
                role: if is_admin { Role::Admin } else { Role::Intern },
                is_approved: is_admin,
                password_hash: None,
                external_id: Some(profile.subject.clone()),
                auth_provider: AZURE_PROVIDER,
            })
            .await?;

        tracing::info!(user_id = %account.id, role = %account.role, "account created from federated sign-in");
        Ok(account)
    }

    /// Email local part, or local part plus a subject-derived suffix when taken
    async fn derive_username(&self, email: &str, subject: &str) -> ApiResult<String> {
        let base = validation::normalize_username(validation::email_local_part(email));
        if self.accounts.find_by_username(&base).await?.is_none() {
            return Ok(base);
        }

        let suffix: String = subject
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(8)
            .collect::<String>()
            .to_lowercase();
        let candidate = format!("{}_{}", base, suffix);

        self.accounts.unique_username(&candidate).await
    }

    /// Validate, resolve and run the sign-in checks
    pub async fn sign_in(&self, external_token: &str) -> ApiResult<Account> {
        let profile = self.validate(external_token).await?;
        let account = self.resolve(&profile).await?;
        AccountManager::ensure_can_sign_in(&account)?;
        Ok(account)
    }

    /// Authorization-code variant of `sign_in`
    pub async fn sign_in_with_code(&self, code: &str) -> ApiResult<Account> {
        if code.trim().is_empty() {
            return Err(ApiError::Validation("Missing authorization code".to_string()));
        }
        let access_token = self.provider.exchange_code(code).await?;
        self.sign_in(&access_token).await
    }
}
