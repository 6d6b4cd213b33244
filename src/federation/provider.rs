/// Identity provider client (Microsoft Graph)
use crate::{
    config::FederationConfig,
    error::{ApiError, ApiResult},
    validation,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

/// Verified profile returned by the provider's profile endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalProfile {
    /// Stable subject id (object id)
    #[serde(rename = "id")]
    pub subject: String,
    pub display_name: Option<String>,
    pub given_name: Option<String>,
    pub surname: Option<String>,
    pub mail: Option<String>,
    pub user_principal_name: Option<String>,
}

impl ExternalProfile {
    /// Mail address, falling back to the principal name; lower-cased
    pub fn email(&self) -> Option<String> {
        self.mail
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .or(self.user_principal_name.as_deref())
            .map(validation::normalize_email)
            .filter(|m| !m.is_empty())
    }

    /// Best available display name
    pub fn name(&self) -> String {
        if let Some(name) = self.display_name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.trim().to_string();
        }

        let parts: Vec<&str> = [self.given_name.as_deref(), self.surname.as_deref()]
            .into_iter()
            .flatten()
            .filter(|p| !p.trim().is_empty())
            .collect();
        if !parts.is_empty() {
            return parts.join(" ");
        }

        self.email()
            .map(|e| validation::email_local_part(&e).to_string())
            .unwrap_or_default()
    }
}

/// External identity provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Validate an access token by fetching the caller's profile
    async fn fetch_profile(&self, access_token: &str) -> ApiResult<ExternalProfile>;

    /// Redeem an authorization code for an access token
    async fn exchange_code(&self, code: &str) -> ApiResult<String>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Microsoft Graph backed provider. Single attempt per call, bounded by a timeout.
pub struct GraphIdentityProvider {
    client: reqwest::Client,
    config: Option<FederationConfig>,
}

impl GraphIdentityProvider {
    pub fn new(config: Option<FederationConfig>, timeout: Duration) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn config(&self) -> ApiResult<&FederationConfig> {
        self.config
            .as_ref()
            .ok_or_else(|| ApiError::Dependency("Azure AD SSO is not configured".to_string()))
    }
}

#[async_trait]
impl IdentityProvider for GraphIdentityProvider {
    async fn fetch_profile(&self, access_token: &str) -> ApiResult<ExternalProfile> {
        let config = self.config()?;

        let response = self
            .client
            .get(&config.profile_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("identity provider unreachable: {}", e);
                ApiError::Dependency("identity provider unavailable".to_string())
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            tracing::info!(status = %status, "external token rejected by identity provider");
            return Err(ApiError::Authentication("invalid external token".to_string()));
        }

        response.json::<ExternalProfile>().await.map_err(|e| {
            tracing::warn!("unreadable profile from identity provider: {}", e);
            ApiError::Dependency("identity provider returned an unreadable profile".to_string())
        })
    }

    async fn exchange_code(&self, code: &str) -> ApiResult<String> {
        let config = self.config()?;

        let mut form = vec![
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("scope", "User.Read openid profile email"),
        ];
        if let Some(redirect_uri) = config.redirect_uri.as_deref() {
            form.push(("redirect_uri", redirect_uri));
        }

        let response = self
            .client
            .post(config.token_url())
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("identity provider token endpoint unreachable: {}", e);
                ApiError::Dependency("identity provider unavailable".to_string())
            })?;

        if !response.status().is_success() {
            tracing::info!(status = %response.status(), "authorization code rejected");
            return Err(ApiError::Authentication(
                "Failed to exchange code for token".to_string(),
            ));
        }

        let body: TokenResponse = response.json().await.map_err(|e| {
            tracing::warn!("unreadable token response: {}", e);
            ApiError::Dependency("identity provider returned an unreadable token".to_string())
        })?;

        body.access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Authentication("No access token in response".to_string()))
    }
}
