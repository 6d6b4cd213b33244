/// Configuration management for Interns360
use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub email: Option<EmailConfig>,
    pub federation: Option<FederationConfig>,
    pub registration: RegistrationConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
    /// Public URL of the SPA, used to build reset links
    pub frontend_url: Option<String>,
    pub cors_origins: Vec<String>,
    /// Connect + read timeout for identity provider and mail calls
    pub outbound_timeout_secs: u64,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub database_path: PathBuf,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
    /// Emails auto-approved into the admin role (lower-cased)
    pub admin_emails: Vec<String>,
}

impl AuthConfig {
    pub fn is_admin_email(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.admin_emails.iter().any(|e| *e == email)
    }
}

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_url: String,
    pub from_address: String,
}

/// Federated sign-in (Azure AD) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederationConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: Option<String>,
    /// Profile endpoint used to validate external tokens
    pub profile_url: String,
}

impl FederationConfig {
    pub fn token_url(&self) -> String {
        format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
            self.tenant_id
        )
    }
}

/// Self-registration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationConfig {
    pub otp_expiry_minutes: i64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

/// Split a comma-separated or JSON-array env value into trimmed entries
fn parse_list(value: &str) -> Vec<String> {
    if let Ok(items) = serde_json::from_str::<Vec<String>>(value) {
        return items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }

    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ApiResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .map_err(|_| ApiError::Validation("Invalid port number".to_string()))?;
        let version = env::var("APP_VERSION").unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());
        let frontend_url = env::var("FRONTEND_URL")
            .ok()
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty());
        let cors_origins = env::var("BACKEND_CORS_ORIGINS")
            .map(|v| parse_list(&v))
            .unwrap_or_default();
        let outbound_timeout_secs = env::var("OUTBOUND_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let database_path: PathBuf = env::var("DATABASE_PATH")
            .unwrap_or_else(|_| "./data/interns.sqlite".to_string())
            .into();

        let jwt_secret = env::var("SECRET_KEY")
            .map_err(|_| ApiError::Validation("SECRET_KEY required".to_string()))?;
        let token_ttl_minutes = env::var("ACCESS_TOKEN_EXPIRE_MINUTES")
            .unwrap_or_else(|_| "1440".to_string())
            .parse()
            .map_err(|_| ApiError::Validation("Invalid ACCESS_TOKEN_EXPIRE_MINUTES".to_string()))?;

        // Parse the admin allow-list from a comma-separated list
        let admin_emails = env::var("ADMIN_EMAILS")
            .map(|v| parse_list(&v))
            .unwrap_or_default()
            .into_iter()
            .map(|e| e.to_lowercase())
            .collect();

        let email = if let Ok(smtp_url) = env::var("SMTP_URL") {
            Some(EmailConfig {
                smtp_url,
                from_address: env::var("SENDER_MAIL")
                    .map_err(|_| ApiError::Validation("SENDER_MAIL required with SMTP_URL".to_string()))?,
            })
        } else {
            None
        };

        let federation = match (
            env::var("AZURE_TENANT_ID"),
            env::var("AZURE_CLIENT_ID"),
            env::var("AZURE_SECRET_KEY"),
        ) {
            (Ok(tenant_id), Ok(client_id), Ok(client_secret)) => Some(FederationConfig {
                tenant_id,
                client_id,
                client_secret,
                redirect_uri: env::var("AZURE_REDIRECT_URI").ok(),
                profile_url: env::var("GRAPH_PROFILE_URL")
                    .unwrap_or_else(|_| "https://graph.microsoft.com/v1.0/me".to_string()),
            }),
            _ => None,
        };

        let otp_expiry_minutes = env::var("OTP_EXPIRY_MINUTES")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let log_json = env::var("LOG_FORMAT")
            .map(|f| f.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
                frontend_url,
                cors_origins,
                outbound_timeout_secs,
            },
            storage: StorageConfig { database_path },
            authentication: AuthConfig {
                jwt_secret,
                token_ttl_minutes,
                admin_emails,
            },
            email,
            federation,
            registration: RegistrationConfig { otp_expiry_minutes },
            logging: LoggingConfig {
                level: log_level,
                json: log_json,
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> ApiResult<()> {
        if self.service.hostname.is_empty() {
            return Err(ApiError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(ApiError::Validation(
                "SECRET_KEY must be at least 32 characters".to_string(),
            ));
        }

        if self.authentication.token_ttl_minutes <= 0 {
            return Err(ApiError::Validation(
                "ACCESS_TOKEN_EXPIRE_MINUTES must be positive".to_string(),
            ));
        }

        if self.registration.otp_expiry_minutes <= 0 {
            return Err(ApiError::Validation(
                "OTP_EXPIRY_MINUTES must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_comma_and_json() {
        assert_eq!(
            parse_list(" a@x.io, b@x.io ,,"),
            vec!["a@x.io".to_string(), "b@x.io".to_string()]
        );
        assert_eq!(
            parse_list(r#"["http://localhost:5173", " https://app.example.com "]"#),
            vec![
                "http://localhost:5173".to_string(),
                "https://app.example.com".to_string()
            ]
        );
    }

    #[test]
    fn test_admin_email_match_is_case_insensitive() {
        let auth = AuthConfig {
            jwt_secret: "x".repeat(32),
            token_ttl_minutes: 60,
            admin_emails: vec!["lead@example.com".to_string()],
        };
        assert!(auth.is_admin_email("Lead@Example.com "));
        assert!(!auth.is_admin_email("intern@example.com"));
    }

    #[test]
    fn test_validate_rejects_short_secret() {
        let mut config = crate::testing::test_config();
        assert!(config.validate().is_ok());

        config.authentication.jwt_secret = "short".to_string();
        assert!(matches!(config.validate(), Err(ApiError::Validation(_))));
    }
}
