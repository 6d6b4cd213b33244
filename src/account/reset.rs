/// Password reset: one-time, one-hour tokens delivered by email
use crate::{
    account::password::hash_password,
    error::{ApiError, ApiResult},
    mailer::{self, MailSender},
    validation,
};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

/// Reset tokens stay valid for this long after issuance
pub const RESET_TOKEN_TTL_MINUTES: i64 = 60;

const INVALID_TOKEN: &str = "Invalid or expired reset token";

/// Hex SHA-256 of a raw token; only digests are ever stored
pub fn digest_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// 32 random bytes, hex encoded
fn generate_raw_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub struct PasswordResetFlow {
    db: SqlitePool,
    mailer: Arc<dyn MailSender>,
    frontend_url: Option<String>,
}

impl PasswordResetFlow {
    pub fn new(db: SqlitePool, mailer: Arc<dyn MailSender>, frontend_url: Option<String>) -> Self {
        Self {
            db,
            mailer,
            frontend_url,
        }
    }

    /// Issue a token for the account behind `email` and mail the reset link
    pub async fn request_reset(&self, email: &str) -> ApiResult<()> {
        let email = validation::normalize_email(email);

        let row = sqlx::query("SELECT id, name FROM users WHERE email = ?1")
            .bind(&email)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::NotFound("Email not found".to_string()))?;
        let user_id: String = row.get("id");
        let name: String = row.get("name");

        let frontend_url = self
            .frontend_url
            .as_deref()
            .ok_or_else(|| ApiError::Dependency("FRONTEND_URL is not configured".to_string()))?;
        if !self.mailer.is_configured() {
            return Err(ApiError::Dependency("mail sender not configured".to_string()));
        }

        let raw = self.issue_token_at(&user_id, Utc::now()).await?;
        let link = format!("{}/reset-password?token={}", frontend_url, raw);

        self.mailer
            .send(
                &email,
                "Reset your Interns360 password",
                &mailer::password_reset_body(&name, &link),
            )
            .await?;

        tracing::info!(user_id = %user_id, "password reset requested");
        Ok(())
    }

    /// Store the digest of a fresh token on the account, returning the raw token
    pub async fn issue_token_at(&self, user_id: &str, now: DateTime<Utc>) -> ApiResult<String> {
        let raw = generate_raw_token();
        let expires_at = now + Duration::minutes(RESET_TOKEN_TTL_MINUTES);

        sqlx::query(
            "UPDATE users
             SET reset_token_hash = ?1, reset_token_expires_at = ?2, reset_token_used = 0, updated_at = ?3
             WHERE id = ?4",
        )
        .bind(digest_token(&raw))
        .bind(expires_at)
        .bind(now)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        Ok(raw)
    }

    pub async fn complete_reset(
        &self,
        token: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> ApiResult<()> {
        self.complete_reset_at(token, new_password, confirm_password, Utc::now())
            .await
    }

    /// Consume a raw token and set the new password.
    /// Success and expiry both clear the stored token.
    pub async fn complete_reset_at(
        &self,
        token: &str,
        new_password: &str,
        confirm_password: &str,
        now: DateTime<Utc>,
    ) -> ApiResult<()> {
        let digest = digest_token(token.trim());

        let row = sqlx::query(
            "SELECT id, reset_token_expires_at, reset_token_used FROM users WHERE reset_token_hash = ?1",
        )
        .bind(&digest)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::Validation(INVALID_TOKEN.to_string()))?;

        let user_id: String = row.get("id");
        let expires_at: Option<DateTime<Utc>> = row.get("reset_token_expires_at");
        let used: bool = row.get("reset_token_used");

        if used {
            return Err(ApiError::Validation(INVALID_TOKEN.to_string()));
        }

        if expires_at.map_or(true, |at| at < now) {
            sqlx::query(
                "UPDATE users SET reset_token_hash = NULL, reset_token_expires_at = NULL WHERE id = ?1 AND reset_token_hash = ?2",
            )
            .bind(&user_id)
            .bind(&digest)
            .execute(&self.db)
            .await?;
            return Err(ApiError::Validation(INVALID_TOKEN.to_string()));
        }

        if new_password != confirm_password {
            return Err(ApiError::Validation("Passwords do not match".to_string()));
        }
        validation::validate_password_strength(new_password)?;

        let hash = hash_password(new_password)?;

        // Conditional on the digest so a concurrent reset cannot reuse it
        let result = sqlx::query(
            "UPDATE users
             SET password_hash = ?1, reset_token_used = 1, reset_token_hash = NULL,
                 reset_token_expires_at = NULL, updated_at = ?2
             WHERE id = ?3 AND reset_token_hash = ?4 AND reset_token_used = 0",
        )
        .bind(hash)
        .bind(now)
        .bind(&user_id)
        .bind(&digest)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::Validation(INVALID_TOKEN.to_string()));
        }

        tracing::info!(user_id = %user_id, "password reset completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::account::Role, mailer::SmtpMailer, testing};

    fn flow(pool: &SqlitePool) -> PasswordResetFlow {
        let mailer = SmtpMailer::new(None, std::time::Duration::from_secs(1)).unwrap();
        PasswordResetFlow::new(
            pool.clone(),
            Arc::new(mailer),
            Some("https://app.test".to_string()),
        )
    }

    #[test]
    fn test_digest_is_stable_hex() {
        let d = digest_token("abc");
        assert_eq!(d.len(), 64);
        assert_eq!(d, digest_token("abc"));
        assert_ne!(d, digest_token("abd"));
    }

    #[tokio::test]
    async fn test_reset_is_single_use() {
        let pool = testing::test_pool().await;
        let account = testing::seed_account(&pool, "rita", Role::Intern).await;
        let flow = flow(&pool);

        let raw = flow.issue_token_at(&account.id, Utc::now()).await.unwrap();

        let stored: Option<String> =
            sqlx::query_scalar("SELECT reset_token_hash FROM users WHERE id = ?1")
                .bind(&account.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(stored, Some(digest_token(&raw)));

        flow.complete_reset(&raw, "N3w!password", "N3w!password")
            .await
            .unwrap();

        let manager = testing::accounts(&pool);
        assert!(manager
            .login("rita@interns360.test", "N3w!password")
            .await
            .is_ok());

        let err = flow
            .complete_reset(&raw, "An0ther!pass", "An0ther!pass")
            .await
            .unwrap_err();
        assert_eq!(err.reason(), INVALID_TOKEN);
    }

    #[tokio::test]
    async fn test_reset_after_horizon_fails_and_clears() {
        let pool = testing::test_pool().await;
        let account = testing::seed_account(&pool, "omar", Role::Intern).await;
        let flow = flow(&pool);

        let issued = Utc::now();
        let raw = flow.issue_token_at(&account.id, issued).await.unwrap();

        let late = issued + Duration::minutes(RESET_TOKEN_TTL_MINUTES + 1);
        let err = flow
            .complete_reset_at(&raw, "N3w!password", "N3w!password", late)
            .await
            .unwrap_err();
        assert_eq!(err.reason(), INVALID_TOKEN);

        // Cleared, so even an in-window retry fails
        let err = flow
            .complete_reset_at(&raw, "N3w!password", "N3w!password", issued)
            .await
            .unwrap_err();
        assert_eq!(err.reason(), INVALID_TOKEN);
    }

    #[tokio::test]
    async fn test_reset_rejects_mismatch_and_weak_password() {
        let pool = testing::test_pool().await;
        let account = testing::seed_account(&pool, "lena", Role::Intern).await;
        let flow = flow(&pool);
        let raw = flow.issue_token_at(&account.id, Utc::now()).await.unwrap();

        let err = flow
            .complete_reset(&raw, "N3w!password", "N3w!passwore")
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "Passwords do not match");

        assert!(flow.complete_reset(&raw, "weakpass", "weakpass").await.is_err());

        // Token survives a rejected attempt
        flow.complete_reset(&raw, "N3w!password", "N3w!password")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_request_reset_errors() {
        let pool = testing::test_pool().await;
        testing::seed_account(&pool, "nina", Role::Intern).await;
        let flow = flow(&pool);

        let err = flow.request_reset("ghost@interns360.test").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        // Mailer is unconfigured in this fixture
        let err = flow.request_reset("NINA@interns360.test").await.unwrap_err();
        assert!(matches!(err, ApiError::Dependency(_)));
    }
}
