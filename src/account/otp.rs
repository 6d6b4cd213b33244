/// Persisted email verification codes for self-registration
use crate::{
    account::reset::digest_token,
    error::{ApiError, ApiResult},
    mailer::{self, MailSender},
    validation,
};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sqlx::SqlitePool;
use std::sync::Arc;

pub struct OtpManager {
    db: SqlitePool,
    mailer: Arc<dyn MailSender>,
    expiry: Duration,
}

impl OtpManager {
    pub fn new(db: SqlitePool, mailer: Arc<dyn MailSender>, expiry_minutes: i64) -> Self {
        Self {
            db,
            mailer,
            expiry: Duration::minutes(expiry_minutes),
        }
    }

    pub fn expiry_minutes(&self) -> i64 {
        self.expiry.num_minutes()
    }

    /// Generate, store and mail a code for an email that is not yet registered
    pub async fn send_otp(&self, email: &str) -> ApiResult<()> {
        let email = validation::normalize_email(email);
        validation::validate_email(&email)?;

        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)
                 OR EXISTS(SELECT 1 FROM interns WHERE email = ?1)",
        )
        .bind(&email)
        .fetch_one(&self.db)
        .await?;
        if taken {
            return Err(ApiError::Validation("Email already registered".to_string()));
        }

        if !self.mailer.is_configured() {
            return Err(ApiError::Dependency("mail sender not configured".to_string()));
        }

        let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000u32));
        self.store_code_at(&email, &code, Utc::now()).await?;

        self.mailer
            .send(
                &email,
                "Your Interns360 verification code",
                &mailer::otp_body(&code, self.expiry_minutes()),
            )
            .await?;

        tracing::info!(email = %email, "verification code sent");
        Ok(())
    }

    /// Replace any live code for `email` with this one
    pub async fn store_code_at(&self, email: &str, code: &str, now: DateTime<Utc>) -> ApiResult<()> {
        sqlx::query(
            "INSERT INTO email_otps (email, code_hash, expires_at, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(email) DO UPDATE SET
                 code_hash = excluded.code_hash,
                 expires_at = excluded.expires_at,
                 created_at = excluded.created_at",
        )
        .bind(validation::normalize_email(email))
        .bind(digest_token(code))
        .bind(now + self.expiry)
        .bind(now)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    pub async fn verify_and_consume(&self, email: &str, code: &str) -> ApiResult<()> {
        self.verify_and_consume_at(email, code, Utc::now()).await
    }

    /// Atomically delete a matching, unexpired code
    pub async fn verify_and_consume_at(
        &self,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> ApiResult<()> {
        let result = sqlx::query(
            "DELETE FROM email_otps WHERE email = ?1 AND code_hash = ?2 AND expires_at > ?3",
        )
        .bind(validation::normalize_email(email))
        .bind(digest_token(code.trim()))
        .bind(now)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::Validation("Invalid or expired OTP".to_string()));
        }
        Ok(())
    }
}
