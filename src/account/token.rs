/// Stateless bearer tokens (HS256 JWT)
use crate::{
    db::account::Role,
    error::{ApiError, ApiResult},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Signed claim set carried by every session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Username of the account
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies session tokens with a server-held secret
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    /// Issue a token valid from now for the configured lifetime
    pub fn issue(&self, subject: &str, role: Role) -> ApiResult<String> {
        self.issue_at(subject, role, Utc::now())
    }

    /// Issue a token as though it were minted at `issued`
    pub fn issue_at(&self, subject: &str, role: Role, issued: DateTime<Utc>) -> ApiResult<String> {
        let claims = Claims {
            sub: subject.to_string(),
            role,
            iat: issued.timestamp(),
            exp: (issued + self.ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("Failed to generate token: {}", e)))
    }

    /// Check signature and expiry, returning the claims
    pub fn verify(&self, token: &str) -> ApiResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("token rejected: {}", e);
                ApiError::Authentication("invalid token".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("0123456789abcdef0123456789abcdef", 60)
    }

    #[test]
    fn test_issue_then_verify() {
        let tokens = issuer();
        let token = tokens.issue("jdoe", Role::ScrumMaster).unwrap();

        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.sub, "jdoe");
        assert_eq!(claims.role, Role::ScrumMaster);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = issuer();
        let token = tokens
            .issue_at("jdoe", Role::Intern, Utc::now() - Duration::hours(2))
            .unwrap();

        let err = tokens.verify(&token).unwrap_err();
        assert_eq!(err.reason(), "invalid token");
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let token = TokenIssuer::new("another-secret-that-is-32-chars!", 60)
            .issue("jdoe", Role::Admin)
            .unwrap();

        assert!(matches!(
            issuer().verify(&token),
            Err(ApiError::Authentication(_))
        ));
        assert!(issuer().verify("garbage").is_err());
    }
}
