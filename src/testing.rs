//! Shared fixtures for unit tests
use crate::{
    account::{password::hash_password, AccountManager, NewAccount},
    config::{
        AuthConfig, LoggingConfig, RegistrationConfig, ServerConfig, ServiceConfig, StorageConfig,
    },
    db::{
        self,
        account::{Account, Role},
    },
};
use sqlx::SqlitePool;
use std::sync::Arc;

pub const ADMIN_EMAIL: &str = "lead@interns360.test";

pub fn test_config() -> ServerConfig {
    ServerConfig {
        service: ServiceConfig {
            hostname: "127.0.0.1".to_string(),
            port: 0,
            version: "test".to_string(),
            frontend_url: Some("https://app.interns360.test".to_string()),
            cors_origins: vec![],
            outbound_timeout_secs: 2,
        },
        storage: StorageConfig {
            database_path: ":memory:".into(),
        },
        authentication: AuthConfig {
            jwt_secret: "test-secret-that-is-at-least-32-chars".to_string(),
            token_ttl_minutes: 60,
            admin_emails: vec![ADMIN_EMAIL.to_string()],
        },
        email: None,
        federation: None,
        registration: RegistrationConfig {
            otp_expiry_minutes: 10,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            json: false,
        },
    }
}

pub async fn test_pool() -> SqlitePool {
    db::memory_pool().await.expect("in-memory pool")
}

pub fn accounts(pool: &SqlitePool) -> AccountManager {
    AccountManager::new(pool.clone(), Arc::new(test_config()))
}

/// Insert an approved, active account with a password
pub async fn seed_account(pool: &SqlitePool, username: &str, role: Role) -> Account {
    accounts(pool)
        .insert(NewAccount {
            username: username.to_string(),
            email: format!("{}@interns360.test", username),
            name: username.to_string(),
            employee_id: None,
            role,
            is_approved: true,
            password_hash: Some(hash_password("Passw0rd!").expect("hash")),
            external_id: None,
            auth_provider: "password",
        })
        .await
        .expect("seed account")
}
