/// Account manager implementation using runtime queries
use crate::{
    account::{
        password::{hash_password, verify_password},
        AccountPatch, OtpRegisterRequest, RegisterRequest,
    },
    config::ServerConfig,
    db::account::{Account, BasicUser, Role},
    error::{ApiError, ApiResult},
    store::{new_id, Filters, UpdateBuilder},
    validation,
};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::sync::Arc;

const DUPLICATE_ACCOUNT: &str = "User with this email or username already exists";

/// Values for a new account row
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub name: String,
    pub employee_id: Option<String>,
    pub role: Role,
    pub is_approved: bool,
    pub password_hash: Option<String>,
    pub external_id: Option<String>,
    pub auth_provider: &'static str,
}

/// Account manager service
pub struct AccountManager {
    db: SqlitePool,
    config: Arc<ServerConfig>,
}

impl AccountManager {
    /// Create a new account manager
    pub fn new(db: SqlitePool, config: Arc<ServerConfig>) -> Self {
        Self { db, config }
    }

    /// Whether this email is on the admin allow-list
    pub fn is_admin_email(&self, email: &str) -> bool {
        self.config.authentication.is_admin_email(email)
    }

    /// Self-registration. Allow-listed emails become approved admins,
    /// everyone else a pending intern.
    pub async fn register(&self, req: RegisterRequest) -> ApiResult<Account> {
        let email = validation::normalize_email(&req.email);
        let username = validation::normalize_username(&req.username);

        validation::validate_email(&email)?;
        validation::validate_password_strength(&req.password)?;

        if self.find_by_email(&email).await?.is_some()
            || self.find_by_username(&username).await?.is_some()
        {
            return Err(ApiError::Validation(DUPLICATE_ACCOUNT.to_string()));
        }

        let is_admin = self.is_admin_email(&email);

        let account = self
            .insert(NewAccount {
                username,
                email,
                name: req.name.trim().to_string(),
                employee_id: req.employee_id,
                role: if is_admin { Role::Admin } else { Role::Intern },
                is_approved: is_admin,
                password_hash: Some(hash_password(&req.password)?),
                external_id: None,
                auth_provider: "password",
            })
            .await?;

        tracing::info!(user_id = %account.id, role = %account.role, "account registered");
        Ok(account)
    }

    /// Everything a code-verified registration can fail on besides the code itself
    pub async fn check_verified_registration(&self, req: &OtpRegisterRequest) -> ApiResult<()> {
        validation::validate_password_strength(&req.password)?;

        if self.email_registered(&req.email).await? {
            return Err(ApiError::Validation("Email already registered".to_string()));
        }
        Ok(())
    }

    /// Create a pending intern for an email whose verification code was already consumed.
    /// The username comes from the email local part.
    pub async fn register_verified(&self, req: &OtpRegisterRequest) -> ApiResult<Account> {
        self.check_verified_registration(req).await?;
        let email = validation::normalize_email(&req.email);

        let username = self
            .unique_username(validation::email_local_part(&email))
            .await?;

        let account = self
            .insert(NewAccount {
                username,
                email,
                name: req.name.trim().to_string(),
                employee_id: None,
                role: Role::Intern,
                is_approved: false,
                password_hash: Some(hash_password(&req.password)?),
                external_id: None,
                auth_provider: "password",
            })
            .await?;

        tracing::info!(user_id = %account.id, "account registered with verification code");
        Ok(account)
    }

    /// Insert an account row. Unique collisions surface as a validation error.
    pub async fn insert(&self, new: NewAccount) -> ApiResult<Account> {
        if new.password_hash.is_none() && new.external_id.is_none() {
            return Err(ApiError::Validation(
                "Account needs a password or an external identity".to_string(),
            ));
        }

        let id = new_id();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO users (id, username, email, name, employee_id, role, is_active, is_approved,
                                password_hash, external_id, auth_provider, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?8, ?9, ?10, ?11, ?11)",
        )
        .bind(&id)
        .bind(validation::normalize_username(&new.username))
        .bind(validation::normalize_email(&new.email))
        .bind(&new.name)
        .bind(&new.employee_id)
        .bind(new.role.as_str())
        .bind(new.is_approved)
        .bind(&new.password_hash)
        .bind(&new.external_id)
        .bind(new.auth_provider)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(|e| ApiError::unique_or(e, DUPLICATE_ACCOUNT))?;

        self.get(&id).await
    }

    /// Password sign-in. Returns the account once every sign-in check passes.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<Account> {
        let email = validation::normalize_email(email);

        let account = self.find_by_email(&email).await?;
        let valid = match &account {
            Some(Account {
                password_hash: Some(hash),
                ..
            }) => verify_password(password, hash),
            _ => false,
        };

        let account = match (account, valid) {
            (Some(account), true) => account,
            _ => {
                tracing::debug!("rejected password sign-in");
                return Err(ApiError::Authentication(
                    "Incorrect email or password".to_string(),
                ));
            }
        };

        Self::ensure_can_sign_in(&account)?;
        Ok(account)
    }

    /// Active and approved (admins are always approved)
    pub fn ensure_can_sign_in(account: &Account) -> ApiResult<()> {
        if !account.is_active {
            return Err(ApiError::Authorization("deactivated".to_string()));
        }

        if !account.effectively_approved() {
            return Err(ApiError::Authorization("pending approval".to_string()));
        }

        Ok(())
    }

    /// Get account by id, 404 on miss
    pub async fn get(&self, id: &str) -> ApiResult<Account> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }

    pub async fn find_by_id(&self, id: &str) -> ApiResult<Option<Account>> {
        self.find_one("id", id).await
    }

    pub async fn find_by_username(&self, username: &str) -> ApiResult<Option<Account>> {
        self.find_one("username", &validation::normalize_username(username))
            .await
    }

    pub async fn find_by_email(&self, email: &str) -> ApiResult<Option<Account>> {
        self.find_one("email", &validation::normalize_email(email))
            .await
    }

    pub async fn find_by_external_id(&self, external_id: &str) -> ApiResult<Option<Account>> {
        self.find_one("external_id", external_id).await
    }

    async fn find_one(&self, column: &'static str, value: &str) -> ApiResult<Option<Account>> {
        let sql = format!("SELECT * FROM users WHERE {} = ?1", column);
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(value)
            .fetch_optional(&self.db)
            .await?;

        Ok(account)
    }

    /// Whether an email is already known as a user or an intern profile
    pub async fn email_registered(&self, email: &str) -> ApiResult<bool> {
        let email = validation::normalize_email(email);
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)
                 OR EXISTS(SELECT 1 FROM interns WHERE email = ?1)",
        )
        .bind(&email)
        .fetch_one(&self.db)
        .await?;

        Ok(exists)
    }

    /// Admin listing, newest first
    pub async fn list(&self, pending_only: bool, role: Option<Role>) -> ApiResult<Vec<Account>> {
        let filters = Filters::new()
            .eq("is_approved", pending_only.then_some(false))
            .eq("role", role.map(|r| r.as_str()));

        crate::store::fetch_all(&self.db, "SELECT * FROM users", &filters, "created_at DESC").await
    }

    /// Id, name, email and role only
    pub async fn list_basic(&self, role: Option<Role>) -> ApiResult<Vec<BasicUser>> {
        let filters = Filters::new().eq("role", role.map(|r| r.as_str()));

        crate::store::fetch_all(
            &self.db,
            "SELECT id, name, email, role FROM users",
            &filters,
            "created_at DESC",
        )
        .await
    }

    /// Apply an admin patch (approval, role assignment, activation)
    pub async fn update(&self, id: &str, patch: AccountPatch) -> ApiResult<Account> {
        let changed = UpdateBuilder::new("users")
            .set_opt("name", patch.name)
            .set_opt("employee_id", patch.employee_id)
            .set_opt("role", patch.role.map(|r| r.as_str()))
            .set_opt("is_active", patch.is_active)
            .set_opt("is_approved", patch.is_approved)
            .execute(&self.db, "id", id)
            .await?;

        if changed == 0 {
            return Err(ApiError::NotFound("User not found".to_string()));
        }

        let account = self.get(id).await?;
        tracing::info!(
            user_id = %account.id,
            role = %account.role,
            approved = account.is_approved,
            active = account.is_active,
            "account updated"
        );
        Ok(account)
    }

    /// Hard delete. Callers cannot delete themselves.
    pub async fn delete(&self, id: &str, caller_id: &str) -> ApiResult<()> {
        if id == caller_id {
            return Err(ApiError::Validation(
                "Cannot delete your own account".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("User not found".to_string()));
        }

        tracing::info!(user_id = %id, deleted_by = %caller_id, "account deleted");
        Ok(())
    }

    /// First free username derived from `base`, adding a numeric suffix on collision
    pub async fn unique_username(&self, base: &str) -> ApiResult<String> {
        let mut base: String = base
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
            .collect();
        if base.is_empty() {
            base = "user".to_string();
        }

        if self.find_by_username(&base).await?.is_none() {
            return Ok(base);
        }

        let mut suffix = 1u32;
        loop {
            let candidate = format!("{}{}", base, suffix);
            if self.find_by_username(&candidate).await?.is_none() {
                return Ok(candidate);
            }
            suffix += 1;
        }
    }

    /// Link an external subject to an existing account
    pub async fn link_external(&self, id: &str, external_id: &str, provider: &str) -> ApiResult<Account> {
        sqlx::query(
            "UPDATE users SET external_id = ?1, auth_provider = ?2, updated_at = ?3 WHERE id = ?4",
        )
        .bind(external_id)
        .bind(provider)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.db)
        .await
        .map_err(|e| ApiError::unique_or(e, "External identity already linked to another user"))?;

        self.get(id).await
    }

    /// Refresh display name and email from a fresh external profile
    pub async fn refresh_profile(&self, id: &str, name: &str, email: &str) -> ApiResult<Account> {
        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE users SET name = ");
        qb.push_bind(name.to_string());
        qb.push(", email = ");
        qb.push_bind(validation::normalize_email(email));
        qb.push(", updated_at = ");
        qb.push_bind(Utc::now());
        qb.push(" WHERE id = ");
        qb.push_bind(id.to_string());

        qb.build()
            .execute(&self.db)
            .await
            .map_err(|e| ApiError::unique_or(e, DUPLICATE_ACCOUNT))?;

        self.get(id).await
    }

    /// Replace the password hash
    pub async fn set_password(&self, id: &str, password: &str) -> ApiResult<()> {
        validation::validate_password_strength(password)?;
        let hash = hash_password(password)?;

        let result = sqlx::query("UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(hash)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("User not found".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, ADMIN_EMAIL};

    fn register_req(username: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            name: "Test User".to_string(),
            password: "Str0ng!pass".to_string(),
            employee_id: None,
        }
    }

    #[tokio::test]
    async fn test_register_defaults_to_pending_intern() {
        let pool = testing::test_pool().await;
        let manager = testing::accounts(&pool);

        let account = manager
            .register(register_req("  JDoe ", "JDoe@Example.com"))
            .await
            .unwrap();

        assert_eq!(account.username, "jdoe");
        assert_eq!(account.email, "jdoe@example.com");
        assert_eq!(account.role, Role::Intern);
        assert!(!account.is_approved);
        assert!(account.is_active);
        assert_ne!(account.password_hash.as_deref(), Some("Str0ng!pass"));
    }

    #[tokio::test]
    async fn test_register_allow_listed_email_is_admin() {
        let pool = testing::test_pool().await;
        let manager = testing::accounts(&pool);

        let account = manager
            .register(register_req("lead", &ADMIN_EMAIL.to_uppercase()))
            .await
            .unwrap();

        assert_eq!(account.role, Role::Admin);
        assert!(account.is_approved);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected_regardless_of_case() {
        let pool = testing::test_pool().await;
        let manager = testing::accounts(&pool);

        manager.register(register_req("foo", "foo@x.com")).await.unwrap();
        let err = manager
            .register(register_req("other", "Foo@X.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(err.reason(), DUPLICATE_ACCOUNT);
    }

    #[tokio::test]
    async fn test_weak_password_rejected() {
        let pool = testing::test_pool().await;
        let manager = testing::accounts(&pool);

        let mut req = register_req("weak", "weak@x.com");
        req.password = "password".to_string();
        assert!(matches!(
            manager.register(req).await,
            Err(ApiError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_login_checks_in_order() {
        let pool = testing::test_pool().await;
        let manager = testing::accounts(&pool);

        let account = manager.register(register_req("ivy", "ivy@x.com")).await.unwrap();

        let err = manager.login("ivy@x.com", "wrong").await.unwrap_err();
        assert_eq!(err.reason(), "Incorrect email or password");

        let err = manager.login("nobody@x.com", "Str0ng!pass").await.unwrap_err();
        assert_eq!(err.reason(), "Incorrect email or password");

        let err = manager.login("IVY@x.com", "Str0ng!pass").await.unwrap_err();
        assert_eq!(err.reason(), "pending approval");

        manager
            .update(
                &account.id,
                AccountPatch {
                    is_approved: Some(true),
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let err = manager.login("ivy@x.com", "Str0ng!pass").await.unwrap_err();
        assert_eq!(err.reason(), "deactivated");

        manager
            .update(
                &account.id,
                AccountPatch {
                    is_active: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(manager.login("ivy@x.com", "Str0ng!pass").await.is_ok());
    }

    #[tokio::test]
    async fn test_unapproved_admin_can_still_sign_in() {
        let pool = testing::test_pool().await;
        let manager = testing::accounts(&pool);
        let admin = testing::seed_account(&pool, "boss", Role::Admin).await;

        manager
            .update(
                &admin.id,
                AccountPatch {
                    is_approved: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(manager.login("boss@interns360.test", "Passw0rd!").await.is_ok());
    }

    #[tokio::test]
    async fn test_update_empty_and_missing() {
        let pool = testing::test_pool().await;
        let manager = testing::accounts(&pool);
        let account = testing::seed_account(&pool, "amy", Role::Intern).await;

        let err = manager.update(&account.id, AccountPatch::default()).await.unwrap_err();
        assert_eq!(err.reason(), "No fields to update");

        let err = manager
            .update(
                "missing",
                AccountPatch {
                    role: Some(Role::ScrumMaster),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn test_patch_rejects_unknown_keys() {
        let parsed: Result<AccountPatch, _> =
            serde_json::from_str(r#"{"role": "admin", "password_hash": "x"}"#);
        assert!(parsed.is_err());

        let parsed: AccountPatch = serde_json::from_str(r#"{"role": "scrum_master"}"#).unwrap();
        assert_eq!(parsed.role, Some(Role::ScrumMaster));
    }

    #[tokio::test]
    async fn test_delete_self_forbidden() {
        let pool = testing::test_pool().await;
        let manager = testing::accounts(&pool);
        let me = testing::seed_account(&pool, "admin1", Role::Admin).await;
        let other = testing::seed_account(&pool, "admin2", Role::Admin).await;

        let err = manager.delete(&me.id, &me.id).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        manager.delete(&other.id, &me.id).await.unwrap();
        assert!(manager.find_by_id(&other.id).await.unwrap().is_none());

        let err = manager.delete(&other.id, &me.id).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unique_username_suffixes() {
        let pool = testing::test_pool().await;
        let manager = testing::accounts(&pool);
        testing::seed_account(&pool, "sam", Role::Intern).await;
        testing::seed_account(&pool, "sam1", Role::Intern).await;

        assert_eq!(manager.unique_username("Sam").await.unwrap(), "sam2");
        assert_eq!(manager.unique_username("new.person").await.unwrap(), "new.person");
        assert_eq!(manager.unique_username("+++").await.unwrap(), "user");
    }

    #[tokio::test]
    async fn test_list_filters() {
        let pool = testing::test_pool().await;
        let manager = testing::accounts(&pool);
        testing::seed_account(&pool, "a1", Role::Admin).await;
        testing::seed_account(&pool, "s1", Role::ScrumMaster).await;
        manager.register(register_req("p1", "p1@x.com")).await.unwrap();

        assert_eq!(manager.list(false, None).await.unwrap().len(), 3);
        assert_eq!(manager.list(true, None).await.unwrap().len(), 1);
        assert_eq!(
            manager.list(false, Some(Role::ScrumMaster)).await.unwrap().len(),
            1
        );

        let basic = manager.list_basic(Some(Role::Admin)).await.unwrap();
        assert_eq!(basic.len(), 1);
        assert_eq!(basic[0].role, "admin");
    }

    #[tokio::test]
    async fn test_account_needs_an_auth_path() {
        let pool = testing::test_pool().await;
        let manager = testing::accounts(&pool);

        let err = manager
            .insert(NewAccount {
                username: "ghost".to_string(),
                email: "ghost@x.com".to_string(),
                name: "Ghost".to_string(),
                employee_id: None,
                role: Role::Intern,
                is_approved: false,
                password_hash: None,
                external_id: None,
                auth_provider: "password",
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
