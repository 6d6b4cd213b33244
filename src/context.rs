/// Application context and dependency injection
use crate::{
    account::{AccountManager, OtpManager, PasswordResetFlow, TokenIssuer},
    config::ServerConfig,
    dashboard::DashboardAggregator,
    db,
    error::ApiResult,
    federation::{FederationBridge, GraphIdentityProvider, IdentityProvider},
    mailer::{MailSender, SmtpMailer},
    store::{
        AttendanceStore, BatchStore, CatalogStore, DsuStore, InternStore, MentorStore,
        ProjectStore, PtoStore, ReviewStore, TaskStore,
    },
};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    // Identity
    pub tokens: Arc<TokenIssuer>,
    pub accounts: Arc<AccountManager>,
    pub federation: Arc<FederationBridge>,
    pub resets: Arc<PasswordResetFlow>,
    pub otps: Arc<OtpManager>,
    // Resource repositories
    pub interns: Arc<InternStore>,
    pub tasks: Arc<TaskStore>,
    pub dsu: Arc<DsuStore>,
    pub pto: Arc<PtoStore>,
    pub catalog: Arc<CatalogStore>,
    pub batches: Arc<BatchStore>,
    pub projects: Arc<ProjectStore>,
    pub mentors: Arc<MentorStore>,
    pub reviews: Arc<ReviewStore>,
    pub attendance: Arc<AttendanceStore>,
    // Read side
    pub dashboard: Arc<DashboardAggregator>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> ApiResult<Self> {
        // Validate configuration
        config.validate()?;

        // Initialize database and apply the embedded schema
        let pool = db::create_pool(&config.storage.database_path, db::DatabaseOptions::default()).await?;
        db::run_migrations(&pool).await?;
        db::test_connection(&pool).await?;

        let timeout = Duration::from_secs(config.service.outbound_timeout_secs);

        let mailer = SmtpMailer::new(config.email.clone(), timeout)?;
        if !mailer.is_configured() {
            tracing::warn!("SMTP not configured - password reset and OTP mail are unavailable");
        }

        let provider = GraphIdentityProvider::new(config.federation.clone(), timeout)?;
        if config.federation.is_none() {
            tracing::info!("Azure AD SSO not configured");
        }

        Ok(Self::with_collaborators(
            config,
            pool,
            Arc::new(provider),
            Arc::new(mailer),
        ))
    }

    /// Wire every service over an existing pool and outbound collaborators
    pub fn with_collaborators(
        config: ServerConfig,
        pool: SqlitePool,
        provider: Arc<dyn IdentityProvider>,
        mailer: Arc<dyn MailSender>,
    ) -> Self {
        let config = Arc::new(config);

        let tokens = Arc::new(TokenIssuer::new(
            &config.authentication.jwt_secret,
            config.authentication.token_ttl_minutes,
        ));
        let accounts = Arc::new(AccountManager::new(pool.clone(), config.clone()));
        let federation = Arc::new(FederationBridge::new(accounts.clone(), provider));
        let resets = Arc::new(PasswordResetFlow::new(
            pool.clone(),
            mailer.clone(),
            config.service.frontend_url.clone(),
        ));
        let otps = Arc::new(OtpManager::new(
            pool.clone(),
            mailer.clone(),
            config.registration.otp_expiry_minutes,
        ));

        let interns = Arc::new(InternStore::new(pool.clone()));
        let catalog = Arc::new(CatalogStore::new(pool.clone()));

        Self {
            tasks: Arc::new(TaskStore::new(pool.clone(), interns.clone())),
            dsu: Arc::new(DsuStore::new(pool.clone(), interns.clone())),
            pto: Arc::new(PtoStore::new(pool.clone(), interns.clone())),
            batches: Arc::new(BatchStore::new(pool.clone(), catalog.clone())),
            projects: Arc::new(ProjectStore::new(pool.clone(), interns.clone())),
            mentors: Arc::new(MentorStore::new(pool.clone(), accounts.clone())),
            reviews: Arc::new(ReviewStore::new(pool.clone(), interns.clone())),
            attendance: Arc::new(AttendanceStore::new(pool.clone(), interns.clone())),
            dashboard: Arc::new(DashboardAggregator::new(pool.clone())),
            config,
            db: pool,
            tokens,
            accounts,
            federation,
            resets,
            otps,
            interns,
            catalog,
        }
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
