//! Shared harness for the HTTP scenario tests
#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use interns360::{
    config::{
        AuthConfig, LoggingConfig, RegistrationConfig, ServerConfig, ServiceConfig, StorageConfig,
    },
    context::AppContext,
    db,
    federation::{ExternalProfile, IdentityProvider},
    mailer::MailSender,
    server, ApiError, ApiResult,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "lead@interns360.test";
pub const PASSWORD: &str = "Passw0rd!";

/// Identity provider that knows whatever profiles a test registers
#[derive(Default)]
pub struct FakeProvider {
    profiles: Mutex<HashMap<String, ExternalProfile>>,
    codes: Mutex<HashMap<String, String>>,
}

impl FakeProvider {
    pub fn accept(&self, token: &str, profile: ExternalProfile) {
        self.profiles
            .lock()
            .unwrap()
            .insert(token.to_string(), profile);
    }

    pub fn accept_code(&self, code: &str, token: &str) {
        self.codes
            .lock()
            .unwrap()
            .insert(code.to_string(), token.to_string());
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    async fn fetch_profile(&self, access_token: &str) -> ApiResult<ExternalProfile> {
        self.profiles
            .lock()
            .unwrap()
            .get(access_token)
            .cloned()
            .ok_or_else(|| ApiError::Authentication("invalid external token".to_string()))
    }

    async fn exchange_code(&self, code: &str) -> ApiResult<String> {
        self.codes
            .lock()
            .unwrap()
            .get(code)
            .cloned()
            .ok_or_else(|| ApiError::Authentication("invalid authorization code".to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Mail sender that keeps every message in memory
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
}

impl RecordingMailer {
    pub fn last_to(&self, to: &str) -> Option<SentMail> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|m| m.to == to)
            .cloned()
    }
}

#[async_trait]
impl MailSender for RecordingMailer {
    fn is_configured(&self) -> bool {
        true
    }

    async fn send(&self, to: &str, subject: &str, body: &str) -> ApiResult<()> {
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

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
            jwt_secret: "scenario-secret-that-is-at-least-32-chars".to_string(),
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

pub struct TestApp {
    pub ctx: AppContext,
    pub router: Router,
    pub provider: Arc<FakeProvider>,
    pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
    pub async fn new() -> Self {
        let pool = db::memory_pool().await.expect("in-memory pool");
        let provider = Arc::new(FakeProvider::default());
        let mailer = Arc::new(RecordingMailer::default());

        let ctx = AppContext::with_collaborators(
            test_config(),
            pool,
            provider.clone(),
            mailer.clone(),
        );
        let router = server::build_router(ctx.clone());

        Self {
            ctx,
            router,
            provider,
            mailer,
        }
    }

    /// Send one request through the full router
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };

        (status, value)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, token, None).await
    }

    /// Self-register; returns the created account JSON
    pub async fn register(&self, username: &str, email: &str) -> Value {
        let (status, body) = self
            .post(
                "/api/v1/auth/register",
                None,
                serde_json::json!({
                    "username": username,
                    "email": email,
                    "name": username,
                    "password": PASSWORD,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        body
    }

    pub async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.post(
            "/api/v1/auth/login",
            None,
            serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    /// Register the allow-listed admin and return (account id, token)
    pub async fn admin(&self) -> (String, String) {
        let account = self.register("lead", ADMIN_EMAIL).await;
        let (status, body) = self.login(ADMIN_EMAIL, PASSWORD).await;
        assert_eq!(status, StatusCode::OK, "admin login failed: {}", body);
        (
            account["id"].as_str().unwrap().to_string(),
            body["access_token"].as_str().unwrap().to_string(),
        )
    }

    /// Register an account, let the admin approve it with `role`, and log in
    pub async fn approved(&self, admin_token: &str, username: &str, role: &str) -> (String, String) {
        let email = format!("{}@interns360.test", username);
        let account = self.register(username, &email).await;
        let id = account["id"].as_str().unwrap().to_string();

        let (status, body) = self
            .patch(
                &format!("/api/v1/admin/users/{}", id),
                Some(admin_token),
                serde_json::json!({ "is_approved": true, "role": role }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "approve failed: {}", body);

        let (status, body) = self.login(&email, PASSWORD).await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        (id, body["access_token"].as_str().unwrap().to_string())
    }
}

pub fn profile(subject: &str, email: &str, name: &str) -> ExternalProfile {
    ExternalProfile {
        subject: subject.to_string(),
        display_name: Some(name.to_string()),
        given_name: None,
        surname: None,
        mail: Some(email.to_string()),
        user_principal_name: None,
    }
}
