//! End-to-end scenarios driven through the full router
mod common;

use axum::http::StatusCode;
use common::{profile, TestApp, ADMIN_EMAIL, PASSWORD};
use interns360::db::account::Role;
use serde_json::json;

#[tokio::test]
async fn test_pending_intern_is_approved_then_signs_in_with_assigned_role() {
    let app = TestApp::new().await;
    let (_, admin_token) = app.admin().await;

    let account = app.register("Ines", "Ines@Interns360.test").await;
    assert_eq!(account["username"], "ines");
    assert_eq!(account["email"], "ines@interns360.test");
    assert_eq!(account["role"], "intern");
    assert_eq!(account["is_approved"], false);
    assert!(account.get("password_hash").is_none());

    let (status, body) = app.login("ines@interns360.test", PASSWORD).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "pending approval");

    let id = account["id"].as_str().unwrap();
    let (status, body) = app
        .patch(
            &format!("/api/v1/admin/users/{}", id),
            Some(&admin_token),
            json!({ "is_approved": true, "role": "scrum_master" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "scrum_master");

    let (status, body) = app.login("ines@interns360.test", PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");

    let token = body["access_token"].as_str().unwrap();
    let claims = app.ctx.tokens.verify(token).unwrap();
    assert_eq!(claims.sub, "ines");
    assert_eq!(claims.role, Role::ScrumMaster);

    let (status, me) = app.get("/api/v1/users/me", Some(token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], id);
}

#[tokio::test]
async fn test_federated_login_links_local_account_then_matches_by_subject() {
    let app = TestApp::new().await;
    let (_, admin_token) = app.admin().await;
    let (local_id, _) = app.approved(&admin_token, "omar", "intern").await;

    app.provider.accept(
        "ext-token-1",
        profile("subject-omar", "Omar@interns360.test", "Omar Haddad"),
    );

    let (status, body) = app
        .post(
            "/api/v1/auth/sso/azure",
            None,
            json!({ "access_token": "ext-token-1" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["user"]["id"], local_id.as_str());
    assert_eq!(body["user"]["name"], "omar");

    // Same subject, different mail: only the subject tier can find it
    app.provider.accept(
        "ext-token-2",
        profile("subject-omar", "omar.haddad@corp.test", "Omar H."),
    );
    let (status, body) = app
        .post(
            "/api/v1/auth/sso/azure",
            None,
            json!({ "access_token": "ext-token-2" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["user"]["id"], local_id.as_str());
    assert_eq!(body["user"]["email"], "omar.haddad@corp.test");
    assert_eq!(body["user"]["name"], "Omar H.");

    let (_, users) = app.get("/api/v1/admin/users", Some(&admin_token)).await;
    assert_eq!(users.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_federated_sign_in_for_new_subject_waits_for_approval() {
    let app = TestApp::new().await;
    app.provider.accept(
        "fresh",
        profile("subject-new", "newcomer@corp.test", "New Comer"),
    );
    app.provider.accept_code("auth-code", "fresh");

    let (status, body) = app
        .post(
            "/api/v1/auth/sso/azure/callback",
            None,
            json!({ "code": "auth-code" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "pending approval");

    let (status, body) = app
        .post("/api/v1/auth/sso/azure", None, json!({ "access_token": "bogus" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "AuthenticationRequired");

    let (status, _) = app.post("/api/v1/auth/sso/azure", None, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_cannot_delete_self_but_can_delete_another_admin() {
    let app = TestApp::new().await;
    let (admin_id, admin_token) = app.admin().await;
    let (other_id, _) = app.approved(&admin_token, "second", "admin").await;

    let (status, body) = app
        .delete(&format!("/api/v1/admin/users/{}", admin_id), Some(&admin_token))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ValidationError");

    let (status, _) = app
        .delete(&format!("/api/v1/admin/users/{}", other_id), Some(&admin_token))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .delete(&format!("/api/v1/admin/users/{}", other_id), Some(&admin_token))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_gate_reasons_and_role_checks() {
    let app = TestApp::new().await;
    let (_, admin_token) = app.admin().await;
    let (intern_id, intern_token) = app.approved(&admin_token, "pia", "intern").await;

    let (status, body) = app.get("/api/v1/users/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "no credentials");

    let (status, body) = app.get("/api/v1/users/me", Some("garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "invalid token");

    // Interns are not staff
    let (status, _) = app
        .get("/api/v1/admin/dashboard/stats", Some(&intern_token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    app.patch(
        &format!("/api/v1/admin/users/{}", intern_id),
        Some(&admin_token),
        json!({ "is_active": false }),
    )
    .await;
    let (status, body) = app.get("/api/v1/users/me", Some(&intern_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "deactivated");

    let (status, _) = app
        .patch(
            &format!("/api/v1/admin/users/{}", intern_id),
            Some(&admin_token),
            json!({ "password": "nope" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_registration_ignores_email_case() {
    let app = TestApp::new().await;
    app.register("foo", "foo@x.com").await;

    let (status, body) = app
        .post(
            "/api/v1/auth/register",
            None,
            json!({
                "username": "foo2",
                "email": "Foo@X.com",
                "name": "Foo",
                "password": PASSWORD,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ValidationError");

    let (_, body) = app.get("/api/v1/auth/check-email?email=FOO@x.com", None).await;
    assert_eq!(body["exists"], true);
}

#[tokio::test]
async fn test_password_reset_token_is_single_use() {
    let app = TestApp::new().await;
    let (_, admin_token) = app.admin().await;
    app.approved(&admin_token, "rosa", "intern").await;

    let (status, _) = app
        .post(
            "/api/v1/auth/forgot-password",
            None,
            json!({ "email": "nobody@interns360.test" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post(
            "/api/v1/auth/forgot-password",
            None,
            json!({ "email": "rosa@interns360.test" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let mail = app.mailer.last_to("rosa@interns360.test").unwrap();
    let token = mail
        .body
        .split_whitespace()
        .find_map(|word| word.split_once("token=").map(|(_, t)| t.to_string()))
        .unwrap();

    let reset = json!({
        "token": token,
        "new_password": "N3wPassw0rd!",
        "confirm_password": "N3wPassw0rd!",
    });
    let (status, body) = app
        .post("/api/v1/auth/reset-password", None, reset.clone())
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let (status, _) = app.post("/api/v1/auth/reset-password", None, reset).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.login("rosa@interns360.test", PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.login("rosa@interns360.test", "N3wPassw0rd!").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_otp_registration_creates_pending_account_and_profile() {
    let app = TestApp::new().await;

    let (status, _) = app
        .post(
            "/api/v1/auth/send-otp",
            None,
            json!({ "email": "Newbie@corp.test" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let mail = app.mailer.last_to("newbie@corp.test").unwrap();
    let code = mail
        .body
        .split_whitespace()
        .find(|w| w.len() == 6 && w.chars().all(|c| c.is_ascii_digit()))
        .unwrap()
        .to_string();

    let (status, _) = app
        .post(
            "/api/v1/auth/register/otp",
            None,
            json!({ "email": "newbie@corp.test", "otp": "000000", "name": "New Bie", "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, account) = app
        .post(
            "/api/v1/auth/register/otp",
            None,
            json!({ "email": "newbie@corp.test", "otp": code, "name": "New Bie", "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", account);
    assert_eq!(account["username"], "newbie");
    assert_eq!(account["is_approved"], false);

    let profile = app.ctx.interns.find_by_email("newbie@corp.test").await.unwrap();
    assert_eq!(profile.unwrap().name, "New Bie");

    // Code was consumed and the email is now taken
    let (status, _) = app
        .post(
            "/api/v1/auth/send-otp",
            None,
            json!({ "email": "newbie@corp.test" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.login("newbie@corp.test", PASSWORD).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "pending approval");
}

#[tokio::test]
async fn test_rejected_otp_registration_keeps_code_usable() {
    let app = TestApp::new().await;

    let (status, _) = app
        .post("/api/v1/auth/send-otp", None, json!({ "email": "retry@corp.test" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let mail = app.mailer.last_to("retry@corp.test").unwrap();
    let code = mail
        .body
        .split_whitespace()
        .find(|w| w.len() == 6 && w.chars().all(|c| c.is_ascii_digit()))
        .unwrap()
        .to_string();

    let (status, body) = app
        .post(
            "/api/v1/auth/register/otp",
            None,
            json!({ "email": "retry@corp.test", "otp": code, "name": "Re Try", "password": "weakpass" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_ne!(body["message"], "Invalid or expired OTP");

    let (status, account) = app
        .post(
            "/api/v1/auth/register/otp",
            None,
            json!({ "email": "retry@corp.test", "otp": code, "name": "Re Try", "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", account);
    assert_eq!(account["email"], "retry@corp.test");
}

#[tokio::test]
async fn test_task_completion_counts_once_and_interns_see_only_their_tasks() {
    let app = TestApp::new().await;
    let (_, admin_token) = app.admin().await;
    let (_, intern_token) = app.approved(&admin_token, "tara", "intern").await;

    let (status, tara) = app
        .post(
            "/api/v1/interns",
            Some(&admin_token),
            json!({ "name": "Tara", "email": "tara@interns360.test" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", tara);
    assert_eq!(tara["status"], "onboarding");
    let (_, other) = app
        .post(
            "/api/v1/interns",
            Some(&admin_token),
            json!({ "name": "Other", "email": "other@interns360.test" }),
        )
        .await;

    let (status, task) = app
        .post(
            "/api/v1/tasks",
            Some(&admin_token),
            json!({ "internId": tara["id"], "title": "Write onboarding notes" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", task);
    assert_eq!(task["status"], "not_started");
    assert_eq!(task["priority"], "medium");
    app.post(
        "/api/v1/tasks",
        Some(&admin_token),
        json!({ "internId": other["id"], "title": "Not yours" }),
    )
    .await;

    let uri = format!("/api/v1/tasks/{}", task["id"].as_str().unwrap());
    for _ in 0..2 {
        let (status, body) = app
            .patch(&uri, Some(&intern_token), json!({ "status": "completed" }))
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert!(body["completedAt"].is_string());
    }

    let (_, intern) = app
        .get(
            &format!("/api/v1/interns/{}", tara["id"].as_str().unwrap()),
            Some(&admin_token),
        )
        .await;
    assert_eq!(intern["taskCount"], 1);
    assert_eq!(intern["completedTasks"], 1);

    let (status, _) = app.patch(&uri, Some(&intern_token), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, mine) = app.get("/api/v1/tasks", Some(&intern_token)).await;
    assert_eq!(mine["total"], 1);
    assert_eq!(mine["items"][0]["id"], task["id"]);

    let (_, all) = app.get("/api/v1/tasks", Some(&admin_token)).await;
    assert_eq!(all["total"], 2);
}

#[tokio::test]
async fn test_dashboard_stats_with_no_active_interns() {
    let app = TestApp::new().await;
    let (_, admin_token) = app.admin().await;

    let (status, stats) = app
        .get("/api/v1/admin/dashboard/stats", Some(&admin_token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["activeInterns"], 0);
    assert_eq!(stats["dsuCompletion"], 0.0);
    assert_eq!(stats["taskCompletion"], 0.0);

    let (status, _) = app
        .get(
            "/api/v1/admin/dashboard/recent-dsus?limit=0",
            Some(&admin_token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_and_unknown_routes() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.get("/api/v1/nowhere", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");

    let (status, _) = app.login(ADMIN_EMAIL, PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_reports_unavailable_database() {
    let app = TestApp::new().await;
    app.ctx.db.close().await;

    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");
}
