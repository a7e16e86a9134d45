mod common;

use anyhow::Result;
use reqwest::{header, Method, StatusCode};
use serde_json::json;

use common::{TestServer, ADMIN_PASSWORD, ADMIN_USERNAME};

#[tokio::test]
async fn login_returns_token_pair_and_stamps_last_login() -> Result<()> {
    let server = TestServer::spawn().await?;

    let reply = server.login(ADMIN_USERNAME, ADMIN_PASSWORD).await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["token_type"], "bearer");
    assert!(reply.body["access_token"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(reply.body["refresh_token"].as_str().is_some_and(|t| !t.is_empty()));

    let token = reply.body["access_token"].as_str().unwrap_or_default().to_string();
    let me = server.get("/api/auth/me", &token).await?;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["username"], ADMIN_USERNAME);
    assert_eq!(me.body["is_admin"], true);
    assert!(!me.body["last_login"].is_null());
    assert!(me.body.get("password_hash").is_none());
    Ok(())
}

#[tokio::test]
async fn bad_credentials_share_one_message() -> Result<()> {
    let server = TestServer::spawn().await?;

    let wrong_password = server.login(ADMIN_USERNAME, "not-the-password").await?;
    let unknown_user = server.login("nobody", "whatever-password").await?;

    for reply in [&wrong_password, &unknown_user] {
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        assert_eq!(reply.body["detail"], "Invalid username or password");
        assert_eq!(reply.body["code"], "UNAUTHORIZED");
    }
    Ok(())
}

#[tokio::test]
async fn inactive_user_cannot_log_in() -> Result<()> {
    let server = TestServer::spawn().await?;
    let admin = server.admin_token().await?;
    let user = server.seed_user("retired", "retired-password", false).await?;

    let reply = server
        .put(&format!("/api/users/{}", user.id), &admin, json!({"is_active": false}))
        .await?;
    assert_eq!(reply.status, StatusCode::OK);

    let login = server.login("retired", "retired-password").await?;
    assert_eq!(login.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn protected_routes_require_bearer_token() -> Result<()> {
    let server = TestServer::spawn().await?;

    let reply = server.request(Method::GET, "/api/devices", None, None).await?;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["detail"], "Not authenticated");
    assert_eq!(
        reply.headers.get(header::WWW_AUTHENTICATE).and_then(|v| v.to_str().ok()),
        Some("Bearer")
    );

    let garbage = server.get("/api/devices", "not.a.jwt").await?;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
    assert_eq!(garbage.body["detail"], "Could not validate credentials");
    Ok(())
}

#[tokio::test]
async fn refresh_token_is_not_an_access_token() -> Result<()> {
    let server = TestServer::spawn().await?;
    let login = server.login(ADMIN_USERNAME, ADMIN_PASSWORD).await?;
    let refresh = login.body["refresh_token"].as_str().unwrap_or_default().to_string();
    let access = login.body["access_token"].as_str().unwrap_or_default().to_string();

    let reply = server.get("/api/auth/me", &refresh).await?;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["detail"], "Invalid token type");

    let reply = server
        .request(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({"refresh_token": access})),
        )
        .await?;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["detail"], "Invalid token type");
    Ok(())
}

#[tokio::test]
async fn refresh_issues_a_working_pair() -> Result<()> {
    let server = TestServer::spawn().await?;
    let login = server.login(ADMIN_USERNAME, ADMIN_PASSWORD).await?;
    let refresh = login.body["refresh_token"].as_str().unwrap_or_default().to_string();

    let reply = server
        .request(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({"refresh_token": refresh})),
        )
        .await?;
    assert_eq!(reply.status, StatusCode::OK);

    let access = reply.body["access_token"].as_str().unwrap_or_default().to_string();
    let me = server.get("/api/auth/me", &access).await?;
    assert_eq!(me.status, StatusCode::OK);

    let bogus = server
        .request(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({"refresh_token": "bogus"})),
        )
        .await?;
    assert_eq!(bogus.status, StatusCode::UNAUTHORIZED);
    assert_eq!(bogus.body["detail"], "Invalid or expired refresh token");
    Ok(())
}

#[tokio::test]
async fn password_change_flow() -> Result<()> {
    let server = TestServer::spawn().await?;
    let token = server.operator_token().await?;

    let wrong = server
        .put(
            "/api/auth/password",
            &token,
            json!({"current_password": "nope-nope", "new_password": "brand-new-password"}),
        )
        .await?;
    assert_eq!(wrong.status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong.body["detail"], "Current password is incorrect");

    let short = server
        .put(
            "/api/auth/password",
            &token,
            json!({"current_password": common::OPERATOR_PASSWORD, "new_password": "short"}),
        )
        .await?;
    assert_eq!(short.status, StatusCode::UNPROCESSABLE_ENTITY);

    let ok = server
        .put(
            "/api/auth/password",
            &token,
            json!({"current_password": common::OPERATOR_PASSWORD, "new_password": "brand-new-password"}),
        )
        .await?;
    assert_eq!(ok.status, StatusCode::OK);
    assert_eq!(ok.body["message"], "Password changed successfully");

    let old = server.login(common::OPERATOR_USERNAME, common::OPERATOR_PASSWORD).await?;
    assert_eq!(old.status, StatusCode::UNAUTHORIZED);
    let new = server.login(common::OPERATOR_USERNAME, "brand-new-password").await?;
    assert_eq!(new.status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn logout_acknowledges() -> Result<()> {
    let server = TestServer::spawn().await?;
    let token = server.admin_token().await?;

    let reply = server
        .request(Method::POST, "/api/auth/logout", Some(&token), None)
        .await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["message"], "Logged out successfully");
    Ok(())
}

#[tokio::test]
async fn malformed_login_body_is_422() -> Result<()> {
    let server = TestServer::spawn().await?;

    let reply = server
        .request(Method::POST, "/api/auth/login", None, Some(json!({"username": "admin"})))
        .await?;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(reply.body["code"], "INVALID_JSON");
    Ok(())
}
