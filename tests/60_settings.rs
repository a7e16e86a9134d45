mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use common::TestServer;

#[tokio::test]
async fn defaults_come_from_config() -> Result<()> {
    let server = TestServer::spawn().await?;
    let token = server.operator_token().await?;

    let reply = server.get("/api/settings", &token).await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["backup_path"], server.backup_dir.to_string_lossy().into_owned());
    assert_eq!(reply.body["default_retention_days"], 30);
    Ok(())
}

#[tokio::test]
async fn only_admins_change_settings() -> Result<()> {
    let server = TestServer::spawn().await?;
    let operator = server.operator_token().await?;
    let admin = server.admin_token().await?;

    let denied = server
        .put("/api/settings", &operator, json!({"default_retention_days": 7}))
        .await?;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
    assert_eq!(denied.body["detail"], "Admin privileges required");

    let out_of_range = server
        .put("/api/settings", &admin, json!({"default_retention_days": 0}))
        .await?;
    assert_eq!(out_of_range.status, StatusCode::UNPROCESSABLE_ENTITY);

    let updated = server
        .put(
            "/api/settings",
            &admin,
            json!({"default_retention_days": 7, "backup_path": "/srv/unifi-backups"}),
        )
        .await?;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["default_retention_days"], 7);
    assert_eq!(updated.body["backup_path"], "/srv/unifi-backups");

    let read_back = server.get("/api/settings", &operator).await?;
    assert_eq!(read_back.body["default_retention_days"], 7);
    Ok(())
}

#[tokio::test]
async fn retention_setting_applies_to_new_schedules() -> Result<()> {
    let server = TestServer::spawn().await?;
    let admin = server.admin_token().await?;
    server
        .put("/api/settings", &admin, json!({"default_retention_days": 90}))
        .await?;

    let device_id = server.create_device(&admin, "gw").await?;
    let schedule = server
        .post(
            "/api/schedules",
            &admin,
            json!({"device_id": device_id, "name": "weekly", "cron_expression": "0 2 * * 0"}),
        )
        .await?;
    assert_eq!(schedule.status, StatusCode::CREATED);
    assert_eq!(schedule.body["retention_days"], 90);
    Ok(())
}

#[tokio::test]
async fn storage_stats_sum_backups_per_device() -> Result<()> {
    let server = TestServer::spawn().await?;
    let token = server.operator_token().await?;
    let busy = server.create_device(&token, "busy").await?;
    server.create_device(&token, "idle").await?;

    let created = server.post("/api/backups", &token, json!({"device_id": busy})).await?;
    let id = created.body["id"].as_i64().unwrap_or_default();
    let status_url = format!("/api/backups/{id}/status");
    server.put(&status_url, &token, json!({"status": "running"})).await?;
    server
        .put(&status_url, &token, json!({"status": "completed", "file_size": 512}))
        .await?;

    let reply = server.get("/api/settings/storage", &token).await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["total_backups"], 1);

    let by_device = reply.body["by_device"].as_array().cloned().unwrap_or_default();
    assert_eq!(by_device.len(), 2);
    assert_eq!(by_device[0]["device_name"], "busy");
    assert_eq!(by_device[0]["backup_count"], 1);
    assert_eq!(by_device[0]["total_size"], 512);
    assert_eq!(by_device[1]["device_name"], "idle");
    assert_eq!(by_device[1]["backup_count"], 0);

    let usage = reply.body["usage_percent"].as_f64().unwrap_or(-1.0);
    assert!((0.0..=100.0).contains(&usage));
    Ok(())
}

#[tokio::test]
async fn overlong_backup_path_is_422() -> Result<()> {
    let server = TestServer::spawn().await?;
    let admin = server.admin_token().await?;

    let path = format!("/{}", "b".repeat(300));
    let reply = server.put("/api/settings", &admin, json!({"backup_path": path})).await?;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    Ok(())
}
