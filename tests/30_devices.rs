mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use backup_manager::database::Store;
use common::TestServer;

#[tokio::test]
async fn device_crud_round_trip() -> Result<()> {
    let server = TestServer::spawn().await?;
    let token = server.operator_token().await?;

    let created = server
        .post(
            "/api/devices",
            &token,
            json!({
                "name": "Core Gateway",
                "ip_address": "10.0.0.1",
                "api_key": "plain-api-key",
                "device_type": "udm-pro"
            }),
        )
        .await?;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["name"], "Core Gateway");
    assert_eq!(created.body["is_active"], true);
    assert!(created.body.get("api_key").is_none());
    assert!(created.body.get("api_key_encrypted").is_none());
    let id = created.body["id"].as_i64().unwrap_or_default();

    let listed = server.get("/api/devices", &token).await?;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.body.as_array().map(Vec::len), Some(1));

    let updated = server
        .put(
            &format!("/api/devices/{id}"),
            &token,
            json!({"name": "Edge Gateway", "is_active": false}),
        )
        .await?;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["name"], "Edge Gateway");
    assert_eq!(updated.body["ip_address"], "10.0.0.1");
    assert_eq!(updated.body["is_active"], false);

    let deleted = server.delete(&format!("/api/devices/{id}"), &token).await?;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let gone = server.get(&format!("/api/devices/{id}"), &token).await?;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    assert_eq!(gone.body["detail"], "Device not found");
    Ok(())
}

#[tokio::test]
async fn api_key_is_stored_encrypted() -> Result<()> {
    let server = TestServer::spawn().await?;
    let token = server.operator_token().await?;
    let id = server.create_device(&token, "Switch").await?;

    let device = server
        .state
        .store
        .get_device(id as i32)
        .await?
        .ok_or_else(|| anyhow::anyhow!("device missing"))?;
    assert_ne!(device.api_key_encrypted, "unifi-api-key");
    assert_eq!(server.state.crypto.decrypt(&device.api_key_encrypted)?, "unifi-api-key");

    let rotated = server
        .put(&format!("/api/devices/{id}"), &token, json!({"api_key": "rotated-key"}))
        .await?;
    assert_eq!(rotated.status, StatusCode::OK);

    let device = server
        .state
        .store
        .get_device(id as i32)
        .await?
        .ok_or_else(|| anyhow::anyhow!("device missing"))?;
    assert_eq!(server.state.crypto.decrypt(&device.api_key_encrypted)?, "rotated-key");
    Ok(())
}

#[tokio::test]
async fn invalid_device_fields_are_rejected() -> Result<()> {
    let server = TestServer::spawn().await?;
    let token = server.operator_token().await?;

    let bad_ip = server
        .post(
            "/api/devices",
            &token,
            json!({"name": "x", "ip_address": "999.1.1.1", "api_key": "k", "device_type": "t"}),
        )
        .await?;
    assert_eq!(bad_ip.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(bad_ip.body["field_errors"]["ip_address"].is_string());

    let empty_name = server
        .post(
            "/api/devices",
            &token,
            json!({"name": "", "ip_address": "10.0.0.2", "api_key": "k", "device_type": "t"}),
        )
        .await?;
    assert_eq!(empty_name.status, StatusCode::UNPROCESSABLE_ENTITY);

    let missing = server.put("/api/devices/999", &token, json!({"name": "ghost"})).await?;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn deleting_device_removes_its_backups_and_schedules() -> Result<()> {
    let server = TestServer::spawn().await?;
    let token = server.operator_token().await?;
    let id = server.create_device(&token, "Doomed").await?;

    let backup = server.post("/api/backups", &token, json!({"device_id": id})).await?;
    assert_eq!(backup.status, StatusCode::CREATED);
    let schedule = server
        .post(
            "/api/schedules",
            &token,
            json!({"device_id": id, "name": "nightly", "cron_expression": "0 3 * * *"}),
        )
        .await?;
    assert_eq!(schedule.status, StatusCode::CREATED);

    let deleted = server.delete(&format!("/api/devices/{id}"), &token).await?;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let backups = server.get("/api/backups", &token).await?;
    assert_eq!(backups.body["total"], 0);
    let schedules = server.get("/api/schedules", &token).await?;
    assert_eq!(schedules.body.as_array().map(Vec::len), Some(0));
    Ok(())
}

#[tokio::test]
async fn device_type_longer_than_column_is_422() -> Result<()> {
    let server = TestServer::spawn().await?;
    let token = server.operator_token().await?;
    let long_type = "x".repeat(60);

    let created = server
        .post(
            "/api/devices",
            &token,
            json!({"name": "gw", "ip_address": "10.0.0.1", "api_key": "k", "device_type": long_type}),
        )
        .await?;
    assert_eq!(created.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(created.body["field_errors"]["device_type"].is_string());

    let id = server.create_device(&token, "gw").await?;
    let updated = server
        .put(&format!("/api/devices/{id}"), &token, json!({"device_type": long_type}))
        .await?;
    assert_eq!(updated.status, StatusCode::UNPROCESSABLE_ENTITY);
    Ok(())
}

#[tokio::test]
async fn non_numeric_device_id_is_a_json_error() -> Result<()> {
    let server = TestServer::spawn().await?;
    let token = server.operator_token().await?;

    for path in ["/api/devices/abc", "/api/devices/99999999999"] {
        let reply = server.get(path, &token).await?;
        assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY, "{path}");
        assert_eq!(reply.body["code"], "VALIDATION_ERROR", "{path}");
        assert!(reply.body["detail"].is_string(), "{path}");
    }
    Ok(())
}
