mod common;

use anyhow::Result;
use reqwest::StatusCode;

#[tokio::test]
async fn health_reports_database_ok() -> Result<()> {
    let server = common::TestServer::spawn().await?;

    let res = reqwest::get(format!("{}/api/health", server.base_url)).await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    Ok(())
}

#[tokio::test]
async fn unknown_route_is_404() -> Result<()> {
    let server = common::TestServer::spawn().await?;

    let res = reqwest::get(format!("{}/api/nothing-here", server.base_url)).await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}
