#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

use backup_manager::auth::{hash_password, CryptoService};
use backup_manager::config::AppConfig;
use backup_manager::database::models::{NewUser, User};
use backup_manager::database::{MemoryStore, Store};
use backup_manager::{app, AppState};

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin-password";
pub const OPERATOR_USERNAME: &str = "operator";
pub const OPERATOR_PASSWORD: &str = "operator-password";

/// A server on an ephemeral port backed by its own in-memory store.
pub struct TestServer {
    pub base_url: String,
    pub state: AppState,
    pub backup_dir: PathBuf,
    client: reqwest::Client,
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: reqwest::header::HeaderMap,
    pub body: Value,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(&[]).await
    }

    /// Extra environment-style overrides on top of the test defaults.
    pub async fn spawn_with(overrides: &[(&str, &str)]) -> Result<Self> {
        let backup_dir = std::env::temp_dir().join(format!("backup-manager-test-{}", uuid_like()));
        tokio::fs::create_dir_all(&backup_dir).await?;

        let mut vars: HashMap<String, String> = HashMap::new();
        vars.insert("FERNET_KEY".into(), CryptoService::generate_key());
        vars.insert("SECRET_KEY".into(), "integration-test-secret".into());
        vars.insert("BCRYPT_COST".into(), "4".into());
        vars.insert("BACKUP_PATH".into(), backup_dir.to_string_lossy().into_owned());
        for (k, v) in overrides {
            vars.insert(k.to_string(), v.to_string());
        }
        let config = AppConfig::from_lookup(|key| vars.get(key).cloned());

        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let state = AppState::new(config, store)?;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let router = app(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        let server = Self {
            base_url: format!("http://{addr}"),
            state,
            backup_dir,
            client: reqwest::Client::new(),
        };
        server.seed_user(ADMIN_USERNAME, ADMIN_PASSWORD, true).await?;
        server.seed_user(OPERATOR_USERNAME, OPERATOR_PASSWORD, false).await?;
        Ok(server)
    }

    pub async fn seed_user(&self, username: &str, password: &str, is_admin: bool) -> Result<User> {
        let user = self
            .state
            .store
            .create_user(NewUser {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password_hash: hash_password(password, 4)?,
                is_admin,
            })
            .await?;
        Ok(user)
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<Reply> {
        let mut req = self.client.request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }

        let res = req.send().await.context("request failed")?;
        let status = res.status();
        let headers = res.headers().clone();
        let text = res.text().await?;
        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        Ok(Reply { status, headers, body })
    }

    pub async fn get(&self, path: &str, token: &str) -> Result<Reply> {
        self.request(Method::GET, path, Some(token), None).await
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> Result<Reply> {
        self.request(Method::POST, path, Some(token), Some(body)).await
    }

    pub async fn put(&self, path: &str, token: &str, body: Value) -> Result<Reply> {
        self.request(Method::PUT, path, Some(token), Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: &str) -> Result<Reply> {
        self.request(Method::DELETE, path, Some(token), None).await
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Reply> {
        self.request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"username": username, "password": password})),
        )
        .await
    }

    /// Access token for a seeded account.
    pub async fn token(&self, username: &str, password: &str) -> Result<String> {
        let reply = self.login(username, password).await?;
        anyhow::ensure!(reply.status == StatusCode::OK, "login failed: {:?}", reply.body);
        reply.body["access_token"]
            .as_str()
            .map(str::to_string)
            .context("no access_token in login response")
    }

    pub async fn admin_token(&self) -> Result<String> {
        self.token(ADMIN_USERNAME, ADMIN_PASSWORD).await
    }

    pub async fn operator_token(&self) -> Result<String> {
        self.token(OPERATOR_USERNAME, OPERATOR_PASSWORD).await
    }

    pub async fn create_device(&self, token: &str, name: &str) -> Result<i64> {
        let reply = self
            .post(
                "/api/devices",
                token,
                json!({
                    "name": name,
                    "ip_address": "192.168.1.1",
                    "api_key": "unifi-api-key",
                    "device_type": "udm-pro"
                }),
            )
            .await?;
        anyhow::ensure!(reply.status == StatusCode::CREATED, "create device: {:?}", reply.body);
        reply.body["id"].as_i64().context("device id")
    }
}

fn uuid_like() -> String {
    CryptoService::generate_key()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(16)
        .collect()
}
