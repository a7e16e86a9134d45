use anyhow::{bail, Context};

use crate::auth::hash_password;
use crate::cli::{utils, OutputFormat};
use crate::config::AppConfig;
use crate::database::models::{NewUser, User};
use crate::database::{DatabaseManager, PgStore, Store};

/// Initial admin account, read from ADMIN_USERNAME / ADMIN_EMAIL / ADMIN_PASSWORD.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl AdminSeed {
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let password = lookup("ADMIN_PASSWORD")
            .filter(|p| !p.is_empty())
            .context("ADMIN_PASSWORD must be set")?;
        if password.chars().count() < 8 {
            bail!("ADMIN_PASSWORD must be at least 8 characters");
        }

        Ok(Self {
            username: lookup("ADMIN_USERNAME").unwrap_or_else(|| "admin".to_string()),
            email: lookup("ADMIN_EMAIL").unwrap_or_else(|| "admin@localhost".to_string()),
            password,
        })
    }
}

#[derive(Debug)]
pub enum AdminOutcome {
    Created(User),
    AlreadyPresent(User),
}

/// Create the admin unless one already exists. A non-admin account holding
/// the requested username is an error.
pub async fn ensure_admin(
    store: &dyn Store,
    seed: AdminSeed,
    bcrypt_cost: u32,
) -> anyhow::Result<AdminOutcome> {
    if let Some(existing) = store.find_admin().await? {
        return Ok(AdminOutcome::AlreadyPresent(existing));
    }
    if store.get_user_by_username(&seed.username).await?.is_some() {
        bail!("username '{}' is already taken by a non-admin user", seed.username);
    }

    let user = store
        .create_user(NewUser {
            username: seed.username,
            email: seed.email,
            password_hash: hash_password(&seed.password, bcrypt_cost)?,
            is_admin: true,
        })
        .await?;
    Ok(AdminOutcome::Created(user))
}

pub async fn init_admin(config: &AppConfig, output_format: &OutputFormat) -> anyhow::Result<()> {
    let seed = AdminSeed::from_lookup(|key| std::env::var(key).ok())?;

    let pool = DatabaseManager::connect(&config.database).await?;
    DatabaseManager::init_schema(&pool).await?;
    let store = PgStore::new(pool);

    match ensure_admin(&store, seed, config.security.bcrypt_cost).await? {
        AdminOutcome::Created(user) => {
            tracing::info!("Created admin user '{}'", user.username);
            utils::output_success(
                output_format,
                &format!("Admin user '{}' created", user.username),
                Some(utils::field("username", user.username.clone())),
            )
        }
        AdminOutcome::AlreadyPresent(user) => utils::output_success(
            output_format,
            &format!("Admin user already exists ('{}'), nothing to do", user.username),
            Some(utils::field("username", user.username.clone())),
        ),
    }
}
