use clap::Parser;
use tracing_subscriber::EnvFilter;

use backup_manager::cli::{self, Cli};
use backup_manager::config;

#[tokio::main]
async fn main() {
    // Load .env if present so DATABASE_URL, SECRET_KEY, FERNET_KEY etc. are picked up
    let _ = dotenvy::dotenv();

    // RUST_LOG wins over DEBUG / LOG_LEVEL
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config::config().log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    if let Err(e) = cli::run(cli).await {
        match std::env::var("CLI_VERBOSE").as_deref() {
            Ok("true") | Ok("1") => eprintln!("Error: {e:?}"),
            _ => eprintln!("Error: {e}"),
        }
        std::process::exit(1);
    }
}
