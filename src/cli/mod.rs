pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::config;

#[derive(Parser)]
#[command(name = "backup-manager")]
#[command(about = "Backup manager - API server and administration for device configuration backups")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP API server (default)")]
    Serve(commands::serve::ServeArgs),

    #[command(about = "Create the initial admin user from ADMIN_USERNAME, ADMIN_EMAIL and ADMIN_PASSWORD")]
    InitAdmin,

    #[command(about = "Print a new Fernet key for FERNET_KEY")]
    GenerateKey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let config = config::config().clone();

    match cli.command.unwrap_or(Commands::Serve(Default::default())) {
        Commands::Serve(args) => commands::serve::serve(config, args).await,
        Commands::InitAdmin => commands::admin::init_admin(&config, &output_format).await,
        Commands::GenerateKey => commands::key::generate_key(&output_format),
    }
}
