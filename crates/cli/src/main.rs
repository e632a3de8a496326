//! Tire shop CLI - database migrations and operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending migrations
//! tireshop migrate
//!
//! # Create an admin account (password from --password or TIRESHOP_ADMIN_PASSWORD)
//! tireshop admin create -e admin@example.com -n "Shop Admin"
//!
//! # Give an existing customer account admin rights
//! tireshop admin promote -e owner@example.com
//!
//! # Load demo catalog data
//! tireshop seed crates/cli/seed/demo.yaml
//! ```
//!
//! All commands read `TIRESHOP_DATABASE_URL` (or `DATABASE_URL`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "tireshop")]
#[command(author, version, about = "Tire shop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Insert catalog data from a YAML file
    Seed {
        /// Path to the seed file
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin user
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin display name
        #[arg(short, long)]
        name: String,

        /// Initial password
        #[arg(short, long, env = "TIRESHOP_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Grant the admin role to an existing account
    Promote {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                password,
            } => {
                commands::admin::create_user(&email, &name, &password).await?;
            }
            AdminAction::Promote { email } => commands::admin::promote(&email).await?,
        },
        Commands::Seed { file } => commands::seed::catalog(&file).await?,
    }
    Ok(())
}
