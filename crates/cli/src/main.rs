//! Animix CLI - database migrations and store management.
//!
//! # Usage
//!
//! ```bash
//! # Apply storefront migrations
//! animix-cli migrate
//!
//! # Load products from a YAML file
//! animix-cli seed products data/products.yaml
//!
//! # Give an existing account the admin role
//! animix-cli admin promote --email staff@animix.shop
//! ```
//!
//! Every command reads `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "animix-cli")]
#[command(author, version, about = "Animix CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Load data into the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Manage admin accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert products from a YAML file
    Products {
        /// Path to the YAML file
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Grant the admin role to an existing account
    Promote {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
    /// Revoke the admin role
    Demote {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Products { file } => {
                commands::seed::products(&file).await?;
            }
        },
        Commands::Admin { action } => match action {
            AdminAction::Promote { email } => {
                commands::admin::set_role(&email, animix_core::Role::Admin).await?;
            }
            AdminAction::Demote { email } => {
                commands::admin::set_role(&email, animix_core::Role::User).await?;
            }
        },
    }
    Ok(())
}
