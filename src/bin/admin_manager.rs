//! Operator tool for wiki admin accounts
//!
//! Reads the same environment (and `.env`) as the server.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use wiki_cms::{
    admin::{AdminManager, AdminStatus},
    db::{DatabaseManager, DatabaseOptions},
    ServerConfig,
};

/// Wiki admin account management
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Database URL (overrides DATABASE_URL)
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report the admin accounts that exist
    Check,
    /// Create (or promote) the configured admin if none exists
    Create,
    /// Check an admin's password
    Verify {
        username: String,
        /// Read from ADMIN_VERIFY_PASSWORD when omitted
        #[arg(long, env = "ADMIN_VERIFY_PASSWORD")]
        password: String,
    },
    /// Print a one-off recovery token
    RecoveryToken,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(if args.verbose {
            "wiki_cms=debug"
        } else {
            "wiki_cms=warn"
        })
        .init();

    let mut config =
        ServerConfig::from_env_without_secret().context("failed to load configuration")?;
    if let Some(url) = args.database_url {
        config.database.url = url;
    }

    let db = DatabaseManager::connect(
        &config.database.url,
        DatabaseOptions {
            max_connections: 1,
            ..DatabaseOptions::default()
        },
    )
    .await
    .with_context(|| format!("failed to open database {}", config.database.url))?;

    let admin = AdminManager::new(db, Arc::new(config));

    match args.command {
        Command::Check => {
            let report = admin.check().await?;
            if !report.is_healthy() {
                bail!("no admin accounts found; run `admin_manager create`");
            }
            println!("{} admin account(s):", report.admin_count);
            for name in report.admins {
                println!("  {}", name);
            }
        }
        Command::Create => match admin.ensure_admin_exists().await? {
            AdminStatus::Existing { admins } => {
                println!("Admin already exists: {}", admins.join(", "))
            }
            AdminStatus::Promoted { username } => println!("Promoted '{}' to admin", username),
            AdminStatus::Created {
                username,
                credentials_file: Some(path),
            } => println!(
                "Created admin '{}'; temporary password written to {}",
                username,
                path.display()
            ),
            AdminStatus::Created { username, .. } => println!("Created admin '{}'", username),
        },
        Command::Verify { username, password } => {
            if !admin.verify(&username, &password).await? {
                bail!("'{}' is not an admin or the password is wrong", username);
            }
            println!("OK: '{}' is an admin and the password matches", username);
        }
        Command::RecoveryToken => {
            println!("{}", admin.generate_recovery_token());
        }
    }

    Ok(())
}
