//! Emporium CLI - Database migrations, seed data and user management.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending migrations
//! emporium migrate
//!
//! # Load the demo catalog and accounts
//! emporium seed
//!
//! # Create a user
//! emporium user create -e ops@example.com -f Ada -l Lovelace -p 'S3cure!pass' -r admin
//!
//! # Change an existing user's role
//! emporium user promote -e ops@example.com -r super_admin
//! ```
//!
//! All commands read `DATABASE_URL` (a `.env` file is honored).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "emporium")]
#[command(author, version, about = "Emporium CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database with demo accounts, categories and products
    Seed,
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// First name
        #[arg(short, long)]
        first_name: String,

        /// Last name
        #[arg(short, long)]
        last_name: String,

        /// Password (must satisfy the account password policy)
        #[arg(short, long)]
        password: String,

        /// Role (`customer`, `admin`, `super_admin`)
        #[arg(short, long, default_value = "customer")]
        role: String,
    },
    /// Change the role of an existing user
    Promote {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// New role (`customer`, `admin`, `super_admin`)
        #[arg(short, long, default_value = "admin")]
        role: String,
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
        Commands::Seed => commands::seed::run().await?,
        Commands::User { action } => match action {
            UserAction::Create {
                email,
                first_name,
                last_name,
                password,
                role,
            } => {
                commands::user::create(&email, &first_name, &last_name, &password, &role).await?;
            }
            UserAction::Promote { email, role } => {
                commands::user::promote(&email, &role).await?;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_promote_defaults_to_admin() {
        let cli = Cli::try_parse_from(["emporium", "user", "promote", "-e", "a@b.co"]);
        match cli.map(|c| c.command) {
            Ok(Commands::User {
                action: UserAction::Promote { role, .. },
            }) => assert_eq!(role, "admin"),
            _ => panic!("expected user promote"),
        }
    }
}
