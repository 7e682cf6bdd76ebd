//! Rolegate CLI — permission catalog administration.
//!
//! ```bash
//! rolegate permissions --by-category
//! rolegate matrix
//! rolegate toggle 12 5
//! rolegate check --session session.json --permission crear_usuario
//! ```
//!
//! `--demo` runs every command against a built-in in-memory catalog.
//! See `rolegate --help` for all available commands and options.

mod commands;

use clap::{Parser, Subcommand};
use rolegate_core::config::RolegateConfig;
use rolegate_core::model::{PermissionId, RoleId};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rolegate", about = "Rolegate permission administration", version)]
struct Cli {
    /// Config file (missing file means defaults + RG_* environment)
    #[arg(long, global = true, default_value = rolegate_core::config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Use the built-in in-memory catalog instead of the HTTP backend
    #[arg(long, global = true)]
    demo: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the permission catalog
    Permissions {
        /// Group by category, in first-seen order
        #[arg(long)]
        by_category: bool,
    },
    /// List roles
    Roles,
    /// Show the role x permission matrix
    Matrix,
    /// Flip one role/permission assignment
    Toggle { role: RoleId, permission: PermissionId },
    /// Evaluate a gate policy against a session authority
    Check(commands::check::CheckArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = RolegateConfig::load_from(&cli.config)?;
    config.validate()?;
    rolegate_core::logging::init_logging(&config.logging)?;

    let backend = commands::backend(&config, cli.demo)?;

    match cli.command {
        Commands::Permissions { by_category } => {
            commands::catalog::permissions(backend, by_category).await
        }
        Commands::Roles => commands::catalog::roles(backend).await,
        Commands::Matrix => commands::matrix::show(backend, &config).await,
        Commands::Toggle { role, permission } => {
            commands::matrix::toggle(backend, &config, role, permission).await
        }
        Commands::Check(args) => {
            if !commands::check::run(backend, args).await? {
                std::process::exit(2);
            }
            Ok(())
        }
    }
}
