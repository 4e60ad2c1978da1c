//! nsvault CLI
//!
//! Command-line administration for nsvault storage.
//!
//! # Commands
//!
//! - `accounts` - List, create, remove, enable and disable accounts
//! - `auth` - Check a username and password
//! - `credentials` - List, export and import credentials of a namespace
//! - `backend` - Show which backend serves a namespace

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use nsvault_core::{NamespaceRegistry, StorageConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// nsvault command-line tools.
#[derive(Parser)]
#[command(name = "nsvault")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Root directory of the file backend (overrides NSVAULT_DATA_DIR)
    #[arg(global = true, short, long)]
    data_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for listings.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum Format {
    /// Human-readable lines
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage accounts
    Accounts {
        #[command(subcommand)]
        command: AccountsCommand,
    },

    /// Check credentials (unknown users are signed up)
    Auth {
        /// Username
        username: String,
        /// Password
        password: String,
    },

    /// Manage stored credentials
    Credentials {
        #[command(subcommand)]
        command: CredentialsCommand,
    },

    /// Show the backend serving a namespace
    Backend {
        /// Namespace (default namespace if omitted)
        #[arg(short, long)]
        namespace: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t)]
        format: Format,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum AccountsCommand {
    /// List accounts
    List {
        /// Include password hashes and API keys
        #[arg(short, long)]
        sensitive: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t)]
        format: Format,
    },

    /// Create or overwrite an account
    Upsert {
        /// Username
        username: String,
        /// Password
        password: String,
        /// Flag the account as admin
        #[arg(long)]
        admin: bool,
        /// Create the account disabled
        #[arg(long)]
        disabled: bool,
    },

    /// Remove an account
    Remove {
        /// Username
        username: String,
    },

    /// Disable an account
    Disable {
        /// Username
        username: String,
    },

    /// Enable an account
    Enable {
        /// Username
        username: String,
    },

    /// Issue a new API key
    RefreshKey {
        /// Username
        username: String,
    },
}

#[derive(Subcommand)]
enum CredentialsCommand {
    /// List credential names
    List {
        /// Namespace (default namespace if omitted)
        #[arg(short, long)]
        namespace: Option<String>,
    },

    /// Write a credential to a JSON file
    Export {
        /// Credential name
        name: String,
        /// Output file (defaults to <name>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Namespace (default namespace if omitted)
        #[arg(short, long)]
        namespace: Option<String>,
    },

    /// Store a JSON file as a credential
    Import {
        /// Input file
        path: PathBuf,
        /// Credential name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
        /// Namespace (default namespace if omitted)
        #[arg(short, long)]
        namespace: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = StorageConfig::from_env();
    if let Some(dir) = cli.data_dir {
        config = config.data_dir(dir);
    }
    tracing::debug!(data_dir = %config.data_dir.display(), "storage configuration loaded");
    let registry = NamespaceRegistry::with_config(config);

    let result = run(&registry, cli.command).await;
    registry.close_all().await?;
    result
}

async fn run(
    registry: &NamespaceRegistry,
    command: Commands,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Accounts { command } => {
            let manager = commands::accounts::open(registry).await?;
            match command {
                AccountsCommand::List { sensitive, format } => {
                    commands::accounts::list(&manager, sensitive, format).await?;
                }
                AccountsCommand::Upsert {
                    username,
                    password,
                    admin,
                    disabled,
                } => {
                    commands::accounts::upsert(&manager, &username, &password, admin, disabled)
                        .await?;
                }
                AccountsCommand::Remove { username } => {
                    commands::accounts::remove(&manager, &username).await?;
                }
                AccountsCommand::Disable { username } => {
                    commands::accounts::set_disabled(&manager, &username, true).await?;
                }
                AccountsCommand::Enable { username } => {
                    commands::accounts::set_disabled(&manager, &username, false).await?;
                }
                AccountsCommand::RefreshKey { username } => {
                    commands::accounts::refresh_key(&manager, &username).await?;
                }
            }
        }
        Commands::Auth { username, password } => {
            let manager = commands::accounts::open(registry).await?;
            commands::accounts::authenticate(&manager, &username, &password).await?;
        }
        Commands::Credentials { command } => match command {
            CredentialsCommand::List { namespace } => {
                commands::credentials::list(registry, namespace.as_deref()).await?;
            }
            CredentialsCommand::Export {
                name,
                output,
                namespace,
            } => {
                commands::credentials::export(
                    registry,
                    namespace.as_deref(),
                    &name,
                    output.as_deref(),
                )
                .await?;
            }
            CredentialsCommand::Import {
                path,
                name,
                namespace,
            } => {
                commands::credentials::import(
                    registry,
                    namespace.as_deref(),
                    &path,
                    name.as_deref(),
                )
                .await?;
            }
        },
        Commands::Backend { namespace, format } => {
            commands::backend::run(registry, namespace.as_deref(), format).await?;
        }
        Commands::Version => {
            println!("nsvault CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
