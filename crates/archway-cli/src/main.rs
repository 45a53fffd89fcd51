use anyhow::{Context, Result};
use archway_application::build_service;
use archway_infrastructure::{ConfigService, init_logging};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "archway")]
#[command(about = "Archway - versioned workspace storage for architecture models", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Overrides the configured data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List workspaces
    List {
        /// Show archived workspaces instead of live ones
        #[arg(long)]
        archived: bool,
    },
    /// Create an empty workspace
    Create {
        /// Owner recorded on the new workspace
        #[arg(long)]
        owner: Option<String>,
    },
    /// Print workspace content
    Show {
        id: u64,
        #[arg(long, default_value = "")]
        branch: String,
        #[arg(long, default_value = "")]
        version: String,
    },
    /// Store workspace content read from a JSON file
    Put {
        id: u64,
        file: PathBuf,
        #[arg(long, default_value = "")]
        branch: String,
    },
    /// List stored versions, newest first
    Versions {
        id: u64,
        #[arg(long, default_value = "")]
        branch: String,
    },
    /// List branches
    Branches { id: u64 },
    /// Acquire the edit lock
    Lock { id: u64, user: String, agent: String },
    /// Release the edit lock
    Unlock { id: u64 },
    /// Archive or delete a workspace
    Delete { id: u64 },
    /// Drop versions beyond the configured maximum
    Prune,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_service = match cli.config {
        Some(path) => ConfigService::new(path),
        None => ConfigService::with_default_path()
            .context("Failed to resolve config file location")?,
    };
    let mut config = config_service
        .get_config()
        .with_context(|| format!("Failed to load {}", config_service.path().display()))?;
    if let Some(data_dir) = cli.data_dir {
        config.data_directory = Some(data_dir);
    }

    init_logging(&config.logging)?;
    let service = build_service(&config)?;

    let result = match cli.command {
        Commands::List { archived } => commands::workspace::list(&service, archived).await,
        Commands::Create { owner } => commands::workspace::create(&service, owner).await,
        Commands::Show {
            id,
            branch,
            version,
        } => commands::workspace::show(&service, id, &branch, &version).await,
        Commands::Put { id, file, branch } => {
            commands::workspace::put(&service, id, &file, &branch).await
        }
        Commands::Versions { id, branch } => {
            commands::workspace::versions(&service, id, &branch).await
        }
        Commands::Branches { id } => commands::workspace::branches(&service, id).await,
        Commands::Lock { id, user, agent } => {
            commands::workspace::lock(&service, id, &user, &agent).await
        }
        Commands::Unlock { id } => commands::workspace::unlock(&service, id).await,
        Commands::Delete { id } => commands::workspace::delete(&service, id).await,
        Commands::Prune => commands::workspace::prune(&service).await,
    };

    service.shutdown().await;
    result
}
