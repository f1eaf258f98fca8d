mod commands;
mod manifest;

use anyhow::Context;
use apimflow_cloud::{ApplyResult, StateManager};
use apimflow_cloud_azure::{
    ApiManagementServiceReconciler, ArmApiServicesClient, ArmConfig, service,
};
use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::Session;
use manifest::Manifest;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "apim")]
#[command(about = "Declarative Azure API Management services", long_about = None)]
struct Cli {
    /// Manifest path (defaults to apim.yaml discovery)
    #[arg(short, long, global = true, env = "APIM_MANIFEST_PATH")]
    file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the manifest without contacting Azure
    Validate,
    /// Create or update every declared service
    Apply,
    /// Re-read recorded services and drop the ones that are gone
    Refresh,
    /// Delete recorded services
    Destroy {
        /// Only destroy this manifest label
        label: Option<String>,
    },
    /// Adopt an existing service under a manifest label
    Import {
        /// Manifest label to record the service under
        label: String,
        /// Full ARM resource ID of the service
        id: String,
    },
    /// Show recorded services
    Show {
        /// Print the raw state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the resource schema
    Schema,
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries command output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match cli.command {
        Commands::Version => {
            println!("apimflow {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Commands::Schema => return commands::schema::handle(),
        _ => {}
    }

    let manifest_path = match cli.file {
        Some(path) => Some(path),
        None => apimflow_config::find_manifest_file().ok(),
    };
    let project_root = match &manifest_path {
        Some(path) => apimflow_config::project_root(path),
        None => std::env::current_dir()?,
    };
    tracing::debug!("Project root: {}", project_root.display());
    let manager = StateManager::new(&project_root);

    match cli.command {
        Commands::Validate => {
            let manifest = load_manifest(manifest_path.as_deref())?;
            commands::validate::handle(&manifest.api_management_services, service::decode)
        }
        Commands::Apply => {
            let manifest = load_manifest(manifest_path.as_deref())?;
            let errors =
                commands::validate::check(&manifest.api_management_services, service::decode);
            if !errors.is_empty() {
                for (label, error) in &errors {
                    eprintln!("  {} {}: {}", "✗".red(), label.cyan(), error);
                }
                anyhow::bail!("Manifest is invalid; nothing was applied");
            }

            let reconciler = reconciler()?;
            println!("{}", "Applying manifest...".blue());
            let mut session = Session::open_locked(manager).await?;
            let outcome =
                commands::apply::run(&reconciler, &manifest.api_management_services, &mut session)
                    .await;
            finish(session, outcome).await
        }
        Commands::Refresh => {
            let reconciler = reconciler()?;
            println!("{}", "Refreshing recorded services...".blue());
            let mut session = Session::open_locked(manager).await?;
            let outcome = commands::refresh::run(&reconciler, &mut session).await;
            finish(session, outcome).await
        }
        Commands::Destroy { label } => {
            let reconciler = reconciler()?;
            println!("{}", "Destroying recorded services...".yellow());
            let mut session = Session::open_locked(manager).await?;
            let outcome = commands::destroy::run(&reconciler, label.as_deref(), &mut session).await;
            finish(session, outcome).await
        }
        Commands::Import { label, id } => {
            let reconciler = reconciler()?;
            println!("{}", format!("Importing {}...", id).blue());
            let mut session = Session::open_locked(manager).await?;
            let outcome = commands::import::run(&reconciler, &label, &id, &mut session).await;
            finish(session, outcome).await
        }
        Commands::Show { json } => {
            let state = manager.load().await?;
            commands::show::handle(&state, json)
        }
        Commands::Version | Commands::Schema => Ok(()),
    }
}

fn load_manifest(path: Option<&Path>) -> anyhow::Result<Manifest> {
    let path = path.context("No manifest found; create apim.yaml or pass --file")?;
    Manifest::load(path)
}

fn reconciler() -> anyhow::Result<ApiManagementServiceReconciler<ArmApiServicesClient>> {
    let config = ArmConfig::from_env()?;
    let client = ArmApiServicesClient::new(config)?;
    Ok(ApiManagementServiceReconciler::new(client))
}

/// Save the record store, even when individual actions failed, then
/// release the lock and report
async fn finish(session: Session, outcome: anyhow::Result<ApplyResult>) -> anyhow::Result<()> {
    session.close().await?;
    commands::report(&outcome?)
}
