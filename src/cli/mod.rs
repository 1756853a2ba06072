//! Command-line interface.
//!
//! The CLI is a thin shell over the library: it builds the module
//! resolver and operator registry once, hands every failure to a single
//! top-level catch, and prints one `Error:` line per failure.

pub mod operator_commands;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::config;
use crate::deployment;
use crate::deployment_config::DeploymentConfig;
use crate::error::{BentoctlError, BentoctlResult};
use crate::operator::{local, ModuleResolver, OperatorRegistry};

use self::operator_commands::OperatorCommands;

#[derive(Parser, Debug)]
#[command(
    name = "bentoctl",
    version,
    about = "Deploy bentos to any cloud platform through operators"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Deploy a bento using a deployment spec file
    Deploy {
        /// Path to the deployment spec file
        #[arg(short, long)]
        file: PathBuf,
        /// Show the deployment's properties after a successful deploy
        #[arg(long)]
        display_deployment_info: bool,
    },
    /// Show the current properties of a deployment
    Describe {
        /// Path to the deployment spec file
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Update an existing deployment from a deployment spec file
    Update {
        /// Path to the deployment spec file
        #[arg(short, long)]
        file: PathBuf,
        /// Show the deployment's properties after a successful update
        #[arg(long)]
        display_deployment_info: bool,
    },
    /// Delete a deployment
    Delete {
        /// Path to the deployment spec file
        #[arg(short, long)]
        file: PathBuf,
        /// Skip the confirmation prompt
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },
    /// Manage deployment operators
    #[command(subcommand)]
    Operator(OperatorCommands),
}

/// Parse arguments, run the requested command, and map the outcome to a
/// process exit code.
pub fn run() -> i32 {
    match try_run() {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn try_run() -> BentoctlResult<()> {
    let cli = Cli::parse();

    let resolver = Arc::new(ModuleResolver::new());
    local::register(&resolver)?;

    config::ensure_bentoctl_home()?;
    let root = config::operator_registry_root()?;
    let registry = OperatorRegistry::open(root, resolver)?;
    registry.install_builtin(local::LOCAL_OPERATOR_NAME)?;

    match cli.command {
        Commands::Deploy {
            file,
            display_deployment_info,
        } => {
            let config = DeploymentConfig::from_file(&file, &registry)?;
            deployment::deploy(&config)?;
            println!("Successful deployment '{}'!", config.deployment_name());
            if display_deployment_info {
                print_deployment_info(&config)?;
            }
            Ok(())
        }
        Commands::Describe { file } => {
            let config = DeploymentConfig::from_file(&file, &registry)?;
            print_deployment_info(&config)
        }
        Commands::Update {
            file,
            display_deployment_info,
        } => {
            let config = DeploymentConfig::from_file(&file, &registry)?;
            deployment::update(&config)?;
            println!("Successful update of '{}'!", config.deployment_name());
            if display_deployment_info {
                print_deployment_info(&config)?;
            }
            Ok(())
        }
        Commands::Delete { file, yes } => {
            let config = DeploymentConfig::from_file(&file, &registry)?;
            let prompt = format!(
                "Are you sure you want to delete deployment '{}'?",
                config.deployment_name()
            );
            if !yes && !operator_commands::confirm(&prompt)? {
                println!("Aborted.");
                return Ok(());
            }
            let name = deployment::delete(&config)?;
            println!("Deleted deployment '{}'!", name);
            Ok(())
        }
        Commands::Operator(command) => operator_commands::execute(command, &registry),
    }
}

fn print_deployment_info(config: &DeploymentConfig) -> BentoctlResult<()> {
    let info = deployment::describe(config)?;
    let rendered = serde_json::to_string_pretty(&info)
        .map_err(|e| BentoctlError::Serialization(e.to_string()))?;
    println!("{}", rendered);
    Ok(())
}
