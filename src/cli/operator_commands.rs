//! Operator management subcommands.

use std::path::PathBuf;

use clap::Subcommand;
use dialoguer::Confirm;

use crate::error::{BentoctlError, BentoctlResult};
use crate::operator::OperatorRegistry;

#[derive(Subcommand, Debug)]
pub enum OperatorCommands {
    /// List all available operators
    List,
    /// Add an operator from a local directory
    Add {
        /// Directory containing the operator
        path: PathBuf,
        /// Install under this name instead of the directory base name
        #[arg(long)]
        name: Option<String>,
    },
    /// Remove an installed operator
    Remove {
        /// Name of the operator to remove
        name: String,
        /// Skip the confirmation prompt
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },
    /// Replace an installed operator with new content
    Update {
        /// Name of the operator to update
        name: String,
        /// Directory containing the new operator content
        path: PathBuf,
    },
}

pub fn execute(command: OperatorCommands, registry: &OperatorRegistry) -> BentoctlResult<()> {
    match command {
        OperatorCommands::List => {
            for name in registry.list()? {
                println!("{}", name);
            }
            Ok(())
        }
        OperatorCommands::Add { path, name } => {
            let name = match name {
                Some(name) => name,
                None => path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.to_string())
                    .ok_or_else(|| {
                        BentoctlError::registry(format!(
                            "cannot derive an operator name from {}; pass --name",
                            path.display()
                        ))
                    })?,
            };
            registry.add(&name, &path)?;
            println!("Added operator '{}'!", name);
            Ok(())
        }
        OperatorCommands::Remove { name, yes } => {
            if !yes && !confirm(&format!("Remove operator '{}'?", name))? {
                println!("Aborted.");
                return Ok(());
            }
            registry.remove(&name)?;
            println!("Removed operator '{}'!", name);
            Ok(())
        }
        OperatorCommands::Update { name, path } => {
            registry.update(&name, &path)?;
            println!("Updated operator '{}'!", name);
            Ok(())
        }
    }
}

pub(crate) fn confirm(prompt: &str) -> BentoctlResult<bool> {
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| BentoctlError::config(format!("failed to read confirmation: {}", e)))
}
