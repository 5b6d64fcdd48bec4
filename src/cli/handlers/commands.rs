// src/cli/handlers/commands.rs

use crate::{
    cli::handlers::commons,
    core::{
        catalog::{self, CatalogFilter},
        config_loader::AppConfig,
    },
};
use anyhow::Result;
use clap::Parser;
use colored::*;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    no_binary_name = true,
    about = "Lists the commands exposed by a set of systems."
)]
struct CommandsArgs {
    /// JSON file holding a system or a list of systems.
    #[arg(long, short = 's')]
    systems: PathBuf,
    #[arg(long)]
    namespace: Option<String>,
    #[arg(long)]
    system: Option<String>,
    #[arg(long)]
    version: Option<String>,
    /// Also list hidden commands.
    #[arg(long)]
    hidden: bool,
}

/// The handler for the `commands` action.
pub fn handle(args: Vec<String>, _config: &AppConfig) -> Result<()> {
    let args = CommandsArgs::try_parse_from(&args)?;
    let systems = commons::load_systems(&args.systems)?;
    let filter = CatalogFilter {
        namespace: args.namespace,
        system: args.system,
        version: args.version,
        include_hidden: args.hidden,
    };

    let pairs = catalog::commands_from_systems(&systems, &filter);
    if pairs.is_empty() {
        println!("{}", t!("commands.info.none").yellow());
        return Ok(());
    }

    println!(
        "\n{}",
        format!(t!("commands.info.header"), count = pairs.len()).bold()
    );
    for pair in pairs {
        let mut route = pair.route().to_string().cyan().to_string();
        if pair.command.hidden {
            route = format!("{route} {}", t!("commands.label.hidden").dimmed());
        }
        let description = pair.command.description.as_deref().unwrap_or_default();
        println!("  {:<45} {}", route, description.dimmed());
    }
    Ok(())
}
