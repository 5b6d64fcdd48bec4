// src/cli/handlers/schema.rs

use crate::{cli::handlers::commons, core::config_loader::AppConfig};
use anyhow::{Result, anyhow};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    no_binary_name = true,
    about = "Prints the form schema of a command."
)]
struct SchemaArgs {
    /// Command route: `namespace/system/version/command`.
    route: String,
    #[arg(long, short = 's')]
    systems: PathBuf,
    /// Build the scheduling form instead of the immediate one.
    #[arg(long)]
    job: bool,
    /// Render as JSON Schema (draft-07) instead of the widget tree.
    #[arg(long)]
    json_schema: bool,
}

/// The handler for the `schema` action.
pub fn handle(args: Vec<String>, config: &AppConfig) -> Result<()> {
    let args = SchemaArgs::try_parse_from(&args)?;
    let systems = commons::load_systems(&args.systems)?;
    let session = commons::open_session(&systems, &args.route, commons::mode_for(args.job), config)?;
    let schema = session
        .schema()
        .ok_or_else(|| anyhow!("No schema was built for '{}'.", args.route))?;

    if args.json_schema {
        commons::print_json(&schema.to_json_schema())
    } else {
        commons::print_json(schema)
    }
}
