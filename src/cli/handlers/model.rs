// src/cli/handlers/model.rs

use crate::{cli::handlers::commons, core::config_loader::AppConfig};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    no_binary_name = true,
    about = "Prints the initial model of a command, ready to be edited and submitted."
)]
struct ModelArgs {
    /// Command route: `namespace/system/version/command`.
    route: String,
    #[arg(long, short = 's')]
    systems: PathBuf,
    #[arg(long)]
    job: bool,
}

/// The handler for the `model` action.
pub fn handle(args: Vec<String>, config: &AppConfig) -> Result<()> {
    let args = ModelArgs::try_parse_from(&args)?;
    let systems = commons::load_systems(&args.systems)?;
    let session = commons::open_session(&systems, &args.route, commons::mode_for(args.job), config)?;
    commons::print_json(session.model())
}
