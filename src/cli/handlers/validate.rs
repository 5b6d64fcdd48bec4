// src/cli/handlers/validate.rs

use crate::{cli::handlers::commons, core::config_loader::AppConfig, models::CommandModel};
use anyhow::{Result, bail};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    no_binary_name = true,
    about = "Checks a model file against the form of a command."
)]
struct ValidateArgs {
    /// Command route: `namespace/system/version/command`.
    route: String,
    /// JSON file holding the model.
    model: PathBuf,
    #[arg(long, short = 's')]
    systems: PathBuf,
    #[arg(long)]
    job: bool,
    /// Print the violations as JSON.
    #[arg(long)]
    json: bool,
}

/// The handler for the `validate` action. Fails when the model is invalid.
pub fn handle(args: Vec<String>, config: &AppConfig) -> Result<()> {
    let args = ValidateArgs::try_parse_from(&args)?;
    let systems = commons::load_systems(&args.systems)?;
    let model: CommandModel = commons::load_json(&args.model)?;

    let mut session = commons::open_session(&systems, &args.route, commons::mode_for(args.job), config)?;
    commons::apply_model(&mut session, model)?;
    let result = session.validate().clone();

    if args.json {
        commons::print_json(result.violations())?;
    } else {
        commons::print_validation(&result);
    }
    if !result.is_valid() {
        bail!(t!("validate.error.invalid"), count = result.violations().len());
    }
    Ok(())
}
