// src/cli/handlers/submit.rs

use crate::{cli::handlers::commons, core::config_loader::AppConfig, models::CommandModel};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    no_binary_name = true,
    about = "Validates a model file and submits it as requests or jobs."
)]
struct SubmitArgs {
    /// Command route: `namespace/system/version/command`.
    route: String,
    /// JSON file holding the model.
    model: PathBuf,
    #[arg(long, short = 's')]
    systems: PathBuf,
    #[arg(long)]
    job: bool,
    /// Overrides the configured outbox directory.
    #[arg(long)]
    outbox: Option<String>,
}

/// The handler for the `submit` action.
pub fn handle(args: Vec<String>, config: &AppConfig) -> Result<()> {
    let args = SubmitArgs::try_parse_from(&args)?;
    let systems = commons::load_systems(&args.systems)?;
    let model: CommandModel = commons::load_json(&args.model)?;

    let mut config = config.clone();
    if let Some(outbox) = args.outbox {
        config.outbox_dir = outbox;
    }

    let mut session = commons::open_session(&systems, &args.route, commons::mode_for(args.job), &config)?;
    commons::apply_model(&mut session, model)?;
    if !commons::print_validation(session.validate()) {
        anyhow::bail!(t!("submit.error.not_submitted"));
    }
    commons::submit_session(&mut session, &config)
}
