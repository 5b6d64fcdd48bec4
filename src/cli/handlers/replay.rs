// src/cli/handlers/replay.rs

use crate::{
    cli::handlers::commons,
    core::{config_loader::AppConfig, replay},
    models::PriorRequest,
};
use anyhow::Result;
use clap::Parser;
use colored::*;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    no_binary_name = true,
    about = "Rebuilds the form of a previous request, prefilled with its values."
)]
struct ReplayArgs {
    /// JSON file holding the previous request.
    request: PathBuf,
    #[arg(long, short = 's')]
    systems: PathBuf,
    /// Submit the rebuilt model right away instead of printing it.
    #[arg(long)]
    submit: bool,
}

/// The handler for the `replay` action.
pub fn handle(args: Vec<String>, config: &AppConfig) -> Result<()> {
    let args = ReplayArgs::try_parse_from(&args)?;
    let systems = commons::load_systems(&args.systems)?;
    let prior: PriorRequest = commons::load_json(&args.request)?;

    let mut session = replay::replay_session(&systems, &prior, &config.form_options())?;
    if let Some(route) = session.route() {
        eprintln!(
            "{}",
            format!(t!("replay.info.header"), route = route).dimmed()
        );
    }

    if !args.submit {
        return commons::print_json(session.model());
    }
    if !commons::print_validation(session.validate()) {
        anyhow::bail!(t!("submit.error.not_submitted"));
    }
    commons::submit_session(&mut session, config)
}
