// src/cli/handlers/job.rs

use crate::{
    cli::handlers::commons,
    core::{
        config_loader::AppConfig,
        submission::{JobPatch, Transport},
    },
    system::outbox::OutboxTransport,
};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use colored::*;

#[derive(ValueEnum, Debug, Clone, Copy)]
enum JobAction {
    Pause,
    Resume,
}

#[derive(Parser, Debug)]
#[command(
    no_binary_name = true,
    about = "Pauses or resumes a scheduled job."
)]
struct JobArgs {
    #[arg(value_enum)]
    action: JobAction,
    /// Id of the job.
    id: String,
    #[arg(long)]
    outbox: Option<String>,
}

/// The handler for the `job` action.
pub fn handle(args: Vec<String>, config: &AppConfig) -> Result<()> {
    let args = JobArgs::try_parse_from(&args)?;
    let mut config = config.clone();
    if let Some(outbox) = args.outbox {
        config.outbox_dir = outbox;
    }

    let (patch, label) = match args.action {
        JobAction::Pause => (JobPatch::pause(), t!("job.label.paused")),
        JobAction::Resume => (JobPatch::resume(), t!("job.label.resumed")),
    };
    let outbox = OutboxTransport::new(config.outbox_path()?);
    commons::block_on(outbox.patch_job(&args.id, &patch))??;

    println!(
        "{} {}",
        t!("common.success").green().bold(),
        format!(t!("job.success.patched"), id = args.id.cyan(), action = label)
    );
    Ok(())
}
