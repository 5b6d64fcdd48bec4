// src/bin/cmdform.rs

use anyhow::{Result, anyhow};
use clap::{CommandFactory, Parser};
use cmdform::{
    cli::{Cli, handlers},
    core::config_loader::{self, AppConfig},
};
use colored::*;

// --- Command Definition and Registry ---

/// A CLI action, its aliases, and its handler.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    handler: fn(Vec<String>, &AppConfig) -> Result<()>,
}

/// Every action the binary understands.
static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "commands",
        aliases: &["ls"],
        handler: handlers::commands::handle,
    },
    CommandDefinition {
        name: "schema",
        aliases: &[],
        handler: handlers::schema::handle,
    },
    CommandDefinition {
        name: "model",
        aliases: &[],
        handler: handlers::model::handle,
    },
    CommandDefinition {
        name: "validate",
        aliases: &["check"],
        handler: handlers::validate::handle,
    },
    CommandDefinition {
        name: "fill",
        aliases: &["run"],
        handler: handlers::fill::handle,
    },
    CommandDefinition {
        name: "submit",
        aliases: &[],
        handler: handlers::submit::handle,
    },
    CommandDefinition {
        name: "replay",
        aliases: &["remake"],
        handler: handlers::replay::handle,
    },
    CommandDefinition {
        name: "job",
        aliases: &[],
        handler: handlers::job::handle,
    },
];

/// Finds a command definition in the registry by its name or alias.
fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

/// Sets up logging, dispatches to the handler and prints any error once.
fn main() {
    env_logger::init();

    if let Err(e) = run_cli(Cli::parse()) {
        eprintln!("\n{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run_cli(cli: Cli) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    let Some(action) = cli.action else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let command = find_command(&action)
        .ok_or_else(|| anyhow!(cmdform::t!("main.error.unknown_command"), name = action))?;
    let config = config_loader::load_config()?;
    (command.handler)(cli.args, &config)
}

