// src/cli/handlers/commons.rs

// Shared plumbing for the handlers: input files, form sessions, dispatch.

use crate::{
    core::{
        catalog::{self, CatalogError, CommandPair},
        config_loader::AppConfig,
        session::{Completion, FormSession, RouteContext, SessionContext},
        validator::ValidationResult,
    },
    models::{CommandModel, Mode, System},
    system::{outbox::OutboxTransport, permissions::StaticPermissions},
};
use anyhow::{Context, Result, anyhow};
use colored::Colorize;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::{fs, future::Future, path::Path};

/// Reads and deserializes a JSON file.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!(t!("commons.error.read_file"), path = path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!(t!("commons.error.parse_file"), path = path.display()))
}

/// Systems file: either a list of systems or a single system object.
pub fn load_systems(path: &Path) -> Result<Vec<System>> {
    let raw: Value = load_json(path)?;
    let systems = match raw {
        Value::Array(_) => serde_json::from_value(raw),
        single => serde_json::from_value(single).map(|s: System| vec![s]),
    }
    .with_context(|| format!(t!("commons.error.parse_file"), path = path.display()))?;
    log::debug!("Loaded {} system(s) from '{}'.", systems.len(), path.display());
    Ok(systems)
}

pub fn parse_route(raw: &str) -> Result<RouteContext> {
    RouteContext::parse(raw).ok_or_else(|| anyhow!(t!("commons.error.route"), route = raw))
}

pub fn find_command<'a>(systems: &'a [System], route: &RouteContext) -> Result<CommandPair<'a>> {
    catalog::find_command(systems, route).map_err(|e| match e {
        CatalogError::NotFound(route) => anyhow!(t!("commons.error.command_not_found"), route = route),
        other => other.into(),
    })
}

/// Opens a session on the command at `route`.
pub fn open_session(systems: &[System], route: &str, mode: Mode, config: &AppConfig) -> Result<FormSession> {
    let route = parse_route(route)?;
    let pair = find_command(systems, &route)?;
    let context = SessionContext::new(pair.system, pair.command, mode).with_options(config.form_options());
    let mut session = FormSession::new();
    session.open(context);
    Ok(session)
}

/// Installs a model read from a file. Fields the file leaves out stay absent.
pub fn apply_model(session: &mut FormSession, model: CommandModel) -> Result<()> {
    session
        .replace_model(model)
        .context("The model file does not fit this form.")?;
    Ok(())
}

/// Runs a future to completion on a fresh runtime.
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Could not start the async runtime.")?;
    Ok(runtime.block_on(future))
}

/// Submits through the configured outbox and reports the outcome.
pub fn submit_session(session: &mut FormSession, config: &AppConfig) -> Result<()> {
    let outbox = OutboxTransport::new(config.outbox_path()?);
    let oracle = StaticPermissions::from_config(config);

    let completion = block_on(session.submit(&outbox, &oracle))??;
    match completion {
        Completion::Succeeded(_) => {
            let outcome = session
                .outcome()
                .ok_or_else(|| anyhow!("Submission finished without an outcome."))?;
            println!(
                "{} {}",
                t!("common.success").green().bold(),
                format!(t!("submit.success.created"), count = outcome.ids.len())
            );
            for id in &outcome.ids {
                println!("  {}", id.cyan());
            }
            if let Some(path) = outcome.redirect_path() {
                println!("{}", format!(t!("submit.info.redirect"), path = path).dimmed());
            }
            println!(
                "{}",
                format!(t!("submit.info.outbox"), path = outbox.root().display()).dimmed()
            );
            Ok(())
        }
        Completion::Failed(alert) => Err(anyhow!(t!("submit.error.failed"), message = alert.message)),
        Completion::Ignored => Err(anyhow!("The submission result was discarded.")),
    }
}

/// Prints each violation as `path: reason`. Returns whether the result was valid.
pub fn print_validation(result: &ValidationResult) -> bool {
    if result.is_valid() {
        println!("{}", t!("validate.success.valid").green());
        return true;
    }
    println!(
        "{}",
        format!(t!("validate.error.invalid"), count = result.violations().len()).yellow()
    );
    for violation in result.violations() {
        println!(
            "  {} {}",
            violation.path.to_string().cyan(),
            violation.reason.as_str().red()
        );
    }
    false
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn mode_for(job: bool) -> Mode {
    if job { Mode::Job } else { Mode::Immediate }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{field_path::FieldPath, validator::ReasonCode};
    use serde_json::json;

    fn systems() -> Vec<System> {
        serde_json::from_value(json!([{
            "name": "echo", "namespace": "default", "version": "1.0.0",
            "instances": [{"name": "default", "status": "RUNNING"}],
            "commands": [{
                "name": "say",
                "parameters": [
                    {"name": "message", "type": "String"},
                    {"name": "count", "type": "Integer"}
                ]
            }]
        }]))
        .unwrap()
    }

    #[test]
    fn test_model_file_missing_required_field_is_invalid() {
        let systems = systems();
        let mut session =
            open_session(&systems, "default/echo/1.0.0/say", Mode::Immediate, &AppConfig::default())
                .unwrap();
        let model: CommandModel = serde_json::from_value(json!({
            "instance_names": ["default"],
            "parameters": {"message": "hi"}
        }))
        .unwrap();
        apply_model(&mut session, model).unwrap();

        assert_eq!(session.model().parameters.get("count"), None);
        let result = session.validate();
        assert_eq!(
            result.reason_at(&FieldPath::parse("parameters.count").unwrap()),
            Some(ReasonCode::Required)
        );
    }
}
