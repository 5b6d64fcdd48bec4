// src/cli/handlers/fill.rs

use crate::{
    cli::handlers::commons,
    core::{config_loader::AppConfig, session::FormSession},
    models::{Choices, ParameterDescriptor, ParameterKind, TriggerKind},
};
use anyhow::{Result, anyhow};
use clap::Parser;
use colored::*;
use dialoguer::{Confirm, Input, MultiSelect, Select, theme::ColorfulTheme};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    no_binary_name = true,
    about = "Fills in the form of a command interactively and submits it."
)]
struct FillArgs {
    /// Command route: `namespace/system/version/command`.
    route: String,
    #[arg(long, short = 's')]
    systems: PathBuf,
    #[arg(long)]
    job: bool,
    /// Start from this model file instead of the defaults.
    #[arg(long)]
    model: Option<PathBuf>,
}

/// The handler for the `fill` action.
pub fn handle(args: Vec<String>, config: &AppConfig) -> Result<()> {
    let args = FillArgs::try_parse_from(&args)?;
    let systems = commons::load_systems(&args.systems)?;
    let mut session = commons::open_session(&systems, &args.route, commons::mode_for(args.job), config)?;
    if let Some(path) = &args.model {
        commons::apply_model(&mut session, commons::load_json(path)?)?;
    }

    let theme = ColorfulTheme::default();
    loop {
        prompt_instances(&mut session, &theme)?;
        prompt_parameters(&mut session, &theme)?;
        prompt_job(&mut session, &theme)?;
        prompt_comment(&mut session, &theme)?;

        if commons::print_validation(session.validate()) {
            break;
        }
        let retry = Confirm::with_theme(&theme)
            .with_prompt(t!("fill.prompt.retry"))
            .default(true)
            .interact()?;
        if !retry {
            println!("{}", t!("common.info.operation_cancelled").yellow());
            return Ok(());
        }
    }

    let confirmed = Confirm::with_theme(&theme)
        .with_prompt(t!("fill.prompt.submit"))
        .default(true)
        .interact()?;
    if !confirmed {
        commons::print_json(session.model())?;
        return Ok(());
    }
    commons::submit_session(&mut session, config)
}

fn prompt_instances(session: &mut FormSession, theme: &ColorfulTheme) -> Result<()> {
    let context = session.context().ok_or_else(|| anyhow!("No command is open."))?;
    let names: Vec<String> = context
        .options
        .instance_filter
        .selectable(&context.instances)
        .into_iter()
        .map(|i| i.name.clone())
        .collect();

    if names.is_empty() {
        println!("{}", t!("fill.warning.no_instances").yellow());
        return Ok(());
    }

    let checked: Vec<bool> = names
        .iter()
        .map(|n| session.model().instance_names.contains(n))
        .collect();
    let picked = MultiSelect::with_theme(theme)
        .with_prompt(t!("fill.prompt.instances"))
        .items(&names)
        .defaults(&checked)
        .interact()?;

    let selected = picked
        .into_iter()
        .filter_map(|index| names.get(index).cloned())
        .collect();
    session.set_instances(selected)?;
    Ok(())
}

fn prompt_parameters(session: &mut FormSession, theme: &ColorfulTheme) -> Result<()> {
    let parameters = session
        .context()
        .map(|c| c.command.parameters.clone())
        .unwrap_or_default();
    for descriptor in &parameters {
        prompt_parameter(session, descriptor, theme)?;
    }
    Ok(())
}

fn prompt_parameter(
    session: &mut FormSession,
    descriptor: &ParameterDescriptor,
    theme: &ColorfulTheme,
) -> Result<()> {
    let path = format!("parameters.{}", descriptor.name);
    let current = session
        .model()
        .parameters
        .get(&descriptor.name)
        .cloned()
        .unwrap_or(Value::Null);
    let mut label = descriptor.title().to_string();
    if descriptor.is_required() {
        label.push_str(" *");
    }
    if let Some(description) = &descriptor.description {
        println!("  {}", description.dimmed());
    }

    match (&descriptor.kind, &descriptor.choices) {
        (_, Some(Choices::Static { options, .. })) if !descriptor.multi && !options.is_empty() => {
            let labels: Vec<&str> = options.iter().map(|o| o.text.as_str()).collect();
            let default = options.iter().position(|o| o.value == current).unwrap_or(0);
            let index = Select::with_theme(theme)
                .with_prompt(&label)
                .items(&labels)
                .default(default)
                .interact()?;
            if let Some(option) = options.get(index) {
                session.set_value(&path, option.value.clone())?;
            }
        }
        (ParameterKind::Boolean, _) if !descriptor.multi => {
            let value = Confirm::with_theme(theme)
                .with_prompt(&label)
                .default(current.as_bool().unwrap_or(false))
                .interact()?;
            session.set_value(&path, Value::Bool(value))?;
        }
        _ => {
            let text: String = Input::with_theme(theme)
                .with_prompt(&label)
                .with_initial_text(as_text(&current))
                .allow_empty(true)
                .interact_text()?;
            session.set_text(&path, &text)?;
        }
    }
    Ok(())
}

fn prompt_job(session: &mut FormSession, theme: &ColorfulTheme) -> Result<()> {
    let Some(job) = session.model().job.clone() else {
        return Ok(());
    };

    let kinds: Vec<&str> = TriggerKind::ALL.iter().map(TriggerKind::as_str).collect();
    let current = TriggerKind::ALL
        .iter()
        .position(|k| *k == job.trigger.kind())
        .unwrap_or(0);
    let index = Select::with_theme(theme)
        .with_prompt(t!("fill.prompt.trigger_type"))
        .items(&kinds)
        .default(current)
        .interact()?;
    if let Some(kind) = TriggerKind::ALL.get(index) {
        session.set_trigger_kind(*kind)?;
    }

    let name: String = Input::with_theme(theme)
        .with_prompt(t!("fill.prompt.job_name"))
        .with_initial_text(job.name)
        .allow_empty(true)
        .interact_text()?;
    session.set_value("job.name", Value::String(name))?;

    // The trigger body is edited as one JSON object.
    let body = session
        .model()
        .job
        .as_ref()
        .map(|j| serde_json::to_value(&j.trigger))
        .transpose()?
        .and_then(|v| v.get("trigger").cloned())
        .unwrap_or(Value::Null);
    loop {
        let text: String = Input::with_theme(theme)
            .with_prompt(t!("fill.prompt.trigger"))
            .with_initial_text(body.to_string())
            .interact_text()?;
        let edited = serde_json::from_str::<Value>(&text)
            .map_err(anyhow::Error::from)
            .and_then(|v| Ok(session.set_value("job.trigger", v)?));
        match edited {
            Ok(()) => break,
            Err(e) => println!("{} {}", t!("fill.error.trigger").red(), e),
        }
    }

    let template = Confirm::with_theme(theme)
        .with_prompt(t!("fill.prompt.request_template"))
        .default(job.request_template)
        .interact()?;
    session.set_value("job.request_template", Value::Bool(template))?;
    Ok(())
}

fn prompt_comment(session: &mut FormSession, theme: &ColorfulTheme) -> Result<()> {
    let current = session.model().comment.clone().unwrap_or_default();
    let comment: String = Input::with_theme(theme)
        .with_prompt(t!("fill.prompt.comment"))
        .with_initial_text(current)
        .allow_empty(true)
        .interact_text()?;
    session.set_comment(comment)?;
    Ok(())
}

/// Text shown when editing a value in a single-line prompt.
fn as_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
