// src/core/replay.rs

//! Locating the command a previously submitted request belongs to.

use crate::{
    core::{
        catalog::CommandPair,
        session::{FormSession, SessionContext},
    },
    models::{FormOptions, Mode, PriorRequest, System},
};
use thiserror::Error;

/// Why a prior request cannot be re-executed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplayError {
    #[error(
        "Cannot re-execute: '{command}' of {namespace}/{system} version {version} no longer exists."
    )]
    StaleData {
        namespace: String,
        system: String,
        version: String,
        command: String,
    },
    #[error("Cannot re-execute: {count} systems match {namespace}/{system} version {version}.")]
    Ambiguous {
        namespace: String,
        system: String,
        version: String,
        count: usize,
    },
}

/// Finds the unique system (by name, version and namespace) and the command of `prior`.
pub fn find_replay_target<'a>(
    systems: &'a [System],
    prior: &PriorRequest,
) -> Result<CommandPair<'a>, ReplayError> {
    let stale = || ReplayError::StaleData {
        namespace: prior.namespace.clone(),
        system: prior.system.clone(),
        version: prior.system_version.clone(),
        command: prior.command.clone(),
    };

    let candidates: Vec<&System> = systems
        .iter()
        .filter(|s| {
            s.name == prior.system
                && s.version == prior.system_version
                && s.namespace == prior.namespace
        })
        .collect();

    let system = match candidates.as_slice() {
        [] => return Err(stale()),
        [only] => *only,
        many => {
            return Err(ReplayError::Ambiguous {
                namespace: prior.namespace.clone(),
                system: prior.system.clone(),
                version: prior.system_version.clone(),
                count: many.len(),
            });
        }
    };

    system
        .commands
        .iter()
        .find(|c| c.name == prior.command)
        .map(|command| CommandPair { system, command })
        .ok_or_else(stale)
}

/// A session opened in replay mode for `prior`.
pub fn replay_session(
    systems: &[System],
    prior: &PriorRequest,
    options: &FormOptions,
) -> Result<FormSession, ReplayError> {
    let target = find_replay_target(systems, prior)?;
    let context = SessionContext::new(target.system, target.command, Mode::Immediate)
        .with_options(options.clone());
    let mut session = FormSession::new();
    session.replay(context, prior);
    Ok(session)
}
