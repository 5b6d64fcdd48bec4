// src/core/catalog.rs

//! Flattened `(system, command)` listing over a set of systems.

use crate::{
    core::session::RouteContext,
    models::{Command, System},
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Command '{0}' was not found.")]
    NotFound(RouteContext),
    #[error("{count} systems are registered as '{route}'; the command cannot be resolved.")]
    Ambiguous { route: RouteContext, count: usize },
}

/// A command together with the system exposing it.
#[derive(Debug, Clone, Copy)]
pub struct CommandPair<'a> {
    pub system: &'a System,
    pub command: &'a Command,
}

impl CommandPair<'_> {
    pub fn route(&self) -> RouteContext {
        RouteContext {
            namespace: self.system.namespace.clone(),
            system: self.system.name.clone(),
            version: self.system.version.clone(),
            command: self.command.name.clone(),
        }
    }
}

/// Narrows the listing. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct CatalogFilter {
    pub namespace: Option<String>,
    pub system: Option<String>,
    pub version: Option<String>,
    pub include_hidden: bool,
}

impl CatalogFilter {
    fn accepts_system(&self, system: &System) -> bool {
        let matches = |wanted: &Option<String>, actual: &str| {
            wanted.as_deref().is_none_or(|w| w == actual)
        };
        matches(&self.namespace, &system.namespace)
            && matches(&self.system, &system.name)
            && matches(&self.version, &system.version)
    }
}

/// Every command of every accepted system, in input order. Hidden commands
/// are left out unless the filter asks for them.
pub fn commands_from_systems<'a>(systems: &'a [System], filter: &CatalogFilter) -> Vec<CommandPair<'a>> {
    systems
        .iter()
        .filter(|system| filter.accepts_system(system))
        .flat_map(|system| {
            system
                .commands
                .iter()
                .filter(|command| filter.include_hidden || !command.hidden)
                .map(move |command| CommandPair { system, command })
        })
        .collect()
}

/// The command a route points at. Hidden commands can still be opened directly.
/// Several systems sharing namespace, name and version are rejected, as in replay.
pub fn find_command<'a>(
    systems: &'a [System],
    route: &RouteContext,
) -> Result<CommandPair<'a>, CatalogError> {
    let candidates: Vec<&System> = systems
        .iter()
        .filter(|s| {
            s.namespace == route.namespace && s.name == route.system && s.version == route.version
        })
        .collect();

    let system = match candidates.as_slice() {
        [] => return Err(CatalogError::NotFound(route.clone())),
        [only] => *only,
        many => {
            return Err(CatalogError::Ambiguous {
                route: route.clone(),
                count: many.len(),
            });
        }
    };

    system
        .commands
        .iter()
        .find(|c| c.name == route.command)
        .map(|command| CommandPair { system, command })
        .ok_or_else(|| CatalogError::NotFound(route.clone()))
}
