// src/system/permissions.rs

use crate::core::{config_loader::AppConfig, submission::PermissionOracle};
use std::collections::HashSet;

/// Grants a fixed set of actions on every system. `*` grants all actions.
#[derive(Debug, Clone, Default)]
pub struct StaticPermissions {
    allowed: HashSet<String>,
}

impl StaticPermissions {
    pub fn new<I, S>(actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: actions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.allowed_actions.iter().cloned())
    }
}

impl PermissionOracle for StaticPermissions {
    fn has_system_permission(&self, action: &str, namespace: &str, system_id: &str) -> bool {
        let granted = self.allowed.contains("*") || self.allowed.contains(action);
        if !granted {
            log::debug!("Denied '{action}' on {namespace}/{system_id}.");
        }
        granted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{JOB_CREATE_ACTION, REQUEST_CREATE_ACTION};

    #[test]
    fn test_listed_and_wildcard_actions() {
        let only_requests = StaticPermissions::new([REQUEST_CREATE_ACTION]);
        assert!(only_requests.has_system_permission(REQUEST_CREATE_ACTION, "ns", "id"));
        assert!(!only_requests.has_system_permission(JOB_CREATE_ACTION, "ns", "id"));

        let everything = StaticPermissions::new(["*"]);
        assert!(everything.has_system_permission(JOB_CREATE_ACTION, "ns", "id"));
        assert!(!StaticPermissions::default().has_system_permission("x", "ns", "id"));
    }

    #[test]
    fn test_default_config_allows_both_create_actions() {
        let oracle = StaticPermissions::from_config(&AppConfig::default());
        assert!(oracle.has_system_permission(REQUEST_CREATE_ACTION, "ns", "id"));
        assert!(oracle.has_system_permission(JOB_CREATE_ACTION, "ns", "id"));
    }
}
