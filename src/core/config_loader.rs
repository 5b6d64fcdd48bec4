// src/core/config_loader.rs

//! Loading of `cmdform.toml`, the user-level settings of the CLI.

use crate::{
    constants::{DEFAULT_OUTBOX_DIR, JOB_CREATE_ACTION, REQUEST_CREATE_ACTION},
    core::paths::{self, PathError},
    models::{FormOptions, InstanceFilter, InstanceStatus},
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("Could not access config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Could not write default config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// User settings. Every key is optional in the file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Where the outbox transport writes payloads. `~` and `$VAR` are expanded.
    pub outbox_dir: String,
    /// Instance statuses that cannot receive requests.
    pub excluded_statuses: Vec<InstanceStatus>,
    /// Actions granted by the local permission oracle; `*` grants everything.
    pub allowed_actions: Vec<String>,
    pub preselect_single_instance: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        let filter = InstanceFilter::default();
        Self {
            outbox_dir: DEFAULT_OUTBOX_DIR.to_string(),
            excluded_statuses: filter.excluded,
            allowed_actions: vec![
                REQUEST_CREATE_ACTION.to_string(),
                JOB_CREATE_ACTION.to_string(),
            ],
            preselect_single_instance: true,
        }
    }
}

impl AppConfig {
    /// Builder options derived from these settings.
    pub fn form_options(&self) -> FormOptions {
        FormOptions {
            instance_filter: InstanceFilter {
                excluded: self.excluded_statuses.clone(),
            },
            preselect_single_instance: self.preselect_single_instance,
        }
    }

    /// The expanded outbox directory.
    pub fn outbox_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(paths::expand_path(&self.outbox_dir)?)
    }
}

/// Parses the contents of a config file.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Loads the user config, writing the defaults on first use.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let path = paths::get_config_file_path()?;
    load_config_from(&path)
}

/// Loads a config file, creating it with defaults when absent.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    let io_error = |source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    };

    if !path.exists() {
        log::debug!("No config at '{}'; writing defaults.", path.display());
        let config = AppConfig::default();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        fs::write(path, toml::to_string_pretty(&config)?).map_err(io_error)?;
        return Ok(config);
    }

    let content = fs::read_to_string(path).map_err(io_error)?;
    let config = parse_config(&content)?;
    log::debug!("Loaded config from '{}': {:?}", path.display(), config);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = parse_config(
            r#"
            excluded_statuses = ["DEAD"]
            preselect_single_instance = false
            "#,
        )
        .unwrap();
        assert_eq!(config.excluded_statuses, vec![InstanceStatus::Dead]);
        assert!(!config.preselect_single_instance);
        assert_eq!(config.outbox_dir, DEFAULT_OUTBOX_DIR);

        let options = config.form_options();
        assert!(!options.preselect_single_instance);
        assert_eq!(options.instance_filter.excluded, vec![InstanceStatus::Dead]);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        assert!(matches!(
            parse_config("excluded_statuses = 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_first_load_writes_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("cmdform.toml");
        let config = load_config_from(&path).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(path.exists());

        fs::write(&path, "outbox_dir = \"/tmp/cmdform-outbox\"\n").unwrap();
        let reloaded = load_config_from(&path).unwrap();
        assert_eq!(
            reloaded.outbox_path().unwrap(),
            PathBuf::from("/tmp/cmdform-outbox")
        );
    }
}
