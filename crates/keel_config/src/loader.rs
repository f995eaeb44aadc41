//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::{ModuleKind, ProjectConfig};
use std::path::Path;

/// File name of the project configuration.
pub const CONFIG_FILE: &str = "keel.toml";

/// Loads and validates a `keel.toml` configuration from a project directory.
///
/// Reads `<project_dir>/keel.toml`, parses it, and validates required fields.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    load_config_file(&project_dir.join(CONFIG_FILE))
}

/// Loads and validates a configuration from an explicit file path.
pub fn load_config_file(config_path: &Path) -> Result<ProjectConfig, ConfigError> {
    let content = std::fs::read_to_string(config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `keel.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and configuration values are consistent.
pub(crate) fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name".to_string()));
    }
    if config.files.include.is_empty() {
        return Err(ConfigError::MissingField("files.include".to_string()));
    }
    let compiler = &config.compiler;
    if let Some(out_file) = &compiler.out_file {
        if out_file.is_empty() {
            return Err(ConfigError::ValidationError(
                "compiler.out_file must not be empty".to_string(),
            ));
        }
        if compiler.module == ModuleKind::CommonJs {
            return Err(ConfigError::ValidationError(format!(
                "compiler.out_file requires module = \"none\" or \"amd\", found \"{}\"",
                compiler.module
            )));
        }
        if compiler.out_dir.is_some() {
            return Err(ConfigError::ValidationError(
                "compiler.out_file and compiler.out_dir cannot both be set".to_string(),
            ));
        }
    }
    for lib in &compiler.lib {
        if !lib.ends_with(".d.ts") {
            return Err(ConfigError::ValidationError(format!(
                "compiler.lib entry '{lib}' is not a declaration file"
            )));
        }
    }
    Ok(())
}
