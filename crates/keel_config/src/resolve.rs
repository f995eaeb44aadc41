//! Command-line overrides merged on top of the `[compiler]` section.

use crate::error::ConfigError;
use crate::loader::validate_config;
use crate::types::{ModuleKind, ProjectConfig};

/// Compiler settings supplied on the command line.
///
/// Each `Some` field replaces the corresponding file setting; `None` leaves it
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilerOverrides {
    /// Replaces `compiler.module`.
    pub module: Option<ModuleKind>,
    /// Replaces `compiler.out_file`; also clears `out_dir`.
    pub out_file: Option<String>,
    /// Replaces `compiler.out_dir`; also clears `out_file`.
    pub out_dir: Option<String>,
    /// Replaces `compiler.declaration`.
    pub declaration: Option<bool>,
    /// Replaces `compiler.incremental`.
    pub incremental: Option<bool>,
}

impl CompilerOverrides {
    /// Returns `true` if no override is set.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Applies the overrides and re-validates the merged configuration.
    pub fn apply(&self, mut config: ProjectConfig) -> Result<ProjectConfig, ConfigError> {
        let compiler = &mut config.compiler;
        if let Some(module) = self.module {
            compiler.module = module;
        }
        if let Some(out_file) = &self.out_file {
            compiler.out_file = Some(out_file.clone());
            compiler.out_dir = None;
        }
        if let Some(out_dir) = &self.out_dir {
            compiler.out_dir = Some(out_dir.clone());
            compiler.out_file = None;
        }
        if let Some(declaration) = self.declaration {
            compiler.declaration = declaration;
        }
        if let Some(incremental) = self.incremental {
            compiler.incremental = incremental;
        }
        validate_config(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    fn base() -> ProjectConfig {
        load_config_from_str(
            r#"
[project]
name = "app"

[compiler]
out_dir = "dist"
"#,
        )
        .unwrap()
    }

    #[test]
    fn empty_overrides_leave_config_unchanged() {
        let overrides = CompilerOverrides::default();
        assert!(overrides.is_empty());
        let merged = overrides.apply(base()).unwrap();
        assert_eq!(merged.compiler, base().compiler);
    }

    #[test]
    fn out_file_replaces_out_dir() {
        let overrides = CompilerOverrides {
            module: Some(ModuleKind::Amd),
            out_file: Some("app.js".to_string()),
            ..Default::default()
        };
        let merged = overrides.apply(base()).unwrap();
        assert_eq!(merged.compiler.module, ModuleKind::Amd);
        assert_eq!(merged.compiler.out_file.as_deref(), Some("app.js"));
        assert!(merged.compiler.out_dir.is_none());
    }

    #[test]
    fn merged_config_is_revalidated() {
        let overrides = CompilerOverrides {
            module: Some(ModuleKind::CommonJs),
            out_file: Some("app.js".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            overrides.apply(base()).unwrap_err(),
            ConfigError::ValidationError(_)
        ));
    }

    #[test]
    fn flags_override_booleans() {
        let overrides = CompilerOverrides {
            declaration: Some(true),
            incremental: Some(false),
            ..Default::default()
        };
        let merged = overrides.apply(base()).unwrap();
        assert!(merged.compiler.declaration);
        assert!(!merged.compiler.incremental);
    }
}
