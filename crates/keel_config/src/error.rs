//! Error types for configuration loading and validation.

/// Errors that can occur when loading or validating a `keel.toml` configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read keel.toml: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed into a project configuration.
    #[error("invalid keel.toml: {0}")]
    ParseError(String),

    /// A required field is missing or empty.
    #[error("keel.toml is missing required field `{0}`")]
    MissingField(String),

    /// Settings that parse but contradict each other.
    #[error("invalid configuration: {0}")]
    ValidationError(String),
}
