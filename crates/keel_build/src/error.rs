//! Error types for build orchestration.

use std::path::PathBuf;

use keel_cache::CacheError;
use keel_common::InternalError;
use keel_config::ConfigError;

/// Errors that abort a build.
///
/// Problems in the user's sources are not errors: they are reported as
/// diagnostics and the build still completes.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The project configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The snapshot could not be written.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// A source file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// The file being read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// An output file could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        /// The file being written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A stale output could not be deleted.
    #[error("failed to remove {path}: {source}")]
    Remove {
        /// The file being removed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Two outputs of one build map to the same file.
    #[error("output {path} would be written twice in one build")]
    DuplicateWrite {
        /// The canonical output path.
        path: PathBuf,
    },

    /// An output would replace one of the build's inputs.
    #[error("output {path} would overwrite an input file")]
    OverwritesInput {
        /// The conflicting path.
        path: PathBuf,
    },

    /// No input files were found.
    #[error("no input files found under {root}")]
    NoInputs {
        /// The project root that was searched.
        root: PathBuf,
    },

    /// A broken invariant inside the build machinery.
    #[error(transparent)]
    Internal(#[from] InternalError),
}
