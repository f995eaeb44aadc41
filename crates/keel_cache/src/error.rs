//! Error types for snapshot operations.

use std::path::PathBuf;

/// Errors that can occur while reading or writing a build snapshot.
///
/// Reads are fail-safe: [`load_snapshot`](crate::load_snapshot) turns every
/// variant into "no prior snapshot". Writes propagate the error so a build
/// never reports success without having committed its snapshot.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing the snapshot file.
    #[error("snapshot I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The snapshot could not be parsed as valid JSON.
    #[error("failed to parse snapshot {path}: {reason}")]
    Parse {
        /// The snapshot file path.
        path: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// The snapshot was produced by a different toolchain version.
    #[error("version mismatch in {path}: expected {expected}, got {actual}")]
    VersionMismatch {
        /// The snapshot file path.
        path: PathBuf,
        /// The version stamp of the running toolchain.
        expected: String,
        /// The version stamp found in the file.
        actual: String,
    },

    /// A serialization error occurred.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}
