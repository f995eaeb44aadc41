//! Incremental build state: file versions, signatures and the build snapshot.
//!
//! This crate owns the content-hash-based bookkeeping that lets a build skip
//! work. [`SourceHasher`] classifies files against the previous build,
//! [`FileInfoStore`] keeps the `{version, signature}` pair per file, and
//! [`BuildInfo`] is the persisted snapshot read at the start of a build and
//! rewritten at its end.

#![warn(missing_docs)]

pub mod error;
pub mod file_info;
pub mod hasher;
pub mod persist;
pub mod snapshot;

pub use error::CacheError;
pub use file_info::{FileInfo, FileInfoStore};
pub use hasher::{ChangeSet, SourceHasher};
pub use persist::{load_snapshot, read_snapshot, save_snapshot, temp_path};
pub use snapshot::{
    BuildInfo, BundleBuildInfo, BundleFileInfo, BundleSection, DiagnosticEntry, OptionValue,
    ProgramBuildInfo, ProgramBuilder, ResolvedProgram, SectionKind, SnapshotKind, SnapshotPaths,
    StoredDiagnostic, SNAPSHOT_VERSION,
};
