//! Source text management, path canonicalisation and the host file-system seam.
//!
//! This crate provides the [`SourceHost`] abstraction the build engine reads and
//! writes files through ([`DiskHost`] for real builds, [`MemoryHost`] for tests),
//! case-aware path helpers in [`path`], and the [`SourceDb`] used to resolve
//! byte offsets into line/column coordinates when diagnostics are reported.

#![warn(missing_docs)]

pub mod host;
pub mod path;
pub mod source_db;
pub mod source_file;

pub use host::{DiskHost, MemoryHost, SourceHost};
pub use path::PathCase;
pub use source_db::SourceDb;
pub use source_file::SourceFile;
