//! Source file hashing and change detection.
//!
//! Computes versions and signatures for source files and compares them
//! against the previous build's file infos to identify which files are new,
//! modified, deleted, or unchanged.

use std::path::{Path, PathBuf};

use keel_common::ContentHash;
use keel_source::path::canonical_key;
use keel_source::SourceHost;

use crate::error::CacheError;
use crate::file_info::FileInfoStore;

/// Result of comparing current file versions against the previous build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Files that have no record from the previous build.
    pub new_files: Vec<PathBuf>,

    /// Files whose version differs from the previous build.
    pub modified_files: Vec<PathBuf>,

    /// Files recorded by the previous build but absent now.
    pub deleted_files: Vec<PathBuf>,

    /// Files whose version matches the previous build.
    pub unchanged_files: Vec<PathBuf>,
}

impl ChangeSet {
    /// Returns `true` if there are no changes (no new, modified, or deleted files).
    pub fn is_empty(&self) -> bool {
        self.new_files.is_empty() && self.modified_files.is_empty() && self.deleted_files.is_empty()
    }

    /// Returns the total number of files that need reprocessing (new + modified).
    pub fn dirty_count(&self) -> usize {
        self.new_files.len() + self.modified_files.len()
    }
}

/// Utility for computing versions and signatures and detecting changes.
pub struct SourceHasher;

impl SourceHasher {
    /// The version of a file: the hash of its raw text.
    pub fn version(text: &str) -> ContentHash {
        ContentHash::of_text(text)
    }

    /// The signature of a file: the hash of its declaration text.
    pub fn signature(declaration_text: &str) -> ContentHash {
        ContentHash::of_text(declaration_text)
    }

    /// Reads a file through `host` and returns its version.
    pub fn hash_file<H: SourceHost + ?Sized>(
        host: &H,
        path: &Path,
    ) -> Result<ContentHash, CacheError> {
        let content = host.read_file(path).map_err(|e| CacheError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self::version(&content))
    }

    /// Computes versions for multiple files.
    ///
    /// Files that cannot be read are skipped; they show up as deleted in the
    /// change set.
    pub fn hash_files<H: SourceHost + ?Sized>(
        host: &H,
        paths: &[PathBuf],
    ) -> Vec<(PathBuf, ContentHash)> {
        paths
            .iter()
            .filter_map(|path| {
                Self::hash_file(host, path)
                    .ok()
                    .map(|hash| (path.clone(), hash))
            })
            .collect()
    }

    /// Compares current versions against the previous build's file infos.
    ///
    /// Paths are matched under the store's case mode. Every list is sorted by
    /// canonical key.
    pub fn detect_changes(current: &[(PathBuf, ContentHash)], prior: &FileInfoStore) -> ChangeSet {
        let case = prior.path_case();
        let mut cs = ChangeSet::default();

        for (path, hash) in current {
            match prior.get(path) {
                Some(info) if info.version == *hash => cs.unchanged_files.push(path.clone()),
                Some(_) => cs.modified_files.push(path.clone()),
                None => cs.new_files.push(path.clone()),
            }
        }

        let seen: std::collections::BTreeSet<String> = current
            .iter()
            .map(|(path, _)| canonical_key(path, case))
            .collect();
        cs.deleted_files = prior
            .iter()
            .filter(|(path, _)| !seen.contains(&canonical_key(path, case)))
            .map(|(path, _)| path.to_path_buf())
            .collect();

        for list in [
            &mut cs.new_files,
            &mut cs.modified_files,
            &mut cs.deleted_files,
            &mut cs.unchanged_files,
        ] {
            list.sort_by_key(|p| canonical_key(p, case));
        }
        cs
    }
}
