//! Per-file `{version, signature}` records.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use keel_common::ContentHash;
use keel_source::path::{canonical_key, normalize};
use keel_source::PathCase;
use serde::{Deserialize, Serialize};

/// Version and signature of one source file.
///
/// `version` hashes the raw source text. `signature` hashes the file's
/// declaration text, so it only moves when the externally visible interface
/// changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileInfo {
    /// Hash of the raw source text.
    pub version: ContentHash,
    /// Hash of the emitted declaration text.
    pub signature: ContentHash,
}

impl FileInfo {
    /// Creates a record from an explicit version and signature.
    pub fn new(version: ContentHash, signature: ContentHash) -> Self {
        Self { version, signature }
    }

    /// Creates the record of a declaration input, whose signature is its version.
    pub fn declaration(version: ContentHash) -> Self {
        Self {
            version,
            signature: version,
        }
    }
}

/// File infos keyed by canonical path.
///
/// Lookups fold case according to the store's [`PathCase`], which is fixed
/// for the lifetime of the store. Iteration is ordered by canonical key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileInfoStore {
    case: PathCase,
    entries: BTreeMap<String, (PathBuf, FileInfo)>,
}

impl FileInfoStore {
    /// Creates an empty store.
    pub fn new(case: PathCase) -> Self {
        Self {
            case,
            entries: BTreeMap::new(),
        }
    }

    /// The path comparison mode of this store.
    pub fn path_case(&self) -> PathCase {
        self.case
    }

    /// Returns the record for `path`, if present.
    pub fn get(&self, path: &Path) -> Option<FileInfo> {
        self.entries
            .get(&canonical_key(path, self.case))
            .map(|(_, info)| *info)
    }

    /// Inserts or replaces the record for `path`.
    pub fn set(&mut self, path: &Path, info: FileInfo) {
        let path = normalize(path);
        self.entries
            .insert(canonical_key(&path, self.case), (path, info));
    }

    /// Removes the record for `path`, returning it.
    pub fn remove(&mut self, path: &Path) -> Option<FileInfo> {
        self.entries
            .remove(&canonical_key(path, self.case))
            .map(|(_, info)| info)
    }

    /// Returns `true` if a record exists for `path`.
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(&canonical_key(path, self.case))
    }

    /// Iterates over `(path, info)` pairs ordered by canonical key.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, FileInfo)> {
        self.entries
            .values()
            .map(|(path, info)| (path.as_path(), *info))
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
