//! Database of the source files taking part in one build.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use crate::host::SourceHost;
use crate::path::{canonical_key, normalize, PathCase};
use crate::source_file::SourceFile;

/// The source database, owning all loaded source text and resolving
/// paths + byte offsets to line/column coordinates for diagnostics.
///
/// Files are keyed by their canonical path under the configured [`PathCase`]
/// and iterate in insertion order.
#[derive(Debug, Default)]
pub struct SourceDb {
    case: PathCase,
    files: Vec<SourceFile>,
    index: BTreeMap<String, usize>,
}

impl SourceDb {
    /// Creates an empty source database.
    pub fn new(case: PathCase) -> Self {
        Self {
            case,
            files: Vec::new(),
            index: BTreeMap::new(),
        }
    }

    /// The path comparison mode used for lookups.
    pub fn path_case(&self) -> PathCase {
        self.case
    }

    /// Reads a source file through `host` and adds it to the database.
    pub fn load_file<H: SourceHost + ?Sized>(
        &mut self,
        host: &H,
        path: &Path,
    ) -> Result<&SourceFile, io::Error> {
        let content = host.read_file(path)?;
        Ok(self.add_source(path, content))
    }

    /// Adds (or replaces) a source file from an in-memory string.
    pub fn add_source(&mut self, path: &Path, content: String) -> &SourceFile {
        let path = normalize(path);
        let key = canonical_key(&path, self.case);
        let file = SourceFile::new(path, content);
        let idx = match self.index.get(&key) {
            Some(&idx) => {
                self.files[idx] = file;
                idx
            }
            None => {
                self.files.push(file);
                self.index.insert(key, self.files.len() - 1);
                self.files.len() - 1
            }
        };
        &self.files[idx]
    }

    /// Returns the [`SourceFile`] at `path`, if loaded.
    pub fn get(&self, path: &Path) -> Option<&SourceFile> {
        self.index
            .get(&canonical_key(path, self.case))
            .map(|&idx| &self.files[idx])
    }

    /// Iterates over all loaded files in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &SourceFile> {
        self.files.iter()
    }

    /// Returns the number of loaded files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns `true` if no files are loaded.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;
    use std::path::PathBuf;

    #[test]
    fn add_and_get() {
        let mut db = SourceDb::new(PathCase::Sensitive);
        db.add_source(Path::new("/p/a.ts"), "const a = 1;".to_string());
        assert_eq!(db.get(Path::new("/p/a.ts")).unwrap().content, "const a = 1;");
        assert!(db.get(Path::new("/p/A.ts")).is_none());
    }

    #[test]
    fn insensitive_lookup() {
        let mut db = SourceDb::new(PathCase::Insensitive);
        db.add_source(Path::new("/p/File.ts"), "x".to_string());
        assert!(db.get(Path::new("/P/file.TS")).is_some());
    }

    #[test]
    fn replace_keeps_order() {
        let mut db = SourceDb::new(PathCase::Sensitive);
        db.add_source(Path::new("/p/a.ts"), "one".to_string());
        db.add_source(Path::new("/p/b.ts"), "two".to_string());
        db.add_source(Path::new("/p/a.ts"), "three".to_string());
        let paths: Vec<PathBuf> = db.iter().map(|f| f.path.clone()).collect();
        assert_eq!(paths, vec![PathBuf::from("/p/a.ts"), PathBuf::from("/p/b.ts")]);
        assert_eq!(db.get(Path::new("/p/a.ts")).unwrap().content, "three");
        assert_eq!(db.len(), 2);
    }

    #[test]
    fn load_through_host() {
        let host = MemoryHost::with_files(PathCase::Sensitive, [("/p/a.ts", "let a = 1;")]);
        let mut db = SourceDb::new(PathCase::Sensitive);
        let file = db.load_file(&host, Path::new("/p/a.ts")).unwrap();
        assert_eq!(file.content, "let a = 1;");
        assert!(db.load_file(&host, Path::new("/p/missing.ts")).is_err());
    }
}
