//! The file-system seam the build engine reads sources and writes outputs through.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::path::{canonical_key, normalize, to_slash, PathCase};

/// Read/write access to source and output files.
///
/// The build engine never touches `std::fs` directly; it goes through a host so
/// that builds can run against the real disk ([`DiskHost`]) or an in-memory
/// tree ([`MemoryHost`]) with identical semantics.
pub trait SourceHost {
    /// Reads a UTF-8 text file.
    fn read_file(&self, path: &Path) -> io::Result<String>;

    /// Writes a text file, creating parent directories as needed.
    fn write_file(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Atomically replaces `to` with `from`.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Deletes a file.
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Returns `true` if a file exists at `path`.
    fn file_exists(&self, path: &Path) -> bool;

    /// Lists all files under `dir` recursively, sorted by path.
    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;

    /// The path comparison mode of this host.
    fn path_case(&self) -> PathCase;
}

/// A [`SourceHost`] backed by the real file system.
#[derive(Debug, Clone, Copy)]
pub struct DiskHost {
    case: PathCase,
}

impl DiskHost {
    /// Creates a disk host using the given path comparison mode.
    pub fn new(case: PathCase) -> Self {
        Self { case }
    }
}

impl Default for DiskHost {
    fn default() -> Self {
        Self::new(PathCase::native())
    }
}

impl SourceHost for DiskHost {
    fn read_file(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write_file(&self, path: &Path, content: &str) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        walk_dir(dir, &mut files)?;
        files.sort();
        Ok(files)
    }

    fn path_case(&self) -> PathCase {
        self.case
    }
}

/// Recursively walks a directory collecting regular files.
fn walk_dir(dir: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            walk_dir(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}

#[derive(Debug, Default)]
struct MemoryTree {
    /// Canonical key → (display path, content).
    files: BTreeMap<String, (PathBuf, String)>,
    /// Every path passed to `write_file`, in order.
    writes: Vec<PathBuf>,
}

/// An in-memory [`SourceHost`] used by tests and dry runs.
///
/// Records every write so callers can assert exactly which outputs a build
/// produced.
#[derive(Debug, Default)]
pub struct MemoryHost {
    case: PathCase,
    tree: Mutex<MemoryTree>,
}

impl MemoryHost {
    /// Creates an empty in-memory host.
    pub fn new(case: PathCase) -> Self {
        Self {
            case,
            tree: Mutex::new(MemoryTree::default()),
        }
    }

    /// Creates a host pre-populated with `(path, content)` pairs.
    pub fn with_files<P: AsRef<Path>, S: Into<String>>(
        case: PathCase,
        files: impl IntoIterator<Item = (P, S)>,
    ) -> Self {
        let host = Self::new(case);
        {
            let mut tree = host.lock();
            for (path, content) in files {
                let path = normalize(path.as_ref());
                tree.files
                    .insert(canonical_key(&path, case), (path, content.into()));
            }
        }
        host
    }

    /// Returns the paths written since the last [`take_writes`](Self::take_writes).
    pub fn take_writes(&self) -> Vec<PathBuf> {
        std::mem::take(&mut self.lock().writes)
    }

    /// Returns the current content of a file, if present.
    pub fn content(&self, path: &Path) -> Option<String> {
        self.lock()
            .files
            .get(&canonical_key(path, self.case))
            .map(|(_, c)| c.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryTree> {
        // A poisoned tree only means a test thread panicked mid-write; the map
        // itself is still consistent.
        self.tree.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn not_found(path: &Path) -> io::Error {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("no such file: {}", path.display()),
        )
    }
}

impl SourceHost for MemoryHost {
    fn read_file(&self, path: &Path) -> io::Result<String> {
        self.content(path).ok_or_else(|| Self::not_found(path))
    }

    fn write_file(&self, path: &Path, content: &str) -> io::Result<()> {
        let path = normalize(path);
        let mut tree = self.lock();
        tree.writes.push(path.clone());
        tree.files.insert(
            canonical_key(&path, self.case),
            (path, content.to_string()),
        );
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let to = normalize(to);
        let mut tree = self.lock();
        let (_, content) = tree
            .files
            .remove(&canonical_key(from, self.case))
            .ok_or_else(|| Self::not_found(from))?;
        tree.files
            .insert(canonical_key(&to, self.case), (to, content));
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        self.lock()
            .files
            .remove(&canonical_key(path, self.case))
            .map(|_| ())
            .ok_or_else(|| Self::not_found(path))
    }

    fn file_exists(&self, path: &Path) -> bool {
        self.lock()
            .files
            .contains_key(&canonical_key(path, self.case))
    }

    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let prefix = canonical_key(dir, self.case);
        let prefix = if prefix.ends_with('/') {
            prefix
        } else {
            format!("{prefix}/")
        };
        let mut files: Vec<PathBuf> = self
            .lock()
            .files
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix))
            .map(|(_, (path, _))| path.clone())
            .collect();
        files.sort_by_key(|p| to_slash(p));
        Ok(files)
    }

    fn path_case(&self) -> PathCase {
        self.case
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_read_write() {
        let host = MemoryHost::new(PathCase::Sensitive);
        host.write_file(Path::new("/p/a.js"), "var a;\n").unwrap();
        assert_eq!(host.read_file(Path::new("/p/a.js")).unwrap(), "var a;\n");
        assert!(host.file_exists(Path::new("/p/./a.js")));
        assert_eq!(host.take_writes(), vec![PathBuf::from("/p/a.js")]);
        assert!(host.take_writes().is_empty());
    }

    #[test]
    fn memory_missing_file_is_not_found() {
        let host = MemoryHost::new(PathCase::Sensitive);
        let err = host.read_file(Path::new("/nope.ts")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn memory_case_insensitive_lookup() {
        let host = MemoryHost::with_files(PathCase::Insensitive, [("/P/File.ts", "x")]);
        assert!(host.file_exists(Path::new("/p/file.ts")));
        let sensitive = MemoryHost::with_files(PathCase::Sensitive, [("/P/File.ts", "x")]);
        assert!(!sensitive.file_exists(Path::new("/p/file.ts")));
    }

    #[test]
    fn memory_rename_replaces_target() {
        let host = MemoryHost::with_files(
            PathCase::Sensitive,
            [("/p/tmp", "new"), ("/p/final", "old")],
        );
        host.rename(Path::new("/p/tmp"), Path::new("/p/final")).unwrap();
        assert!(!host.file_exists(Path::new("/p/tmp")));
        assert_eq!(host.content(Path::new("/p/final")).as_deref(), Some("new"));
    }

    #[test]
    fn memory_list_files_is_recursive_and_scoped() {
        let host = MemoryHost::with_files(
            PathCase::Sensitive,
            [
                ("/p/src/b.ts", ""),
                ("/p/src/nested/c.ts", ""),
                ("/p/src/a.ts", ""),
                ("/p/srcx/d.ts", ""),
            ],
        );
        let files = host.list_files(Path::new("/p/src")).unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("/p/src/a.ts"),
                PathBuf::from("/p/src/b.ts"),
                PathBuf::from("/p/src/nested/c.ts"),
            ]
        );
    }

    #[test]
    fn disk_host_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let host = DiskHost::new(PathCase::Sensitive);
        let path = dir.path().join("out").join("a.js");
        host.write_file(&path, "var a;\n").unwrap();
        assert!(host.file_exists(&path));
        assert_eq!(host.read_file(&path).unwrap(), "var a;\n");

        let renamed = dir.path().join("out").join("b.js");
        host.rename(&path, &renamed).unwrap();
        assert!(!host.file_exists(&path));

        let files = host.list_files(dir.path()).unwrap();
        assert_eq!(files, vec![renamed.clone()]);

        host.remove_file(&renamed).unwrap();
        assert!(!host.file_exists(&renamed));
    }
}
