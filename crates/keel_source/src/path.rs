//! Lexical path normalisation and case-aware comparison.
//!
//! Every path the engine stores or compares goes through these helpers so that
//! a single run consistently treats `File1.ts` and `file1.ts` as either the
//! same file or two different files, depending on [`PathCase`].

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// How file names are compared for identity.
///
/// Fixed for the duration of a run; snapshot keys, output de-duplication and
/// relative path computation all honour it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathCase {
    /// `a.ts` and `A.ts` are different files.
    #[default]
    Sensitive,
    /// `a.ts` and `A.ts` are the same file.
    Insensitive,
}

impl PathCase {
    /// The comparison mode of the platform's default file system.
    pub fn native() -> Self {
        if cfg!(any(windows, target_os = "macos")) {
            PathCase::Insensitive
        } else {
            PathCase::Sensitive
        }
    }

    /// Folds a path component for comparison under this mode.
    fn fold(self, s: &str) -> String {
        match self {
            PathCase::Sensitive => s.to_string(),
            PathCase::Insensitive => s.to_lowercase(),
        }
    }
}

/// Lexically normalises a path: removes `.` segments and resolves `..`
/// against preceding segments. Does not touch the file system.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                ) && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Renders a normalised path with `/` separators.
pub fn to_slash(path: &Path) -> String {
    let mut out = String::new();
    for component in normalize(path).components() {
        match component {
            Component::RootDir => out.push('/'),
            Component::Prefix(prefix) => out.push_str(&prefix.as_os_str().to_string_lossy()),
            other => {
                if !out.is_empty() && !out.ends_with('/') {
                    out.push('/');
                }
                out.push_str(&other.as_os_str().to_string_lossy());
            }
        }
    }
    out
}

/// Returns the identity key of `path` under the given comparison mode.
pub fn canonical_key(path: &Path, case: PathCase) -> String {
    case.fold(&to_slash(path))
}

/// Returns `true` if both paths name the same file under `case`.
pub fn same_path(a: &Path, b: &Path, case: PathCase) -> bool {
    canonical_key(a, case) == canonical_key(b, case)
}

fn segments(path: &Path) -> Vec<String> {
    to_slash(path)
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Computes the path of `to` relative to the directory containing `from_file`.
///
/// The result always uses `/` separators and starts with `./` or `../`, so
/// `relative_path_from_file("/p/out.buildinfo", "/p/src/a.ts")` is
/// `"./src/a.ts"` and a directory equal to the base yields `"./"`.
pub fn relative_path_from_file(from_file: &Path, to: &Path, case: PathCase) -> String {
    let from_dir = from_file.parent().unwrap_or_else(|| Path::new(""));
    relative_path_from_dir(from_dir, to, case)
}

/// Computes the path of `to` relative to the directory `from_dir`.
pub fn relative_path_from_dir(from_dir: &Path, to: &Path, case: PathCase) -> String {
    let from = segments(from_dir);
    let target = segments(to);

    let common = from
        .iter()
        .zip(&target)
        .take_while(|(a, b)| case.fold(a) == case.fold(b))
        .count();

    let mut parts: Vec<&str> = Vec::new();
    for _ in common..from.len() {
        parts.push("..");
    }
    for seg in &target[common..] {
        parts.push(seg);
    }

    if parts.is_empty() {
        return "./".to_string();
    }
    let joined = parts.join("/");
    if joined.starts_with("..") {
        joined
    } else {
        format!("./{joined}")
    }
}

/// Resolves a snapshot-relative path against `base_dir`.
pub fn resolve_relative(base_dir: &Path, relative: &str) -> PathBuf {
    normalize(&base_dir.join(relative))
}

/// Returns the deepest directory containing every path in `paths`.
///
/// Each input is treated as a file; an empty input yields an empty path.
pub fn common_directory<'a>(paths: impl IntoIterator<Item = &'a Path>, case: PathCase) -> PathBuf {
    let mut common: Option<Vec<String>> = None;
    let mut rooted = false;
    for path in paths {
        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        rooted |= dir.has_root();
        let segs = segments(dir);
        common = Some(match common {
            None => segs,
            Some(prev) => {
                let keep = prev
                    .iter()
                    .zip(&segs)
                    .take_while(|(a, b)| case.fold(a) == case.fold(b))
                    .count();
                prev[..keep].to_vec()
            }
        });
    }

    let mut out = if rooted {
        PathBuf::from("/")
    } else {
        PathBuf::new()
    };
    for seg in common.unwrap_or_default() {
        out.push(seg);
    }
    out
}

/// Replaces the extension of a source path, treating `.d.ts` as one extension.
pub fn with_extension(path: &Path, ext: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name
        .strip_suffix(".d.ts")
        .or_else(|| name.rsplit_once('.').map(|(stem, _)| stem))
        .unwrap_or(name.as_str());
    path.with_file_name(format!("{stem}{ext}"))
}
