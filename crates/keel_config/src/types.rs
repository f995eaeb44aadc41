//! Configuration types deserialized from `keel.toml`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;

/// The top-level project configuration parsed from `keel.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// Core project metadata.
    pub project: ProjectMeta,
    /// Compiler options that shape emitted output.
    #[serde(default)]
    pub compiler: CompilerConfig,
    /// Which files make up the program.
    #[serde(default)]
    pub files: FilesConfig,
}

/// Core project metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
    /// The project version string.
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

/// The `[compiler]` section.
///
/// Every option except `incremental` and `build_info_file` influences emitted
/// output, so a change between two builds invalidates the whole snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CompilerConfig {
    /// Persist a build snapshot and reuse it on the next build.
    #[serde(default = "default_true")]
    pub incremental: bool,
    /// Module format of emitted JavaScript.
    #[serde(default)]
    pub module: ModuleKind,
    /// Concatenate all outputs into this single file (bundle mode).
    #[serde(default)]
    pub out_file: Option<String>,
    /// Directory emitted files are written under.
    #[serde(default)]
    pub out_dir: Option<String>,
    /// Also emit `.d.ts` declaration files.
    #[serde(default)]
    pub declaration: bool,
    /// Explicit location of the snapshot file.
    #[serde(default)]
    pub build_info_file: Option<String>,
    /// Override the host's file name case sensitivity.
    #[serde(default)]
    pub case_sensitive_paths: Option<bool>,
    /// Declaration files included in every build.
    #[serde(default)]
    pub lib: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            incremental: true,
            module: ModuleKind::default(),
            out_file: None,
            out_dir: None,
            declaration: false,
            build_info_file: None,
            case_sensitive_paths: None,
            lib: Vec::new(),
        }
    }
}

/// Module format of emitted JavaScript.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    /// Plain scripts; module syntax is emitted as CommonJS.
    #[default]
    None,
    /// `define([...], function (...) { ... })` wrappers.
    Amd,
    /// `require`/`exports` style.
    CommonJs,
}

impl ModuleKind {
    /// The lowercase name used in configuration files and snapshots.
    pub fn as_str(self) -> &'static str {
        match self {
            ModuleKind::None => "none",
            ModuleKind::Amd => "amd",
            ModuleKind::CommonJs => "commonjs",
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ModuleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(ModuleKind::None),
            "amd" => Ok(ModuleKind::Amd),
            "commonjs" => Ok(ModuleKind::CommonJs),
            other => Err(format!("unknown module kind '{other}'")),
        }
    }
}

/// The `[files]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    /// Files or directories (searched recursively) relative to the project root.
    ///
    /// Accepts either a single string or a list of strings.
    #[serde(
        default = "default_include",
        deserialize_with = "deserialize_string_or_vec"
    )]
    pub include: Vec<String>,
    /// File name suffixes treated as sources.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

fn default_include() -> Vec<String> {
    vec!["src".to_string()]
}

fn default_extensions() -> Vec<String> {
    vec![".ts".to_string()]
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            include: default_include(),
            extensions: default_extensions(),
        }
    }
}

/// Deserializes a field that can be either a single string or a list of strings.
fn deserialize_string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut vec = Vec::new();
            while let Some(val) = seq.next_element::<String>()? {
                vec.push(val);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(StringOrVec)
}
