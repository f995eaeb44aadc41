//! A resolved project: configuration, input files and output locations.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use keel_cache::{OptionValue, SnapshotPaths};
use keel_config::{load_config_from_str, CompilerOverrides, ConfigError, ProjectConfig};
use keel_source::path::{canonical_key, common_directory, normalize, with_extension};
use keel_source::{PathCase, SourceDb, SourceHost};
use tracing::debug;

use crate::backend::is_declaration_file;
use crate::emit::OutputLayout;
use crate::error::BuildError;

/// Extension of snapshot files.
pub const SNAPSHOT_EXTENSION: &str = ".buildinfo";

/// Everything a build needs to know about a project before reading sources.
#[derive(Debug, Clone)]
pub struct Project {
    /// Directory containing the configuration file.
    pub root: PathBuf,
    /// The configuration file.
    pub config_path: PathBuf,
    /// The parsed configuration, with command-line overrides applied.
    pub config: ProjectConfig,
    /// File name comparison mode for this run.
    pub case: PathCase,
    /// Library declaration files, in configuration order.
    pub lib_files: Vec<PathBuf>,
    /// Discovered source files, sorted by path.
    pub sources: Vec<PathBuf>,
}

impl Project {
    /// Reads the configuration at `config_path` through `host`, applies
    /// `overrides` and discovers the input files.
    pub fn load<H: SourceHost + ?Sized>(
        host: &H,
        config_path: &Path,
        overrides: &CompilerOverrides,
    ) -> Result<Self, BuildError> {
        let config_path = normalize(config_path);
        let text = host.read_file(&config_path).map_err(|e| BuildError::Read {
            path: config_path.clone(),
            source: e,
        })?;
        let config = overrides.apply(load_config_from_str(&text)?)?;
        Self::from_config(host, &config_path, config)
    }

    /// Resolves an already parsed configuration.
    pub fn from_config<H: SourceHost + ?Sized>(
        host: &H,
        config_path: &Path,
        config: ProjectConfig,
    ) -> Result<Self, BuildError> {
        let config_path = normalize(config_path);
        let root = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let case = match config.compiler.case_sensitive_paths {
            Some(true) => PathCase::Sensitive,
            Some(false) => PathCase::Insensitive,
            None => host.path_case(),
        };
        let lib_files = config
            .compiler
            .lib
            .iter()
            .map(|lib| normalize(&root.join(lib)))
            .collect();

        let mut project = Self {
            root,
            config_path,
            config,
            case,
            lib_files,
            sources: Vec::new(),
        };
        project.sources = project.discover_sources(host)?;
        debug!(
            root = %project.root.display(),
            sources = project.sources.len(),
            libs = project.lib_files.len(),
            "project resolved"
        );
        Ok(project)
    }

    /// Re-scans the include paths, picking up added and removed files.
    pub fn rescan<H: SourceHost + ?Sized>(&mut self, host: &H) -> Result<(), BuildError> {
        self.sources = self.discover_sources(host)?;
        Ok(())
    }

    fn discover_sources<H: SourceHost + ?Sized>(
        &self,
        host: &H,
    ) -> Result<Vec<PathBuf>, BuildError> {
        let out_dir = self.out_dir();
        let mut found: BTreeMap<String, PathBuf> = BTreeMap::new();
        for include in &self.config.files.include {
            let path = normalize(&self.root.join(include));
            if self.has_source_extension(&path) && host.file_exists(&path) {
                found.insert(canonical_key(&path, self.case), path);
                continue;
            }
            let listed = host.list_files(&path).map_err(|e| BuildError::Read {
                path: path.clone(),
                source: e,
            })?;
            for file in listed {
                let in_out_dir = out_dir
                    .as_ref()
                    .is_some_and(|dir| is_under(&file, dir, self.case));
                if self.has_source_extension(&file) && !in_out_dir {
                    found.insert(canonical_key(&file, self.case), normalize(&file));
                }
            }
        }

        // A declaration file beside a source of the same name is that
        // source's own output, not an input.
        let emitted: BTreeSet<String> = found
            .values()
            .filter(|p| !is_declaration_file(p))
            .map(|p| canonical_key(&with_extension(p, ".d.ts"), self.case))
            .collect();
        let libs: BTreeSet<String> = self
            .lib_files
            .iter()
            .map(|p| canonical_key(p, self.case))
            .collect();
        let sources: Vec<PathBuf> = found
            .into_iter()
            .filter(|(key, _)| !emitted.contains(key) && !libs.contains(key))
            .map(|(_, path)| path)
            .collect();

        if sources.is_empty() {
            return Err(BuildError::NoInputs {
                root: self.root.clone(),
            });
        }
        Ok(sources)
    }

    fn has_source_extension(&self, path: &Path) -> bool {
        let name = path.to_string_lossy();
        self.config
            .files
            .extensions
            .iter()
            .any(|ext| name.ends_with(ext.as_str()))
    }

    /// Library files followed by sources: the program's file order.
    pub fn input_files(&self) -> impl Iterator<Item = &Path> {
        self.lib_files
            .iter()
            .chain(&self.sources)
            .map(PathBuf::as_path)
    }

    /// Reads every input through `host` into a fresh source database.
    pub fn load_program<H: SourceHost + ?Sized>(&self, host: &H) -> Result<SourceDb, BuildError> {
        let mut program = SourceDb::new(self.case);
        for path in self.input_files() {
            program
                .load_file(host, path)
                .map_err(|e| BuildError::Read {
                    path: path.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(program)
    }

    /// The bundle output, in bundle mode.
    pub fn out_file(&self) -> Option<PathBuf> {
        self.config
            .compiler
            .out_file
            .as_ref()
            .map(|f| normalize(&self.root.join(f)))
    }

    /// The output directory, if outputs are relocated.
    pub fn out_dir(&self) -> Option<PathBuf> {
        self.config
            .compiler
            .out_dir
            .as_ref()
            .map(|d| normalize(&self.root.join(d)))
    }

    /// The deepest directory containing every non-declaration source.
    pub fn common_source_dir(&self) -> PathBuf {
        let dir = common_directory(
            self.sources
                .iter()
                .filter(|p| !is_declaration_file(p))
                .map(PathBuf::as_path),
            self.case,
        );
        if dir.as_os_str().is_empty() {
            self.root.clone()
        } else {
            dir
        }
    }

    /// How sources map to per-file outputs.
    pub fn output_layout(&self) -> OutputLayout {
        OutputLayout {
            out_dir: self.out_dir(),
            source_root: self.common_source_dir(),
            declaration: self.config.compiler.declaration,
            case: self.case,
        }
    }

    /// The outputs a build writes for `sources`, snapshot excluded.
    ///
    /// In bundle mode this is the bundle (and its declaration file)
    /// regardless of `sources`.
    pub fn outputs_of<'a>(&self, sources: impl IntoIterator<Item = &'a Path>) -> Vec<PathBuf> {
        if let Some(out_file) = self.out_file() {
            let dts = with_extension(&out_file, ".d.ts");
            let mut outputs = vec![out_file];
            if self.config.compiler.declaration {
                outputs.push(dts);
            }
            return outputs;
        }
        let layout = self.output_layout();
        let mut outputs = Vec::new();
        for source in sources.into_iter().filter(|p| !is_declaration_file(p)) {
            outputs.push(layout.js_path(source));
            outputs.extend(layout.dts_path(source));
        }
        outputs
    }

    /// Where the snapshot is stored.
    ///
    /// `build_info_file` wins; in bundle mode the snapshot sits beside the
    /// bundle (`out.js` → `out.buildinfo`); otherwise it is named after the
    /// configuration file and placed in `out_dir` or the project root.
    pub fn snapshot_path(&self) -> PathBuf {
        if let Some(explicit) = &self.config.compiler.build_info_file {
            return normalize(&self.root.join(explicit));
        }
        if let Some(out_file) = self.out_file() {
            return with_extension(&out_file, SNAPSHOT_EXTENSION);
        }
        let stem = self
            .config_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "keel".to_string());
        let dir = self.out_dir().unwrap_or_else(|| self.root.clone());
        dir.join(format!("{stem}{SNAPSHOT_EXTENSION}"))
    }

    /// Converter for paths stored in this project's snapshot.
    pub fn snapshot_paths(&self) -> SnapshotPaths {
        SnapshotPaths::new(&self.snapshot_path(), self.case)
    }

    /// The options recorded in the snapshot.
    ///
    /// Any difference from the previous build's options invalidates its
    /// snapshot, so only settings that shape outputs belong here.
    pub fn options(&self) -> BTreeMap<String, OptionValue> {
        let compiler = &self.config.compiler;
        let paths = self.snapshot_paths();
        let mut options = BTreeMap::new();
        options.insert("configFilePath".to_string(), paths.relative(&self.config_path).into());
        options.insert("declaration".to_string(), compiler.declaration.into());
        options.insert("incremental".to_string(), compiler.incremental.into());
        options.insert("module".to_string(), compiler.module.as_str().into());
        if let Some(out_file) = self.out_file() {
            options.insert("outFile".to_string(), paths.relative(&out_file).into());
        }
        if let Some(out_dir) = self.out_dir() {
            options.insert("outDir".to_string(), paths.relative_dir(&out_dir).into());
            // Outputs under out_dir mirror the tree below the common source
            // directory, so moving it moves every output.
            let root_dir = paths.relative_dir(&self.common_source_dir());
            options.insert("rootDir".to_string(), root_dir.into());
        }
        options
    }

    /// Validation errors that only show up once sources are known.
    pub fn check_inputs(&self) -> Result<(), ConfigError> {
        if let Some(out_file) = self.out_file() {
            let key = canonical_key(&out_file, self.case);
            if self.input_files().any(|p| canonical_key(p, self.case) == key) {
                return Err(ConfigError::ValidationError(format!(
                    "compiler.out_file '{}' is also an input file",
                    out_file.display()
                )));
            }
        }
        Ok(())
    }
}

fn is_under(file: &Path, dir: &Path, case: PathCase) -> bool {
    let dir = canonical_key(dir, case);
    let dir = dir.trim_end_matches('/');
    canonical_key(file, case)
        .strip_prefix(dir)
        .is_some_and(|rest| rest.starts_with('/'))
}
