//! `keel init`, project scaffolding.
//!
//! Creates a `keel.toml` and a starter `src/main.ts`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use keel_config::CONFIG_FILE;

/// Runs the `keel init` command.
///
/// If `name` is `Some`, creates a new subdirectory with that name.
/// Otherwise initializes in the current working directory.
pub fn run(name: Option<String>) -> Result<i32, Box<dyn std::error::Error>> {
    let project_dir = match &name {
        Some(n) => PathBuf::from(n),
        None => std::env::current_dir()?,
    };
    scaffold(&project_dir, name.is_some())?;
    Ok(0)
}

/// Writes the project files under `project_dir`.
///
/// With `fresh` set the directory must not exist yet; otherwise an existing
/// `keel.toml` is an error.
fn scaffold(project_dir: &Path, fresh: bool) -> Result<(), Box<dyn std::error::Error>> {
    if fresh && project_dir.exists() {
        return Err(format!("directory '{}' already exists", project_dir.display()).into());
    }
    let config_path = project_dir.join(CONFIG_FILE);
    if config_path.exists() {
        return Err(format!("{} already exists", config_path.display()).into());
    }

    let project_name = project_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("my_project");

    eprintln!("  Creating new Keel project `{project_name}`");

    fs::create_dir_all(project_dir.join("src"))?;
    write_keel_toml(&config_path, project_name)?;
    let main_path = project_dir.join("src").join("main.ts");
    fs::write(&main_path, MAIN_TS)?;

    eprintln!("     Created {}", config_path.display());
    eprintln!("     Created {}", main_path.display());
    Ok(())
}

const MAIN_TS: &str = "const greeting: string = \"hello\";\n";

fn write_keel_toml(path: &Path, name: &str) -> io::Result<()> {
    let content = format!(
        r#"[project]
name = "{name}"
version = "0.1.0"

[compiler]
incremental = true
module = "none"
declaration = false
# out_file = "out.js"
# out_dir = "dist"

[files]
include = ["src"]
extensions = [".ts"]
"#
    );
    fs::write(path, content)
}
