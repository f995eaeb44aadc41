//! Keel CLI, the command-line front end of the incremental build engine.
//!
//! Provides `keel init` for project scaffolding, `keel build` for a one-shot
//! incremental build, `keel watch` for rebuilding on change, and `keel clean`
//! for removing outputs recorded in the build snapshot.

#![warn(missing_docs)]

mod build;
mod clean;
mod init;
mod pipeline;
mod watch;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use keel_config::ModuleKind;
use tracing::Level;

/// Keel, an incremental build and emit engine.
#[derive(Parser, Debug)]
#[command(name = "keel", version, about = "Keel incremental build engine")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a custom `keel.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new Keel project.
    Init {
        /// Project name (creates a subdirectory). If omitted, initializes in
        /// the current directory.
        name: Option<String>,
    },
    /// Build the current project, reusing the previous snapshot.
    Build(BuildArgs),
    /// Rebuild the current project whenever its files change.
    Watch(WatchArgs),
    /// Remove the outputs and snapshot of the last build.
    Clean,
}

/// Compiler settings that override `keel.toml`.
#[derive(Parser, Debug, Clone, Default)]
pub struct OverrideArgs {
    /// Module format of emitted JavaScript (`none`, `amd`, `commonjs`).
    #[arg(long)]
    pub module: Option<ModuleKind>,

    /// Concatenate all outputs into one file.
    #[arg(long)]
    pub out_file: Option<String>,

    /// Redirect outputs to this directory.
    #[arg(long)]
    pub out_dir: Option<String>,

    /// Emit `.d.ts` declaration files.
    #[arg(long)]
    pub declaration: bool,
}

/// Arguments for the `keel build` subcommand.
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Ignore the previous snapshot and rebuild everything.
    #[arg(short, long)]
    pub force: bool,

    /// Output format for diagnostics.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Compiler overrides.
    #[command(flatten)]
    pub overrides: OverrideArgs,
}

/// Arguments for the `keel watch` subcommand.
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Polling interval in milliseconds.
    #[arg(long, default_value_t = 250)]
    pub interval_ms: u64,

    /// Ignore the snapshot on disk for the first build.
    #[arg(short, long)]
    pub force: bool,

    /// Output format for diagnostics.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Compiler overrides.
    #[command(flatten)]
    pub overrides: OverrideArgs,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Diagnostic output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output with source excerpts.
    Text,
    /// One `path(line,col): error TScode: message` line per diagnostic.
    Compact,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

impl GlobalArgs {
    /// The most detailed log level the subscriber lets through.
    pub fn log_level(&self) -> Level {
        if self.verbose {
            Level::DEBUG
        } else if self.quiet {
            Level::ERROR
        } else {
            Level::INFO
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => {
            std::env::var_os("NO_COLOR").is_none() && std::env::var_os("TERM").is_some()
        }
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config,
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(global.log_level())
        .with_ansi(global.color)
        .with_target(false)
        .without_time()
        .init();

    let result = match cli.command {
        Command::Init { name } => init::run(name),
        Command::Build(ref args) => build::run(args, &global),
        Command::Watch(ref args) => watch::run(args, &global),
        Command::Clean => clean::run(&global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
