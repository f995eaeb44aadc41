//! `keel watch`, rebuild on change.
//!
//! A poller thread hashes the project's files every `--interval-ms` and
//! pushes a rebuild request whenever something changed. The main thread
//! drains the queue, so rebuilds never overlap and a burst of edits
//! collapses into one rebuild.

use std::path::Path;
use std::thread;
use std::time::Duration;

use keel_build::{
    serve, BuildError, BuildOutcome, ChangeDetector, Project, RebuildQueue, RebuildRequest,
    ScriptBackend, WatchSession,
};
use keel_config::CompilerOverrides;
use keel_source::{DiskHost, SourceHost};
use tracing::debug;

use crate::pipeline::{overrides, report_outcome, resolve_config_path};
use crate::{GlobalArgs, ReportFormat, WatchArgs};

/// Runs the `keel watch` command until the process is interrupted.
pub fn run(args: &WatchArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config_path = resolve_config_path(global)?;
    let host = DiskHost::default();
    let overrides = overrides(&args.overrides);
    let project = Project::load(&host, &config_path, &overrides)?;

    if !global.quiet {
        eprintln!(
            "   Watching {} v{}",
            project.config.project.name, project.config.project.version
        );
    }

    let backend = ScriptBackend::new();
    let queue = RebuildQueue::new();
    let interval = Duration::from_millis(args.interval_ms.max(10));
    let mut detector = ChangeDetector::new(&config_path, overrides.clone());
    let mut session =
        WatchSession::new(&host, &backend, &config_path, overrides.clone(), args.force);

    thread::scope(|s| {
        s.spawn(|| {
            while !queue.is_closed() {
                poll_once(&host, &mut detector, &queue);
                thread::sleep(interval);
            }
        });
        serve(&queue, &mut session, |request, result| {
            report_rebuild(
                &host,
                &config_path,
                &overrides,
                request,
                result,
                args.format,
                global,
            );
        });
    });

    Ok(0)
}

/// Polls once and enqueues a rebuild if anything changed.
fn poll_once<H: SourceHost + ?Sized>(
    host: &H,
    detector: &mut ChangeDetector,
    queue: &RebuildQueue,
) -> bool {
    let changed = detector.poll(host);
    if changed.is_empty() {
        return false;
    }
    debug!(count = changed.len(), "change detected");
    queue.request(RebuildRequest::new(changed));
    true
}

fn report_rebuild<H: SourceHost + ?Sized>(
    host: &H,
    config_path: &Path,
    overrides: &CompilerOverrides,
    request: &RebuildRequest,
    result: &Result<BuildOutcome, BuildError>,
    format: ReportFormat,
    global: &GlobalArgs,
) {
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("error: {e}");
            return;
        }
    };
    if !global.quiet && format != ReportFormat::Json {
        eprintln!("    Rebuilt after {} change(s)", request.changed.len());
    }
    // Line and column come from the current text.
    let project = match Project::load(host, config_path, overrides) {
        Ok(project) => project,
        Err(e) => {
            eprintln!("error: {e}");
            return;
        }
    };
    match project.load_program(host) {
        Ok(program) => {
            report_outcome(outcome, &project, &program, format, global);
        }
        Err(e) => eprintln!("error: {e}"),
    }
}
