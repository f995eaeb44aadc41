//! Watch mode: poll for changes, coalesce rebuild requests, rebuild serially.
//!
//! A [`ChangeDetector`] polls the project's files and pushes a
//! [`RebuildRequest`] into a [`RebuildQueue`] whenever something changed.
//! A single consumer drains the queue through a [`WatchSession`], which
//! carries the snapshot of the previous build in memory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex, MutexGuard};

use keel_cache::{load_snapshot, BuildInfo};
use keel_common::ContentHash;
use keel_config::CompilerOverrides;
use keel_source::path::canonical_key;
use keel_source::SourceHost;
use tracing::{debug, warn};

use crate::backend::CompilerBackend;
use crate::builder::{build, BuildOutcome};
use crate::error::BuildError;
use crate::project::Project;

/// A request to rebuild, listing the files that changed since the last one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildRequest {
    /// Changed, added or removed files.
    pub changed: Vec<PathBuf>,
    /// How many earlier requests this one absorbed.
    pub superseded: usize,
}

impl RebuildRequest {
    /// A request for the given changed files.
    pub fn new(changed: Vec<PathBuf>) -> Self {
        Self {
            changed,
            superseded: 0,
        }
    }
}

#[derive(Debug, Default)]
struct QueueState {
    pending: Option<RebuildRequest>,
    closed: bool,
}

/// A one-slot queue of rebuild requests.
///
/// A request arriving while another is still pending replaces it; the
/// changed-file lists are merged so nothing is lost. Consumers block in
/// [`next`](Self::next) until a request arrives or the queue is closed.
#[derive(Debug, Default)]
pub struct RebuildQueue {
    state: Mutex<QueueState>,
    ready: Condvar,
}

impl RebuildQueue {
    /// Creates an empty, open queue.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Enqueues `request`, superseding any pending one.
    ///
    /// Requests sent after [`close`](Self::close) are dropped.
    pub fn request(&self, request: RebuildRequest) {
        let mut state = self.lock();
        if state.closed {
            return;
        }
        let merged = match state.pending.take() {
            Some(stale) => {
                let mut changed = stale.changed;
                for path in request.changed {
                    if !changed.contains(&path) {
                        changed.push(path);
                    }
                }
                RebuildRequest {
                    changed,
                    superseded: stale.superseded + request.superseded + 1,
                }
            }
            None => request,
        };
        state.pending = Some(merged);
        self.ready.notify_one();
    }

    /// Blocks until a request is pending and takes it.
    ///
    /// Returns `None` once the queue is closed and drained.
    pub fn next(&self) -> Option<RebuildRequest> {
        let mut state = self.lock();
        loop {
            if let Some(request) = state.pending.take() {
                return Some(request);
            }
            if state.closed {
                return None;
            }
            state = self
                .ready
                .wait(state)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Takes the pending request without blocking.
    pub fn try_next(&self) -> Option<RebuildRequest> {
        self.lock().pending.take()
    }

    /// Closes the queue and wakes every waiting consumer.
    pub fn close(&self) {
        self.lock().closed = true;
        self.ready.notify_all();
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

/// Polls a project's configuration and inputs for content changes.
#[derive(Debug)]
pub struct ChangeDetector {
    config_path: PathBuf,
    overrides: CompilerOverrides,
    seen: BTreeMap<String, (PathBuf, ContentHash)>,
}

impl ChangeDetector {
    /// Creates a detector that has seen nothing yet.
    pub fn new(config_path: &Path, overrides: CompilerOverrides) -> Self {
        Self {
            config_path: config_path.to_path_buf(),
            overrides,
            seen: BTreeMap::new(),
        }
    }

    /// Returns the files added, removed or modified since the last poll.
    ///
    /// The first poll reports every file.
    pub fn poll<H: SourceHost + ?Sized>(&mut self, host: &H) -> Vec<PathBuf> {
        let mut watched = vec![self.config_path.clone()];
        let case = match Project::load(host, &self.config_path, &self.overrides) {
            Ok(project) => {
                watched.extend(project.input_files().map(Path::to_path_buf));
                project.case
            }
            Err(err) => {
                debug!("watching configuration only: {err}");
                host.path_case()
            }
        };

        let mut current = BTreeMap::new();
        for path in watched {
            // A file that vanished between listing and reading counts as removed.
            if let Ok(text) = host.read_file(&path) {
                current.insert(canonical_key(&path, case), (path, ContentHash::of_text(&text)));
            }
        }

        let mut changed = Vec::new();
        for (key, (path, version)) in &current {
            if self.seen.get(key).map(|(_, v)| v) != Some(version) {
                changed.push(path.clone());
            }
        }
        for (key, (path, _)) in &self.seen {
            if !current.contains_key(key) {
                changed.push(path.clone());
            }
        }
        self.seen = current;
        changed
    }
}

/// Runs rebuilds for watch mode, keeping the snapshot in memory.
pub struct WatchSession<'a, H: SourceHost + ?Sized> {
    host: &'a H,
    backend: &'a dyn CompilerBackend,
    config_path: PathBuf,
    overrides: CompilerOverrides,
    snapshot: Option<BuildInfo>,
    loaded: bool,
    builds: usize,
}

impl<'a, H: SourceHost + ?Sized> WatchSession<'a, H> {
    /// Creates a session; the first rebuild starts from the snapshot on disk
    /// unless `force` is set.
    pub fn new(
        host: &'a H,
        backend: &'a dyn CompilerBackend,
        config_path: &Path,
        overrides: CompilerOverrides,
        force: bool,
    ) -> Self {
        Self {
            host,
            backend,
            config_path: config_path.to_path_buf(),
            overrides,
            snapshot: None,
            loaded: force,
            builds: 0,
        }
    }

    /// The snapshot of the last successful build.
    pub fn snapshot(&self) -> Option<&BuildInfo> {
        self.snapshot.as_ref()
    }

    /// Number of successful builds so far.
    pub fn builds(&self) -> usize {
        self.builds
    }

    /// Reloads the project and rebuilds it against the in-memory snapshot.
    ///
    /// A failed build keeps the previous snapshot.
    pub fn rebuild(&mut self) -> Result<BuildOutcome, BuildError> {
        let project = Project::load(self.host, &self.config_path, &self.overrides)?;
        if !self.loaded {
            self.loaded = true;
            if project.config.compiler.incremental {
                self.snapshot = load_snapshot(self.host, &project.snapshot_path());
            }
        }
        let outcome = build(self.host, &project, self.backend, self.snapshot.as_ref())?;
        self.snapshot = Some(outcome.snapshot.clone());
        self.builds += 1;
        Ok(outcome)
    }
}

/// Drains `queue`, running one rebuild per request until the queue closes.
///
/// `report` sees every request with its result. Returns the number of
/// rebuilds run.
pub fn serve<H, F>(
    queue: &RebuildQueue,
    session: &mut WatchSession<'_, H>,
    mut report: F,
) -> usize
where
    H: SourceHost + ?Sized,
    F: FnMut(&RebuildRequest, &Result<BuildOutcome, BuildError>),
{
    let mut runs = 0;
    while let Some(request) = queue.next() {
        if request.superseded > 0 {
            debug!(superseded = request.superseded, "coalesced rebuild requests");
        }
        let result = session.rebuild();
        if let Err(err) = &result {
            warn!("rebuild failed: {err}");
        }
        report(&request, &result);
        runs += 1;
    }
    runs
}
