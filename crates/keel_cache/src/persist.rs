//! Reading and committing snapshot files through a [`SourceHost`].

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use keel_source::SourceHost;
use tracing::{debug, warn};

use crate::error::CacheError;
use crate::snapshot::{BuildInfo, SNAPSHOT_VERSION};

/// Loads the snapshot at `path`, treating every failure as "no snapshot".
///
/// A missing file is expected on a first build and logged at `debug`; a
/// malformed file or a foreign version stamp is logged at `warn`. In every
/// case the caller falls back to a full rebuild.
pub fn load_snapshot<H: SourceHost + ?Sized>(host: &H, path: &Path) -> Option<BuildInfo> {
    match read_snapshot(host, path) {
        Ok(info) => Some(info),
        Err(CacheError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no prior snapshot");
            None
        }
        Err(err) => {
            warn!("ignoring snapshot: {err}");
            None
        }
    }
}

/// Reads and validates the snapshot at `path`.
pub fn read_snapshot<H: SourceHost + ?Sized>(
    host: &H,
    path: &Path,
) -> Result<BuildInfo, CacheError> {
    let content = host.read_file(path).map_err(|e| CacheError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    // Check the stamp before the payload so a snapshot from another toolchain
    // version reports a version mismatch rather than a schema error.
    let raw: serde_json::Value =
        serde_json::from_str(&content).map_err(|e| CacheError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    let stamp = raw.get("version").and_then(|v| v.as_str()).unwrap_or_default();
    if stamp != SNAPSHOT_VERSION {
        return Err(CacheError::VersionMismatch {
            path: path.to_path_buf(),
            expected: SNAPSHOT_VERSION.to_string(),
            actual: stamp.to_string(),
        });
    }

    serde_json::from_value(raw).map_err(|e| CacheError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Path of the staging file a snapshot is written to before the rename.
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes `info` to `path` atomically: the JSON goes to a sibling temp file
/// which is then renamed over the target.
pub fn save_snapshot<H: SourceHost + ?Sized>(
    host: &H,
    path: &Path,
    info: &BuildInfo,
) -> Result<(), CacheError> {
    let mut json = serde_json::to_string_pretty(info).map_err(|e| CacheError::Serialization {
        reason: e.to_string(),
    })?;
    json.push('\n');

    let tmp = temp_path(path);
    host.write_file(&tmp, &json).map_err(|e| CacheError::Io {
        path: tmp.clone(),
        source: e,
    })?;
    host.rename(&tmp, path).map_err(|e| CacheError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    debug!(path = %path.display(), bytes = json.len(), "snapshot committed");
    Ok(())
}
