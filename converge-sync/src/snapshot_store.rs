//! Snapshot store — one persisted snapshot per workspace.
//!
//! `<home>/.converge/snapshots/<workspace_id>.json`, holding a
//! [`PersistedSnapshot`] envelope. Writes go to `<file>.json.tmp` first and
//! are renamed into place; a write whose bytes match the file on disk is
//! skipped.

use std::path::{Path, PathBuf};

use converge_core::{PersistedSnapshot, WorkspaceId};

use crate::error::{io_err, SyncError};

/// Outcome of a snapshot save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// File was written (content changed or did not previously exist).
    Written { path: PathBuf },
    /// File was skipped; serialised content matches what is on disk.
    Unchanged { path: PathBuf },
}

/// `<home>/.converge/snapshots/`
pub fn store_dir_at(home: &Path) -> PathBuf {
    home.join(".converge").join("snapshots")
}

/// `<home>/.converge/snapshots/<workspace_id>.json`
///
/// Ids that are empty, contain a path separator, or start with `.` are
/// rejected so the result always stays inside the store directory.
pub fn store_path_at(home: &Path, id: &WorkspaceId) -> Result<PathBuf, SyncError> {
    let raw = id.to_string();
    if raw.is_empty() || raw.starts_with('.') || raw.contains(&['/', '\\', '\0'][..]) {
        return Err(SyncError::InvalidWorkspaceId { id: raw });
    }
    Ok(store_dir_at(home).join(format!("{raw}.json")))
}

/// Load the snapshot for `id`; `None` if nothing is stored.
pub fn load_at(home: &Path, id: &WorkspaceId) -> Result<Option<PersistedSnapshot>, SyncError> {
    let path = store_path_at(home, id)?;
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    Ok(Some(serde_json::from_str(&contents)?))
}

/// Replace the stored snapshot for `id` wholesale.
pub fn save_at(
    home: &Path,
    id: &WorkspaceId,
    snapshot: &PersistedSnapshot,
) -> Result<WriteResult, SyncError> {
    let path = store_path_at(home, id)?;
    let json = serde_json::to_string_pretty(snapshot)?;

    if let Ok(existing) = std::fs::read_to_string(&path) {
        if existing == json {
            tracing::debug!("unchanged: {}", path.display());
            return Ok(WriteResult::Unchanged { path });
        }
    }

    let dir = store_dir_at(home);
    std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    set_file_permissions(&tmp)?;
    if let Err(e) = std::fs::rename(&tmp, &path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(&path, e));
    }

    tracing::info!("wrote snapshot v{}: {}", snapshot.version, path.display());
    Ok(WriteResult::Written { path })
}

/// Remove the stored snapshot. Returns whether a file was removed.
pub fn clear_at(home: &Path, id: &WorkspaceId) -> Result<bool, SyncError> {
    let path = store_path_at(home, id)?;
    match std::fs::remove_file(&path) {
        Ok(()) => {
            tracing::info!("cleared snapshot: {}", path.display());
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(io_err(&path, e)),
    }
}

/// Every stored snapshot, sorted by workspace id.
pub fn list_at(home: &Path) -> Result<Vec<(WorkspaceId, PersistedSnapshot)>, SyncError> {
    let dir = store_dir_at(home);
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in std::fs::read_dir(&dir).map_err(|e| io_err(&dir, e))? {
        let entry = entry.map_err(|e| io_err(&dir, e))?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let id = WorkspaceId::from(stem);
        if store_path_at(home, &id).is_err() {
            tracing::debug!("skipping {}", path.display());
            continue;
        }
        if let Some(snapshot) = load_at(home, &id)? {
            out.push((id, snapshot));
        }
    }
    out.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(out)
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), SyncError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), SyncError> {
    Ok(())
}
