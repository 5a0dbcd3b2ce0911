use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tokio::sync::watch;

use crate::error::BgError;
use crate::{log_info, log_warn};
use crate::types::{ExecutionGroup, QueueState, QueueStatus};

/// Read a persisted snapshot. `Ok(None)` when no snapshot exists.
pub fn load(path: &Path) -> Result<Option<QueueState>, BgError> {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(BgError::read(path, e)),
    };

    let state = serde_json::from_str(&contents).map_err(|e| BgError::parse(path, e))?;
    Ok(Some(state))
}

/// Write a snapshot atomically: temp file in the same directory, fsync, then
/// rename over the target.
pub fn save(path: &Path, state: &QueueState) -> Result<(), BgError> {
    let parent = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(parent).map_err(|e| BgError::write(parent, e))?;

    let json = serde_json::to_string_pretty(state).map_err(|e| BgError::parse(path, e))?;

    let mut temp_file = NamedTempFile::new_in(parent).map_err(|e| BgError::write(parent, e))?;
    temp_file
        .write_all(json.as_bytes())
        .map_err(|e| BgError::write(temp_file.path(), e))?;
    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| BgError::write(temp_file.path(), e))?;

    temp_file
        .persist(path)
        .map_err(|e| BgError::write(path, e.error))?;

    Ok(())
}

/// Delete a persisted snapshot. A missing file is not an error.
pub fn remove(path: &Path) -> Result<(), BgError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BgError::write(path, e)),
    }
}

/// Whether a snapshot was taken over the same groups, so resuming it cannot
/// skip or repeat the wrong items.
pub fn matches_groups(state: &QueueState, groups: &[ExecutionGroup]) -> bool {
    state.groups == groups
}

/// Load the snapshot a run should continue from.
///
/// `Ok(None)` when there is nothing to continue: no snapshot, or one taken
/// over different groups (logged). A completed snapshot is refused so a
/// finished batch is never re-run implicitly.
pub fn restore(path: &Path, groups: &[ExecutionGroup]) -> Result<Option<QueueState>, BgError> {
    let state = match load(path)? {
        Some(s) => s,
        None => return Ok(None),
    };

    if !matches_groups(&state, groups) {
        log_warn!(
            "[pre] Persisted state at {} was taken over different groups; starting fresh",
            path.display()
        );
        return Ok(None);
    }

    if state.status == QueueStatus::Completed {
        return Err(BgError::BatchCompleted {
            path: path.to_path_buf(),
        });
    }

    log_info!(
        "[pre] Resuming {} batch at group {}/{} ({} item(s) already done)",
        state.status,
        (state.cursor + 1).min(state.groups.len()),
        state.groups.len(),
        state.completed_item_ids.len()
    );
    Ok(Some(state))
}

/// Persist every snapshot published on `states` until the sender goes away.
///
/// Intermediate snapshots may be coalesced; the latest one always lands.
/// Write failures are logged and do not stop the loop.
pub async fn persist_changes(mut states: watch::Receiver<QueueState>, path: std::path::PathBuf) {
    while states.changed().await.is_ok() {
        let state = states.borrow_and_update().clone();
        if let Err(e) = save(&path, &state) {
            log_warn!("Failed to persist queue state: {}", e);
        }
    }
}
