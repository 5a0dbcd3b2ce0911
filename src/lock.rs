use std::fs;
use std::path::{Path, PathBuf};

use crate::error::BgError;
use crate::log_warn;

const LOCK_FILE_NAME: &str = "batch-golem.lock";
const PID_FILE_NAME: &str = "batch-golem.pid";

/// Holds the runtime-directory lock for the duration of a run. Dropping it
/// releases the lock and removes the PID file.
#[must_use = "lock is released when RunLock is dropped"]
pub struct RunLock {
    lock: fslock::LockFile,
    pid_path: PathBuf,
}

impl std::fmt::Debug for RunLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunLock")
            .field("pid_path", &self.pid_path)
            .finish()
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = self.lock.unlock() {
            log_warn!("Warning: Failed to release run lock: {}", e);
        }
        if let Err(e) = fs::remove_file(&self.pid_path) {
            log_warn!(
                "Warning: Failed to remove PID file {}: {}",
                self.pid_path.display(),
                e
            );
        }
    }
}

/// Take the single-run lock on `runtime_dir`, creating the directory if
/// needed.
///
/// Two runs driving the same persisted queue would race on its snapshot, so
/// the second one is refused. On contention the PID file names the holder.
pub fn try_acquire(runtime_dir: &Path) -> Result<RunLock, BgError> {
    fs::create_dir_all(runtime_dir).map_err(|e| BgError::write(runtime_dir, e))?;

    let lock_path = runtime_dir.join(LOCK_FILE_NAME);
    let pid_path = runtime_dir.join(PID_FILE_NAME);

    let mut lock = fslock::LockFile::open(&lock_path).map_err(|e| {
        BgError::Lock(format!(
            "Failed to open lock file {}: {}",
            lock_path.display(),
            e
        ))
    })?;

    let acquired = lock
        .try_lock()
        .map_err(|e| BgError::Lock(format!("Failed to acquire lock: {}", e)))?;

    if !acquired {
        let holder = fs::read_to_string(&pid_path)
            .ok()
            .and_then(|s| s.trim().parse::<i32>().ok());

        let message = match holder {
            Some(pid) if is_pid_alive(pid) => {
                format!("Another batch-golem run is active (PID {})", pid)
            }
            Some(pid) => format!(
                "Lock file is held but recorded PID {} is not alive. Remove {} and {} to recover",
                pid,
                lock_path.display(),
                pid_path.display()
            ),
            None => format!(
                "Another batch-golem run holds the lock. If this is stale, remove {}",
                lock_path.display()
            ),
        };
        return Err(BgError::Lock(message));
    }

    fs::write(&pid_path, std::process::id().to_string())
        .map_err(|e| BgError::write(&pid_path, e))?;

    Ok(RunLock { lock, pid_path })
}

fn is_pid_alive(pid: i32) -> bool {
    // signal 0 only probes for existence
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid), None).is_ok()
}
