// ABOUTME: Deploy lock that keeps two deployments from running in the same base directory.
// ABOUTME: Uses atomic file creation with holder info stored as JSON.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DeployError;

pub const LOCK_FILENAME: &str = ".dropship.lock";

/// Information about who holds a deploy lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Hostname of the machine that holds the lock.
    pub holder: String,
    pub pid: u32,
    pub started_at: DateTime<Utc>,
    /// Release being deployed.
    pub release: String,
}

impl LockInfo {
    pub fn new(release: &str) -> Self {
        Self {
            holder: gethostname::gethostname().to_string_lossy().into_owned(),
            pid: std::process::id(),
            started_at: Utc::now(),
            release: release.to_string(),
        }
    }

    /// Locks older than an hour are considered abandoned.
    pub fn is_stale(&self) -> bool {
        let age = Utc::now() - self.started_at;
        age.num_hours() >= 1
    }
}

/// A held deploy lock that releases on drop.
#[derive(Debug)]
pub struct DeployLock {
    path: PathBuf,
}

impl DeployLock {
    /// Acquire the lock in `dir`.
    ///
    /// Fails if another live deployment holds it. Stale, corrupted, or (with
    /// `force`) any existing lock is broken with a warning.
    pub fn acquire(dir: &Path, release: &str, force: bool) -> Result<Self, DeployError> {
        let path = dir.join(LOCK_FILENAME);
        let info = serde_json::to_vec(&LockInfo::new(release))
            .map_err(|e| DeployError::Lock(format!("failed to serialize lock: {e}")))?;

        if Self::try_create(&path, &info)? {
            return Ok(Self { path });
        }

        if !Self::should_break(&path, force)? {
            return match Self::read(&path) {
                Some(existing) => Err(DeployError::LockHeld {
                    holder: existing.holder,
                    pid: existing.pid,
                    started_at: existing.started_at,
                }),
                None => Err(DeployError::Lock("lock held by another process".to_string())),
            };
        }

        tracing::debug!(path = %path.display(), "removing stale or forced lock");
        let _ = std::fs::remove_file(&path);

        if Self::try_create(&path, &info)? {
            Ok(Self { path })
        } else {
            Err(DeployError::Lock(
                "lock acquired by another process during break".to_string(),
            ))
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Publish `info` at `path` unless a lock already exists there.
    ///
    /// The JSON is written to a staging file first and hard-linked into place,
    /// so the lock never exists without its holder info.
    fn try_create(path: &Path, info: &[u8]) -> Result<bool, DeployError> {
        let staging = Self::staging_path(path);
        std::fs::write(&staging, info).map_err(|e| {
            DeployError::Lock(format!("failed to write {}: {e}", staging.display()))
        })?;

        let linked = std::fs::hard_link(&staging, path);
        if let Err(e) = std::fs::remove_file(&staging) {
            tracing::debug!(path = %staging.display(), error = %e, "failed to remove staging lock");
        }

        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(DeployError::Lock(format!(
                "failed to create {}: {e}",
                path.display()
            ))),
        }
    }

    fn staging_path(path: &Path) -> PathBuf {
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let mut name = path.as_os_str().to_owned();
        name.push(format!(".{}.{nanos}", std::process::id()));
        PathBuf::from(name)
    }

    fn read(path: &Path) -> Option<LockInfo> {
        let bytes = std::fs::read(path).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    fn should_break(path: &Path, force: bool) -> Result<bool, DeployError> {
        match Self::read(path) {
            Some(existing) if force => {
                tracing::warn!(
                    "Breaking lock held by {} (pid {}) since {}",
                    existing.holder,
                    existing.pid,
                    existing.started_at
                );
                Ok(true)
            }
            Some(existing) if existing.is_stale() => {
                tracing::warn!(
                    "Auto-breaking stale lock held by {} (pid {}) since {}",
                    existing.holder,
                    existing.pid,
                    existing.started_at
                );
                Ok(true)
            }
            Some(_) => Ok(false),
            None => {
                tracing::warn!("Lock info unreadable, breaking lock");
                Ok(true)
            }
        }
    }
}

impl Drop for DeployLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release deploy lock");
        }
    }
}
