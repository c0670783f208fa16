//! Transient storage for uploaded images.
//!
//! An upload for employee `id` is written to `<root>/<id>_temp_image.jpg`.
//! The returned [`StagedImage`] owns that path: it holds the employee's
//! staging lock and deletes the file when dropped, so a second request for
//! the same id waits instead of overwriting an in-flight input.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

const TEMP_SUFFIX: &str = "_temp_image.jpg";

type LockMap = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

pub struct StagingArea {
    root: PathBuf,
    locks: LockMap,
}

impl StagingArea {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic scratch path for `employee_id`.
    pub fn path_for(&self, employee_id: &str) -> PathBuf {
        self.root.join(format!("{employee_id}{TEMP_SUFFIX}"))
    }

    fn lock_for(&self, employee_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(employee_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Write `bytes` to the scratch path for `employee_id`.
    ///
    /// Waits while another request holds a staged image for the same id.
    /// On a failed write the partial file is removed before returning.
    pub async fn stage(&self, employee_id: &str, bytes: &[u8]) -> io::Result<StagedImage> {
        let guard = self.lock_for(employee_id).lock_owned().await;
        let staged = StagedImage {
            path: self.path_for(employee_id),
            guard: Some(guard),
            locks: Arc::clone(&self.locks),
        };

        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(&staged.path, bytes).await?;
        tracing::debug!(employee_id, path = %staged.path.display(), size = bytes.len(), "image staged");

        Ok(staged)
    }
}

/// A staged upload. Removes its file on drop.
pub struct StagedImage {
    path: PathBuf,
    guard: Option<OwnedMutexGuard<()>>,
    locks: LockMap,
}

impl StagedImage {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedImage {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "staged image removed"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "failed to remove staged image")
            }
        }

        // Release the employee lock, then forget every lock nobody holds or
        // waits on. Waiters keep a clone of the Arc, so their entries stay.
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }
}
