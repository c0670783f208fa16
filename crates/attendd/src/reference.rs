//! Reference image lookup.
//!
//! Each employee has a directory `<root>/<employee_id>` provisioned by an
//! external process. The reference image is the lexicographically first
//! regular file named `<prefix>*<extension>` inside it.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Folder not found for employee_id: {0}")]
    NotEnrolled(String),
    #[error("Employee face image not found for employee_id: {0}")]
    ImageNotFound(String),
    #[error("failed to scan {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct ReferenceGallery {
    root: PathBuf,
    prefix: String,
    extension: String,
}

impl ReferenceGallery {
    pub fn new(root: impl Into<PathBuf>, prefix: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            prefix: prefix.into(),
            extension: extension.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn matches(&self, name: &str) -> bool {
        name.starts_with(&self.prefix) && name.ends_with(&self.extension)
    }

    /// Resolve the reference image for `employee_id`.
    pub async fn resolve(&self, employee_id: &str) -> Result<PathBuf, LookupError> {
        let folder = self.root.join(employee_id);
        let is_dir = tokio::fs::metadata(&folder)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(LookupError::NotEnrolled(employee_id.to_string()));
        }

        let io_err = |source| LookupError::Io {
            path: folder.clone(),
            source,
        };

        let mut entries = tokio::fs::read_dir(&folder).await.map_err(io_err)?;
        let mut candidates = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            if let Some(name) = entry.file_name().to_str() {
                if self.matches(name) {
                    candidates.push(name.to_string());
                }
            }
        }
        candidates.sort();

        for name in candidates {
            let path = folder.join(&name);
            if tokio::fs::metadata(&path).await.map(|m| m.is_file()).unwrap_or(false) {
                tracing::debug!(employee_id, path = %path.display(), "reference image resolved");
                return Ok(path);
            }
        }

        Err(LookupError::ImageNotFound(employee_id.to_string()))
    }
}
