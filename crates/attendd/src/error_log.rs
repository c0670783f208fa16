//! Append-only error log for failed recognition requests.
//!
//! Handlers write through the [`ErrorLog`] trait so tests can capture
//! entries in memory instead of touching the filesystem.

use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

pub trait ErrorLog: Send + Sync {
    fn record(&self, message: &str);
}

/// Format one log line: `<timestamp> - ERROR - <message>`.
pub fn format_entry(timestamp: chrono::DateTime<chrono::Local>, message: &str) -> String {
    format!("{} - ERROR - {message}\n", timestamp.format("%Y-%m-%d %H:%M:%S,%3f"))
}

/// Error log backed by a single never-rotated file.
pub struct FileErrorLog {
    writer: Mutex<RollingFileAppender>,
}

impl FileErrorLog {
    pub fn open(path: &Path) -> io::Result<Self> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "error log path has no file name"))?;

        std::fs::create_dir_all(dir)?;
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix(file_name)
            .build(dir)
            .map_err(io::Error::other)?;

        Ok(Self {
            writer: Mutex::new(appender),
        })
    }
}

impl ErrorLog for FileErrorLog {
    fn record(&self, message: &str) {
        let line = format_entry(chrono::Local::now(), message);
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(err) = writer.write_all(line.as_bytes()).and_then(|_| writer.flush()) {
            tracing::warn!(error = %err, "failed to append to error log");
        }
    }
}

/// In-memory error log.
#[derive(Default)]
pub struct MemoryErrorLog {
    entries: Mutex<Vec<String>>,
}

impl MemoryErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl ErrorLog for MemoryErrorLog {
    fn record(&self, message: &str) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.to_string());
    }
}
