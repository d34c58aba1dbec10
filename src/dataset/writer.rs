use std::{
    fs::{self, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::sampling::MetricSnapshot;

use super::row::{format_row, HEADER};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

/// Append-only CSV sink. Holds no file handle between writes, so any thread
/// may append.
#[derive(Debug, Clone)]
pub struct LogWriter {
    path: PathBuf,
}

impl LogWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the header iff the log does not exist yet. Returns whether it
    /// was written.
    pub fn ensure_header(&self) -> Result<bool> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create log directory {}", parent.display())
            })?;
        }

        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to create log {}", self.path.display()))
            }
        };

        writeln!(file, "{HEADER}")
            .and_then(|_| file.flush())
            .with_context(|| format!("failed to write header to {}", self.path.display()))?;

        log_info!("Created dataset log at {}", self.path.display());
        Ok(true)
    }

    /// Appends one row; an I/O failure drops the row and is only logged.
    pub fn append(&self, snapshot: &MetricSnapshot) {
        if let Err(err) = self.try_append(snapshot) {
            log_error!("dropping {} sample: {err:#}", snapshot.event.as_str());
        }
    }

    pub fn try_append(&self, snapshot: &MetricSnapshot) -> Result<()> {
        self.append_line(&format_row(snapshot))
    }

    fn append_line(&self, line: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {} for append", self.path.display()))?;

        // One write call per row keeps concurrent appenders from splicing lines
        // on filesystems with atomic O_APPEND.
        let mut row = String::with_capacity(line.len() + 1);
        row.push_str(line);
        row.push('\n');

        file.write_all(row.as_bytes())
            .and_then(|_| file.flush())
            .with_context(|| format!("failed to append to {}", self.path.display()))
    }
}
