//! Host messaging/upload collaborator
//!
//! The pipeline only decides when to publish and with what payload; transport,
//! retries, and delivery guarantees belong to the host. `LogPublisher` is the
//! default stand-in that records everything through the log stream;
//! `DirectoryPublisher` spools events and artifacts into a directory the host
//! agent drains.

use crate::{Error, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Named status/error events plus artifact handoff.
pub trait Publisher {
    /// Emit a named event (`"status"` or `"error"`) with a human-readable
    /// message.
    fn publish(&self, event: &str, message: &str) -> Result<()>;

    /// Hand off a completed file for upload.
    fn upload_file(&self, path: &Path) -> Result<()>;
}

/// Publisher that records events and uploads through the log stream only.
#[derive(Debug, Default)]
pub struct LogPublisher;

impl Publisher for LogPublisher {
    fn publish(&self, event: &str, message: &str) -> Result<()> {
        info!("publish [{}]: {}", event, message);
        Ok(())
    }

    fn upload_file(&self, path: &Path) -> Result<()> {
        info!("upload: {}", path.display());
        Ok(())
    }
}

/// Publisher spooling into a directory: events appended to `events.log`,
/// uploads copied alongside.
#[derive(Debug)]
pub struct DirectoryPublisher {
    spool_dir: PathBuf,
}

impl DirectoryPublisher {
    pub fn new(spool_dir: impl Into<PathBuf>) -> Result<Self> {
        let spool_dir = spool_dir.into();
        fs::create_dir_all(&spool_dir).map_err(|e| {
            Error::publish(
                format!("failed to create spool dir '{}'", spool_dir.display()),
                Some(e),
            )
        })?;
        Ok(Self { spool_dir })
    }

    fn events_path(&self) -> PathBuf {
        self.spool_dir.join("events.log")
    }
}

impl Publisher for DirectoryPublisher {
    fn publish(&self, event: &str, message: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.events_path())
            .map_err(|e| Error::publish("failed to open events log", Some(e)))?;
        writeln!(
            file,
            "{}\t{}\t{}",
            chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S"),
            event,
            message
        )
        .map_err(|e| Error::publish("failed to append event", Some(e)))?;
        info!("spooled [{}]: {}", event, message);
        Ok(())
    }

    fn upload_file(&self, path: &Path) -> Result<()> {
        let file_name = path
            .file_name()
            .ok_or_else(|| Error::publish(format!("no file name in '{}'", path.display()), None))?;
        let target = self.spool_dir.join(file_name);
        fs::copy(path, &target).map_err(|e| {
            Error::publish(
                format!("failed to spool '{}' for upload", path.display()),
                Some(e),
            )
        })?;
        info!("spooled upload: {}", target.display());
        Ok(())
    }
}
