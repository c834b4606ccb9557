//! Backup-before-write discipline for the patch target.
//!
//! A backup is a byte-identical copy at `<target>.backup`, taken before the
//! engine reads or mutates the target. [`restore`] copies it back.

use crate::edit::{atomic_write, EditError};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use tracing::{debug, info};

const BACKUP_SUFFIX: &str = ".backup";

/// What to do when a backup file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackupPolicy {
    /// Reuse an existing backup only when it is byte-identical to the
    /// target. A backup of a different file is never replaced.
    #[default]
    Preserve,
    /// Replace any existing backup with the current target content.
    Overwrite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupRecord {
    pub original_path: PathBuf,
    pub backup_path: PathBuf,
    pub created_at: SystemTime,
    /// True when an existing backup was kept instead of written
    pub reused: bool,
}

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error(
        "existing backup {} holds different content than {}; force the backup to replace it",
        backup_path.display(),
        original_path.display()
    )]
    Exists {
        original_path: PathBuf,
        backup_path: PathBuf,
    },

    #[error("backup I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl BackupError {
    fn io(path: &Path, source: io::Error) -> Self {
        BackupError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// `<path>.backup`, keeping the full original file name.
pub fn backup_path_for(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_os_string();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Snapshot `path` to `<path>.backup`.
///
/// The copy keeps the source's modification time. Under
/// [`BackupPolicy::Preserve`] an existing backup with the same bytes as the
/// target is kept and the record has `reused = true`; one with different
/// bytes is [`BackupError::Exists`] and nothing is written.
pub fn create_backup(path: &Path, policy: BackupPolicy) -> Result<BackupRecord, BackupError> {
    if !path.is_file() {
        return Err(BackupError::NotFound(path.to_path_buf()));
    }

    let backup_path = backup_path_for(path);
    let bytes = fs::read(path).map_err(|e| BackupError::io(path, e))?;

    if backup_path.exists() && policy == BackupPolicy::Preserve {
        let existing = fs::read(&backup_path).map_err(|e| BackupError::io(&backup_path, e))?;
        if existing != bytes {
            return Err(BackupError::Exists {
                original_path: path.to_path_buf(),
                backup_path,
            });
        }
        let created_at = fs::metadata(&backup_path)
            .and_then(|m| m.modified())
            .map_err(|e| BackupError::io(&backup_path, e))?;
        info!(backup = %backup_path.display(), "existing backup matches target, kept");
        return Ok(BackupRecord {
            original_path: path.to_path_buf(),
            backup_path,
            created_at,
            reused: true,
        });
    }

    fs::write(&backup_path, &bytes).map_err(|e| BackupError::io(&backup_path, e))?;

    let source_meta = fs::metadata(path).map_err(|e| BackupError::io(path, e))?;
    let mtime = filetime::FileTime::from_last_modification_time(&source_meta);
    filetime::set_file_mtime(&backup_path, mtime)
        .map_err(|e| BackupError::io(&backup_path, e))?;

    debug!(
        original = %path.display(),
        backup = %backup_path.display(),
        bytes = bytes.len(),
        "backup written"
    );

    Ok(BackupRecord {
        original_path: path.to_path_buf(),
        backup_path,
        created_at: SystemTime::now(),
        reused: false,
    })
}

/// Copy `backup_path` back over `original_path` atomically.
pub fn restore(backup_path: &Path, original_path: &Path) -> Result<(), BackupError> {
    if !backup_path.is_file() {
        return Err(BackupError::NotFound(backup_path.to_path_buf()));
    }

    let bytes = fs::read(backup_path).map_err(|e| BackupError::io(backup_path, e))?;
    atomic_write(original_path, &bytes).map_err(|e| match e {
        EditError::Io(source) => BackupError::io(original_path, source),
        other => BackupError::io(original_path, io::Error::other(other.to_string())),
    })?;

    debug!(
        original = %original_path.display(),
        backup = %backup_path.display(),
        "target restored from backup"
    );
    Ok(())
}
