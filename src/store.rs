// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Flag stores and their persistence.
//!
//! Romtidy keeps per-game flags in two independent documents:
//!
//! - The __sidecar store__ (`kidlist.json`), a small JSON document that lists
//!   flagged game names per collection. It is meant to be edited by hand.
//! - The __descriptor store__ (`gamelist.xml`), one XML document per
//!   collection as written by EmulationStation and scrapers. Each game entry
//!   carries its own flag sub-records next to its metadata.
//!
//! # Persistence
//!
//! Both documents are loaded wholesale, mutated in memory, and only written
//! back when a run actually changed something. Right before any overwrite, the
//! current file is copied to a sibling backup, `<stem>-bak.<ext>`, so the last
//! run can always be undone with [`restore`].

pub mod descriptor;
pub mod sidecar;

use std::{
    fs::{copy, write},
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};

/// Determine backup path of a document.
///
/// `roms/nes/gamelist.xml` is backed up to `roms/nes/gamelist-bak.xml`.
pub fn backup_path(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}-bak.{}", ext.to_string_lossy()),
        None => format!("{stem}-bak"),
    };
    path.with_file_name(name)
}

/// Copy current version of document to its backup path.
///
/// Does nothing if the document does not exist yet.
///
/// # Errors
///
/// - Return [`StoreError::Backup`] if the copy fails.
#[instrument(skip(path), level = "debug")]
pub fn backup(path: impl AsRef<Path>) -> Result<Option<PathBuf>> {
    let path = path.as_ref();
    if !path.exists() {
        debug!("nothing to back up at {:?}", path.display());
        return Ok(None);
    }

    let backup = backup_path(path);
    copy(path, &backup).map_err(|err| StoreError::Backup {
        source: err,
        path: path.to_path_buf(),
    })?;
    info!("backed up {:?} to {:?}", path.display(), backup.display());

    Ok(Some(backup))
}

/// Restore document from its last backup.
///
/// # Errors
///
/// - Return [`StoreError::MissingBackup`] if there is no backup.
/// - Return [`StoreError::Restore`] if the copy fails.
#[instrument(skip(path), level = "debug")]
pub fn restore(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let backup = backup_path(path);
    if !backup.exists() {
        return Err(StoreError::MissingBackup { path: backup });
    }

    copy(&backup, path).map_err(|err| StoreError::Restore {
        source: err,
        path: path.to_path_buf(),
    })?;
    info!("restored {:?} from {:?}", path.display(), backup.display());

    Ok(backup)
}

/// Back up document, then overwrite it with new contents.
pub(crate) fn write_with_backup(path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Result<()> {
    let path = path.as_ref();
    backup(path)?;
    write(path, contents.as_ref()).map_err(|err| StoreError::Write {
        source: err,
        path: path.to_path_buf(),
    })?;

    Ok(())
}

/// Store persistence error types.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Document cannot be read.
    #[error("failed to read {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Document cannot be written.
    #[error("failed to write {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Backup copy cannot be made.
    #[error("failed to back up {:?}", path.display())]
    Backup {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Document cannot be restored from backup.
    #[error("failed to restore {:?}", path.display())]
    Restore {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Resource to flag cannot be found.
    #[error("could not find {:?}", path.display())]
    MissingResource {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Resource does not sit inside a collection directory.
    #[error("cannot determine collection of {:?}", path.display())]
    NoCollection { path: PathBuf },

    /// There is no backup to restore from.
    #[error("no backup found at {:?}", path.display())]
    MissingBackup { path: PathBuf },

    /// Sidecar document is not valid JSON of the expected layout.
    #[error("failed to parse sidecar {:?}", path.display())]
    ParseSidecar {
        #[source]
        source: serde_json::Error,
        path: PathBuf,
    },

    /// Descriptor document is not valid XML.
    #[error("failed to parse descriptor {:?}", path.display())]
    ParseDescriptor {
        #[source]
        source: quick_xml::Error,
        path: PathBuf,
    },

    /// Descriptor document nests deeper than entry fields.
    #[error("malformed descriptor {:?}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    /// Sidecar cannot be serialized.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Descriptor cannot be serialized.
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),

    /// Serialized output cannot be buffered.
    #[error(transparent)]
    Encode(#[from] std::io::Error),
}

/// Friendly result alias :3
pub type Result<T, E = StoreError> = std::result::Result<T, E>;
