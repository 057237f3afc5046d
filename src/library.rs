// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! ROM library discovery.
//!
//! A library is a directory holding one directory per system, each with its
//! own `gamelist.xml`. Every such system directory is a __collection__.

use crate::path::collection_name;

use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Descriptor document file name.
pub const GAMELIST: &str = "gamelist.xml";

/// One system directory with a descriptor document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Collection {
    name: String,
    gamelist: PathBuf,
}

impl Collection {
    /// Construct collection from path to its gamelist.
    pub fn new(gamelist: impl Into<PathBuf>) -> Self {
        let gamelist = gamelist.into();
        Self {
            name: collection_name(&gamelist),
            gamelist,
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn gamelist(&self) -> &Path {
        self.gamelist.as_path()
    }
}

/// Find every collection at target path.
///
/// Target can be a gamelist, a single system directory, or a whole library.
/// Symlinked system directories are skipped, since they alias another system.
///
/// # Errors
///
/// - Return [`LibraryError::NotFound`] if target does not exist.
/// - Return [`LibraryError::Pattern`] or [`LibraryError::Glob`] if the
///   library cannot be scanned.
#[instrument(skip(target), level = "debug")]
pub fn discover(target: impl AsRef<Path>) -> Result<Vec<Collection>> {
    let target = target.as_ref();
    if target.is_file() {
        return Ok(vec![Collection::new(target)]);
    }

    if !target.is_dir() {
        return Err(LibraryError::NotFound {
            path: target.to_path_buf(),
        });
    }

    let gamelist = target.join(GAMELIST);
    if gamelist.is_file() {
        return Ok(vec![Collection::new(gamelist)]);
    }

    let pattern = target.join("*").join(GAMELIST);
    let mut collections = Vec::new();
    for path in glob::glob(&pattern.to_string_lossy())? {
        let path = path?;
        if path.parent().is_some_and(Path::is_symlink) {
            debug!("skip symlinked system {:?}", path.display());
            continue;
        }
        collections.push(Collection::new(path));
    }
    collections.sort();

    Ok(collections)
}

/// Library discovery error types.
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    /// Target path does not exist.
    #[error("no gamelist or library at {:?}", path.display())]
    NotFound { path: PathBuf },

    /// Scan pattern is invalid.
    #[error(transparent)]
    Pattern(#[from] glob::PatternError),

    /// Scanned entry cannot be read.
    #[error(transparent)]
    Glob(#[from] glob::GlobError),
}

/// Friendly result alias :3
pub type Result<T, E = LibraryError> = std::result::Result<T, E>;
