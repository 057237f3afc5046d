// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

mod integration;

use anyhow::Result;
use std::{
    fs::{create_dir_all, write},
    path::{Path, PathBuf},
};

/// ROM library laid out on disk, one directory per system.
pub(crate) struct LibraryFixture {
    root: PathBuf,
}

impl LibraryFixture {
    pub(crate) fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub(crate) fn root(&self) -> &Path {
        self.root.as_path()
    }

    pub(crate) fn system(&self, system: &str) -> PathBuf {
        self.root.join(system)
    }

    pub(crate) fn gamelist(&self, system: &str) -> PathBuf {
        self.system(system).join("gamelist.xml")
    }

    /// Write empty ROM files into a system directory.
    pub(crate) fn with_roms(&self, system: &str, roms: &[&str]) -> Result<&Self> {
        let dir = self.system(system);
        create_dir_all(&dir)?;
        for rom in roms {
            write(dir.join(rom), "")?;
        }

        Ok(self)
    }

    /// Write gamelist of a system.
    pub(crate) fn with_gamelist(&self, system: &str, contents: impl AsRef<str>) -> Result<&Self> {
        create_dir_all(self.system(system))?;
        write(self.gamelist(system), contents.as_ref())?;

        Ok(self)
    }
}
