// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for external files that need to be
//! interacted with, or managed in some way.

use std::path::{Path, PathBuf};

/// Determine default absolute path to configuration file.
///
/// Uses XDG Base Directory path `$XDG_CONFIG_HOME/romtidy/config.toml` as the
/// default. Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("romtidy").join("config.toml"))
        .ok_or(NoWayHome)
}

/// Name of the collection a file belongs to.
///
/// Collections are system directories, so this is the name of the directory
/// holding the file. Returns an empty string for files without a parent.
pub fn collection_name(path: impl AsRef<Path>) -> String {
    path.as_ref()
        .parent()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use sealed_test::prelude::*;
    use simple_test_case::test_case;

    #[test_case("roms/nes/gamelist.xml", "nes"; "gamelist")]
    #[test_case("/home/pi/RetroPie/roms/snes/Zelda (USA).zip", "snes"; "rom")]
    #[test_case("gamelist.xml", ""; "no parent")]
    #[test]
    fn collection_from_parent(path: &str, expect: &str) {
        assert_eq!(collection_name(path), expect);
    }

    #[sealed_test(env = [("XDG_CONFIG_HOME", "/home/pi/.config")])]
    fn config_path_follows_xdg() -> anyhow::Result<()> {
        assert_eq!(default_config_path()?, PathBuf::from("/home/pi/.config/romtidy/config.toml"));

        Ok(())
    }
}
