// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the configuration file that romtidy reads its
//! locations and rule tables from. Every section and every field has a
//! default, so an empty file or no file at all is a valid configuration.

use crate::{clean::CleaningRules, variant::SelectionRules};

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::read_to_string,
    io::ErrorKind,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

/// Romtidy configuration layout.
///
/// # General Layout
///
/// The configuration is split into four sections. The `[paths]` section tells
/// where the sidecar document and the ROM library live. The `[selection]`
/// section holds the token tables variant selection runs on. The `[cleaning]`
/// section tunes gamelist cleaning. The `[unique]` section holds defaults for
/// the keep-one-copy workflow.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Locations of documents.
    pub paths: PathSettings,

    /// Variant selection rule tables.
    pub selection: SelectionRules,

    /// Descriptor cleaning settings.
    pub cleaning: CleaningRules,

    /// Keep-one-copy defaults.
    pub unique: UniqueSettings,
}

impl Config {
    /// Load configuration from target path.
    ///
    /// A missing file yields the default configuration.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if file exists but cannot be read.
    /// - Return [`ConfigError::Deserialize`] if file is not a valid layout.
    /// - Return [`ConfigError::ShellExpansion`] if a path cannot be expanded.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = match read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("no configuration at {:?}, using defaults", path.display());
                String::new()
            }
            Err(err) => {
                return Err(ConfigError::Read {
                    kind: err.kind(),
                    path: path.to_path_buf(),
                })
            }
        };

        content.parse()
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut config: Config = toml::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on every path field.
        config.paths.sidecar = expand(&config.paths.sidecar)?;
        config.paths.library = expand(&config.paths.library)?;
        config.paths.whitelist = config.paths.whitelist.as_deref().map(expand).transpose()?;
        config.paths.catver = config.paths.catver.as_deref().map(expand).transpose()?;

        Ok(config)
    }
}

impl Display for Config {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

fn expand(path: &Path) -> Result<PathBuf> {
    Ok(PathBuf::from(
        shellexpand::full(path.to_string_lossy().as_ref())
            .map_err(ConfigError::ShellExpansion)?
            .into_owned(),
    ))
}

/// Document locations.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathSettings {
    /// Sidecar flag document.
    pub sidecar: PathBuf,

    /// ROM library holding one directory per system.
    pub library: PathBuf,

    /// MAME listing used as keep-one-copy whitelist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whitelist: Option<PathBuf>,

    /// Category listing used to build the keep-one-copy blacklist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catver: Option<PathBuf>,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            sidecar: PathBuf::from("~/.emulationstation/kidlist.json"),
            library: PathBuf::from("~/RetroPie/roms"),
            whitelist: None,
            catver: None,
        }
    }
}

/// Keep-one-copy defaults.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UniqueSettings {
    /// Extension of candidate files.
    pub extension: String,

    /// Pattern of file names to skip.
    pub ignore: String,

    /// Categories whose sets are never kept.
    pub exclude_categories: Vec<String>,
}

impl Default for UniqueSettings {
    fn default() -> Self {
        Self {
            extension: "zip".into(),
            ignore: r"^\[".into(),
            exclude_categories: [
                "* Mature *",
                "Mahjong",
                "Lightgun",
                "Tabletop",
                "Quiz",
                "Japanese",
                "BIOS",
                "Print Club",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Configuration error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read configuration {:?}: {kind}", path.display())]
    Read { kind: ErrorKind, path: PathBuf },

    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[sealed_test(env = [("ROMS", "/home/pi/roms")])]
    fn deserialize_config() -> anyhow::Result<()> {
        let result: Config = r#"
            [paths]
            sidecar = "/etc/kidlist.json"
            library = "$ROMS"
            catver = "$ROMS/mame/catver.ini"

            [selection]
            regions = ["Europe"]

            [unique]
            exclude_categories = ["Quiz"]
        "#
        .parse()?;

        let expect = Config {
            paths: PathSettings {
                sidecar: "/etc/kidlist.json".into(),
                library: "/home/pi/roms".into(),
                whitelist: None,
                catver: Some("/home/pi/roms/mame/catver.ini".into()),
            },
            selection: SelectionRules {
                regions: vec!["Europe".into()],
                ..Default::default()
            },
            cleaning: CleaningRules::default(),
            unique: UniqueSettings {
                exclude_categories: vec!["Quiz".into()],
                ..Default::default()
            },
        };

        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn serialize_unique_settings() {
        let result = Config {
            unique: UniqueSettings {
                extension: "7z".into(),
                ignore: "^BIOS".into(),
                exclude_categories: vec!["Quiz".into(), "Mahjong".into()],
            },
            ..Default::default()
        }
        .to_string();

        let expect = indoc! {r#"
            [unique]
            extension = "7z"
            ignore = "^BIOS"
            exclude_categories = [
                "Quiz",
                "Mahjong",
            ]
        "#};

        assert!(result.contains(expect));
    }

    #[sealed_test(env = [("HOME", "/home/pi")])]
    fn missing_file_means_defaults() -> anyhow::Result<()> {
        let config = Config::load("nowhere.toml")?;
        assert_eq!(config.paths.library, PathBuf::from("/home/pi/RetroPie/roms"));
        assert_eq!(config.selection, SelectionRules::default());

        Ok(())
    }
}
