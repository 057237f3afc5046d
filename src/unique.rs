// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Keep one copy of every game.
//!
//! Scans a ROM directory, groups files into variants of the same game, picks a
//! single copy of each game, and then links, copies, or cleans up around the
//! chosen copy.
//!
//! # Whitelists and Blacklists
//!
//! Arcade sets are better filtered by name than by tags. A MAME listing XML
//! can be given as a __whitelist__: only parent sets (no `cloneof`) named in it
//! are kept, and the first file of each group is used as is. A `catver.ini`
//! file maps set names to categories, and any set in an excluded category is
//! __blacklisted__.

use crate::variant::{
    group_variants, select, Ambiguity, SelectError, Selection, SelectionRules, Variant,
};

use quick_xml::{events::Event, Reader};
use regex::Regex;
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::{Display, Formatter, Result as FmtResult},
    fs::{canonicalize, copy, read_to_string, remove_file},
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::{debug, info, instrument};

/// Category marker that rides along other category labels.
const MATURE: &str = "* Mature *";

/// What to do with the chosen copy of every game.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Symlink chosen copy into the destination.
    #[default]
    Link,

    /// Copy chosen copy into the destination.
    Copy,

    /// Remove every copy that was not chosen.
    Clean,
}

impl Display for Action {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            Self::Link => "link",
            Self::Copy => "copy",
            Self::Clean => "clean",
        };
        fmt.write_str(name)
    }
}

impl FromStr for Action {
    type Err = UniqueError;

    fn from_str(action: &str) -> Result<Self> {
        match action {
            "link" => Ok(Self::Link),
            "copy" => Ok(Self::Copy),
            "clean" => Ok(Self::Clean),
            other => Err(UniqueError::UnknownAction(other.to_string())),
        }
    }
}

/// Outcome for a single game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Game has a chosen copy.
    Keep {
        name: String,
        chosen: PathBuf,
        others: Vec<PathBuf>,
    },

    /// Game is in an excluded category.
    Blacklisted { name: String },

    /// Game is not on the whitelist.
    Filtered { name: String },

    /// Selection rules were not decisive.
    Ambiguous {
        name: String,
        reason: Ambiguity,
        candidates: Vec<Variant>,
    },

    /// Game has two files that cannot be told apart.
    Duplicate { name: String, error: SelectError },
}

/// Inputs that narrow down which games are kept.
#[derive(Debug, Default, Clone)]
pub struct Filters {
    pub whitelist: Option<BTreeSet<String>>,
    pub blacklist: BTreeSet<String>,
}

/// List candidate files in source directory.
///
/// Only files with target extension are listed, and files whose name matches
/// the ignore pattern are skipped.
///
/// # Errors
///
/// - Return [`UniqueError::Pattern`] if the glob pattern is invalid.
/// - Return [`UniqueError::Glob`] if a directory entry cannot be read.
#[instrument(skip(source, ignore), level = "debug")]
pub fn scan(source: impl AsRef<Path>, extension: &str, ignore: &Regex) -> Result<Vec<PathBuf>> {
    let pattern = source.as_ref().join(format!("*.{extension}"));
    let mut paths = Vec::new();
    for path in glob::glob(&pattern.to_string_lossy())? {
        let path = path?;
        let ignored = path
            .file_name()
            .is_some_and(|name| ignore.is_match(&name.to_string_lossy()));
        if ignored {
            debug!("ignore {:?}", path.display());
            continue;
        }
        paths.push(path);
    }
    paths.sort();

    Ok(paths)
}

/// Decide what to keep for every game among candidate files.
pub fn plan(
    candidates: impl IntoIterator<Item = impl Into<PathBuf>>,
    rules: &SelectionRules,
    filters: &Filters,
) -> Vec<Decision> {
    let mut decisions = Vec::new();

    for (name, group) in group_variants(candidates) {
        if filters.blacklist.contains(&name) {
            decisions.push(Decision::Blacklisted { name });
            continue;
        }

        let group = match group {
            Ok(group) => group,
            Err(error) => {
                decisions.push(Decision::Duplicate { name, error });
                continue;
            }
        };

        let chosen = match &filters.whitelist {
            Some(whitelist) if !whitelist.contains(&name) => {
                decisions.push(Decision::Filtered { name });
                continue;
            }
            Some(_) => group.variants()[0].clone(),
            None => match select(group.variants(), rules) {
                Selection::Chosen(variant) => variant,
                Selection::Ambiguous { reason, candidates } => {
                    decisions.push(Decision::Ambiguous {
                        name,
                        reason,
                        candidates,
                    });
                    continue;
                }
            },
        };

        let others = group
            .variants()
            .iter()
            .filter(|variant| *variant != &chosen)
            .map(|variant| variant.identity().to_path_buf())
            .collect();
        decisions.push(Decision::Keep {
            name,
            chosen: chosen.identity().to_path_buf(),
            others,
        });
    }

    decisions
}

/// Carry out action for every kept game.
///
/// Nothing touches the file system unless `run` is set. Returns the number of
/// games kept.
///
/// # Errors
///
/// - Return [`UniqueError::CreateDir`] if the destination cannot be created.
/// - Return [`UniqueError::Link`], [`UniqueError::Copy`], or
///   [`UniqueError::Remove`] if a file operation fails.
#[instrument(skip(decisions, destination), level = "debug")]
pub fn execute(
    decisions: &[Decision],
    action: Action,
    destination: impl AsRef<Path>,
    run: bool,
) -> Result<usize> {
    let destination = destination.as_ref();
    if run && action != Action::Clean {
        mkdirp::mkdirp(destination).map_err(|err| UniqueError::CreateDir {
            source: err,
            path: destination.to_path_buf(),
        })?;
    }

    let mut kept = 0;
    for decision in decisions {
        let Decision::Keep { name, chosen, others } = decision else {
            continue;
        };
        kept += 1;

        let target = destination.join(chosen.file_name().unwrap_or_default());
        match action {
            Action::Link => {
                info!("{name}: {:?} ~> {:?}", chosen.display(), target.display());
                if run && !target.exists() {
                    link(chosen, &target)?;
                }
            }
            Action::Copy => {
                info!("{name}: {:?} -> {:?}", chosen.display(), target.display());
                if run {
                    copy(chosen, &target).map_err(|err| UniqueError::Copy {
                        source: err,
                        from: chosen.clone(),
                        to: target.clone(),
                    })?;
                }
            }
            Action::Clean => {
                for other in others {
                    info!("{name}: rm {:?}", other.display());
                    if run {
                        remove_file(other).map_err(|err| UniqueError::Remove {
                            source: err,
                            path: other.clone(),
                        })?;
                    }
                }
            }
        }
    }

    Ok(kept)
}

fn link(chosen: &Path, target: &Path) -> Result<()> {
    let link_error = |err| UniqueError::Link {
        source: err,
        from: chosen.to_path_buf(),
        to: target.to_path_buf(),
    };
    let absolute = canonicalize(chosen).map_err(link_error)?;

    #[cfg(unix)]
    std::os::unix::fs::symlink(&absolute, target).map_err(link_error)?;
    #[cfg(windows)]
    std::os::windows::fs::symlink_file(&absolute, target).map_err(link_error)?;

    Ok(())
}

/// Read set names to keep from a MAME listing XML.
///
/// Clones are skipped, only parent sets are kept.
///
/// # Errors
///
/// - Return [`UniqueError::Read`] if the listing cannot be read.
/// - Return [`UniqueError::Whitelist`] if the listing is not valid XML.
pub fn read_whitelist(path: impl AsRef<Path>) -> Result<BTreeSet<String>> {
    let path = path.as_ref();
    let content = read_to_string(path).map_err(|err| UniqueError::Read {
        source: err,
        path: path.to_path_buf(),
    })?;
    parse_whitelist(&content).map_err(|err| UniqueError::Whitelist {
        source: err,
        path: path.to_path_buf(),
    })
}

fn parse_whitelist(content: &str) -> std::result::Result<BTreeSet<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(content);
    let mut names = BTreeSet::new();

    loop {
        match reader.read_event()? {
            Event::Start(start) | Event::Empty(start)
                if matches!(start.name().as_ref(), b"game" | b"machine") =>
            {
                let mut name = None;
                let mut clone = false;
                for attribute in start.attributes() {
                    let attribute = attribute?;
                    match attribute.key.as_ref() {
                        b"name" => name = Some(attribute.unescape_value()?.into_owned()),
                        b"cloneof" => clone = true,
                        _ => {}
                    }
                }

                if let (Some(name), false) = (name, clone) {
                    names.insert(name);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(names)
}

/// Read categories of every set from a `catver.ini` file.
///
/// # Errors
///
/// - Return [`UniqueError::Read`] if the file cannot be read.
pub fn read_catver(path: impl AsRef<Path>) -> Result<BTreeMap<String, Vec<String>>> {
    let path = path.as_ref();
    let content = read_to_string(path).map_err(|err| UniqueError::Read {
        source: err,
        path: path.to_path_buf(),
    })?;
    Ok(parse_catver(&content))
}

/// Parse the `[Category]` section of a `catver.ini` file.
///
/// A trailing mature marker is split off into its own category, and the rest
/// is split at ` / `.
pub fn parse_catver(content: &str) -> BTreeMap<String, Vec<String>> {
    let mut categories = BTreeMap::new();
    let mut in_category = false;

    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            in_category = &line[1..line.len() - 1] == "Category";
            continue;
        }

        if !in_category {
            continue;
        }

        let Some((name, value)) = line.split_once('=') else {
            continue;
        };

        let mut labels = Vec::new();
        let mut value = value.trim();
        if let Some(rest) = value.strip_suffix(MATURE) {
            labels.push(MATURE.to_string());
            value = rest.trim();
        }
        labels.extend(value.split(" / ").map(str::to_string));
        categories.insert(name.trim().to_lowercase(), labels);
    }

    categories
}

/// Names of every set in an excluded category.
pub fn blacklist(
    categories: &BTreeMap<String, Vec<String>>,
    excluded: &[String],
) -> BTreeSet<String> {
    categories
        .iter()
        .filter(|(_, labels)| labels.iter().any(|label| excluded.contains(label)))
        .map(|(name, _)| name.clone())
        .collect()
}

/// Keep-one-copy error types.
#[derive(Debug, thiserror::Error)]
pub enum UniqueError {
    /// Action name is not known.
    #[error("unknown action {0:?}, expected one of link, copy, clean")]
    UnknownAction(String),

    /// Scan pattern is invalid.
    #[error(transparent)]
    Pattern(#[from] glob::PatternError),

    /// Scanned entry cannot be read.
    #[error(transparent)]
    Glob(#[from] glob::GlobError),

    /// Input file cannot be read.
    #[error("failed to read {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Whitelist is not valid XML.
    #[error("failed to parse whitelist {:?}", path.display())]
    Whitelist {
        #[source]
        source: quick_xml::Error,
        path: PathBuf,
    },

    /// Destination directory cannot be created.
    #[error("failed to create destination {:?}", path.display())]
    CreateDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Chosen copy cannot be linked.
    #[error("failed to link {:?} to {:?}", from.display(), to.display())]
    Link {
        #[source]
        source: std::io::Error,
        from: PathBuf,
        to: PathBuf,
    },

    /// Chosen copy cannot be copied.
    #[error("failed to copy {:?} to {:?}", from.display(), to.display())]
    Copy {
        #[source]
        source: std::io::Error,
        from: PathBuf,
        to: PathBuf,
    },

    /// Unchosen copy cannot be removed.
    #[error("failed to remove {:?}", path.display())]
    Remove {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = UniqueError> = std::result::Result<T, E>;
