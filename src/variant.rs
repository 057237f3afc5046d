// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Variant selection.
//!
//! A ROM library tends to hold several near-duplicate copies of the same game:
//! different regions, revisions, betas, re-releases by different makers. The
//! No-Intro naming convention encodes all of that as parenthesized __tags__
//! after the title, e.g., `Sonic & Knuckles (USA, Rev 1).zip`.
//!
//! # Selection Pipeline
//!
//! Selecting a single copy happens in three steps:
//!
//! 1. [`tokenize`] splits each file name into a normalized __base name__ and
//!    an ordered list of tags.
//! 2. [`group`] buckets files by base name. Inside a group every file is a
//!    __variant__ keyed by its exact tag combination. Two files with the same
//!    base name and tag combination cannot be told apart, so that group is
//!    rejected outright.
//! 3. [`select`] runs a fixed rule pipeline over a group's variants: reject
//!    tags, a hard region filter, then independent maker, language, and
//!    de-preference tie-breakers. Whenever the rules are not decisive the
//!    group is reported as ambiguous instead of guessed at.

pub mod group;
pub mod select;
pub mod tokenize;

pub use group::{group_variants, VariantGroup};
pub use select::{select, Ambiguity, Selection, SelectionRules};
pub use tokenize::{tokenize, tokenize_path, Tokens};

use std::path::{Path, PathBuf};

/// One physical candidate within a group of same-named items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    identity: PathBuf,
    tags: Vec<String>,
}

impl Variant {
    /// Construct new variant.
    pub fn new(
        identity: impl Into<PathBuf>,
        tags: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            identity: identity.into(),
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Path to the underlying resource.
    pub fn identity(&self) -> &Path {
        self.identity.as_path()
    }

    pub fn tags(&self) -> &[String] {
        self.tags.as_slice()
    }

    /// Check if variant carries target tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Tag combination key used to tell variants of one group apart.
    pub fn key(&self) -> String {
        self.tags.join("|")
    }
}

/// Variant selection error types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectError {
    /// Two files tokenize to the same base name and tag combination.
    #[error(
        "{:?} and {:?} share base name {name:?} and tags [{key}]",
        first.display(),
        second.display()
    )]
    DuplicateVariant {
        name: String,
        key: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = SelectError> = std::result::Result<T, E>;
