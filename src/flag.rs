// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Per-entity boolean flags.
//!
//! Each game in a collection can carry a fixed set of boolean __flags__. The
//! same flags are recorded in two places, the sidecar store and the gamelist
//! descriptor, and each place can be edited by hand between runs. The
//! [`FlagState`] trait is the one contract both stores expose, so the
//! reconciler and the cleaner never care which store backs an entity.

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

/// Flag tracked per entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagToken {
    /// Safe for kids to play.
    Kidgame,

    /// Marked as a favorite.
    Favorite,

    /// Hidden from the game list.
    ///
    /// Also forced on for every entity of a collection that is hidden as a
    /// whole.
    Hidden,
}

impl FlagToken {
    /// Every flag, in processing order.
    pub const ALL: [FlagToken; 3] = [FlagToken::Kidgame, FlagToken::Favorite, FlagToken::Hidden];

    /// Name of flag as written in both stores.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kidgame => "kidgame",
            Self::Favorite => "favorite",
            Self::Hidden => "hidden",
        }
    }
}

impl Display for FlagToken {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_str())
    }
}

impl FromStr for FlagToken {
    type Err = UnknownFlag;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        FlagToken::ALL
            .into_iter()
            .find(|flag| flag.as_str() == token)
            .ok_or_else(|| UnknownFlag(token.to_string()))
    }
}

/// Flag token is not one of the known flags.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown flag {0:?}, expected one of kidgame, favorite, hidden")]
pub struct UnknownFlag(pub String);

/// Flag state of a single named entity.
///
/// # Invariant
///
/// - `set(flag, value)` followed by `is_set(flag)` yields `value`, unless
///   the backing store has an override it cannot lift, in which case a
///   notice is recorded instead of a change.
/// - `set` is a no-op when the flag already holds the value, so repeated
///   calls record exactly one change.
pub trait FlagState {
    /// Stable name of entity within its collection.
    fn name(&self) -> &str;

    /// Check if flag is set.
    fn is_set(&self, flag: FlagToken) -> bool;

    /// Set or clear flag, recording a change if anything moved.
    fn set(&mut self, flag: FlagToken, value: bool);
}

/// Human readable change message for a flag update.
pub(crate) fn marked(name: &str, flag: FlagToken, value: bool) -> String {
    if value {
        format!("Marked `{name}` as `{flag}`")
    } else {
        format!("Marked `{name}` as not `{flag}`")
    }
}
