// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Variant selection rules.
//!
//! Selection is deterministic, and the order of the rules matters:
//!
//! 1. Drop every variant that carries a reject tag. The surviving set is never
//!    widened again.
//! 2. Apply the region filter. Regions are a hard filter: a variant from a
//!    region that is not listed is never an acceptable substitute.
//! 3. Apply maker, language, and de-preference tie-breakers. Each of them is
//!    evaluated on its own against the region filtered set, not against the
//!    output of the previous one. A tie only resolves when a single rule is
//!    decisive by itself.
//!
//! If none of that produces exactly one variant, the selection is
//! [`Selection::Ambiguous`], and the candidates are handed back for the
//! caller to report.

use crate::variant::Variant;

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use tracing::{debug, instrument};

/// Token tables driving variant selection.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SelectionRules {
    /// Tags that disqualify a variant outright.
    pub reject: Vec<String>,

    /// Acceptable regions in priority order.
    pub regions: Vec<String>,

    /// Makers in priority order.
    pub makers: Vec<String>,

    /// Languages in priority order.
    pub languages: Vec<String>,

    /// Tags to steer away from in priority order.
    pub avoid: Vec<String>,
}

impl Default for SelectionRules {
    fn default() -> Self {
        Self {
            reject: to_strings([
                "Beta",
                "Beta 1",
                "Beta 2",
                "Rev 1",
                "Rev 2",
                "Proto 1",
                "Proto 2",
                "Sample",
                "Unl",
                "Proto",
                "Ge",
                "Nintendo Switch",
                "Test Program",
                "Demo",
                "Genesis Mini",
                "Enhancement Chip",
            ]),
            regions: to_strings(["USA", "World"]),
            makers: to_strings(["Namco", "UBI Soft", "Tengen", "Virtual Console"]),
            languages: to_strings(["En"]),
            avoid: to_strings(["GameCube Edition"]),
        }
    }
}

impl SelectionRules {
    fn tie_breakers(&self) -> [TieBreaker<'_>; 3] {
        [
            TieBreaker::Prefer(&self.makers),
            TieBreaker::Prefer(&self.languages),
            TieBreaker::Avoid(&self.avoid),
        ]
    }
}

/// Outcome of selecting from a group of variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Rules settled on exactly one variant.
    Chosen(Variant),

    /// Rules were not decisive.
    Ambiguous {
        reason: Ambiguity,
        candidates: Vec<Variant>,
    },
}

impl Selection {
    /// Chosen variant, if any.
    pub fn chosen(&self) -> Option<&Variant> {
        match self {
            Self::Chosen(variant) => Some(variant),
            Self::Ambiguous { .. } => None,
        }
    }
}

/// Reason a selection could not be made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ambiguity {
    /// No variant carries an acceptable region.
    NoPreferredRegion,

    /// No tie-breaker narrowed the region filtered set down to one.
    Unresolved,
}

impl Display for Ambiguity {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::NoPreferredRegion => fmt.write_str("no variant in a preferred region"),
            Self::Unresolved => fmt.write_str("cannot decide between variants"),
        }
    }
}

enum TieBreaker<'a> {
    Prefer(&'a [String]),
    Avoid(&'a [String]),
}

impl TieBreaker<'_> {
    fn apply<'v>(&self, hits: &[&'v Variant]) -> Vec<&'v Variant> {
        match self {
            Self::Prefer(tokens) => match_preferred(hits, tokens),
            Self::Avoid(tokens) => match_not_preferred(hits, tokens),
        }
    }
}

/// Select one variant out of a group.
#[instrument(skip_all, level = "debug")]
pub fn select(variants: &[Variant], rules: &SelectionRules) -> Selection {
    let accepted = variants
        .iter()
        .filter(|variant| !rules.reject.iter().any(|tag| variant.has_tag(tag)))
        .collect::<Vec<_>>();

    let regional = match_preferred(&accepted, &rules.regions);
    match regional.as_slice() {
        [single] => return Selection::Chosen((*single).clone()),
        [] => {
            // INVARIANT: Report what the reject filter left, or everything if it left nothing.
            let candidates = if accepted.is_empty() {
                variants.to_vec()
            } else {
                accepted.into_iter().cloned().collect()
            };
            return Selection::Ambiguous {
                reason: Ambiguity::NoPreferredRegion,
                candidates,
            };
        }
        _ => {}
    }

    // INVARIANT: Every tie-breaker sees the same region filtered set.
    for breaker in rules.tie_breakers() {
        if let [single] = breaker.apply(&regional).as_slice() {
            debug!("tie broken in favor of {:?}", single.identity().display());
            return Selection::Chosen((*single).clone());
        }
    }

    Selection::Ambiguous {
        reason: Ambiguity::Unresolved,
        candidates: regional.into_iter().cloned().collect(),
    }
}

/// Walk tokens in priority order, keeping hits that carry the token.
///
/// A hit whose only tag is the token wins immediately. Otherwise the first
/// token that matches anything decides the returned subset.
fn match_preferred<'v>(hits: &[&'v Variant], tokens: &[String]) -> Vec<&'v Variant> {
    for token in tokens {
        let mut subset = Vec::new();
        for hit in hits {
            if hit.has_tag(token) {
                if hit.tags().len() == 1 {
                    return vec![*hit];
                }
                subset.push(*hit);
            }
        }

        if !subset.is_empty() {
            return subset;
        }
    }

    Vec::new()
}

/// Walk tokens in priority order, keeping hits that lack the token.
///
/// Mirrors [`match_preferred`], including the single tag short circuit.
fn match_not_preferred<'v>(hits: &[&'v Variant], tokens: &[String]) -> Vec<&'v Variant> {
    for token in tokens {
        let mut subset = Vec::new();
        for hit in hits {
            if !hit.has_tag(token) {
                if hit.tags().len() == 1 {
                    return vec![*hit];
                }
                subset.push(*hit);
            }
        }

        if !subset.is_empty() {
            return subset;
        }
    }

    Vec::new()
}

fn to_strings<const N: usize>(items: [&str; N]) -> Vec<String> {
    items.into_iter().map(str::to_string).collect()
}
