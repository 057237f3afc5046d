// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Flag reconciliation between the sidecar and descriptor stores.
//!
//! Both stores can be edited out-of-band between runs, so neither is
//! authoritative by default. For every entity of the descriptor, and every
//! flag, both sides are read, combined through a [`SyncPolicy`], and the
//! result is written back to both sides. Because [`FlagState::set`] is a no-op
//! when nothing moves, reconciling twice in a row yields no new changes.
//!
//! Names that only exist in the sidecar are left alone here. They are
//! reported as notices, and can be dropped with [`prune_stale`].

use crate::{
    flag::{FlagState, FlagToken},
    journal::Journal,
    store::{descriptor::Descriptor, sidecar::SidecarStore},
};

use std::{
    collections::{BTreeSet, HashMap},
    fmt::{Display, Formatter, Result as FmtResult},
};
use tracing::{debug, instrument};

/// How to combine the two sides of a flag.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SyncPolicy {
    /// Flag is set if either side has it.
    #[default]
    Union,

    /// Flag is set only if both sides have it.
    Intersection,

    /// Sidecar overwrites the descriptor.
    PreferSidecar,

    /// Descriptor overwrites the sidecar.
    PreferDescriptor,
}

impl SyncPolicy {
    /// Pick union or intersection semantics.
    pub fn from_require_both(require_both: bool) -> Self {
        if require_both {
            Self::Intersection
        } else {
            Self::Union
        }
    }

    /// Combine both sides of a flag.
    pub fn resolve(&self, sidecar: bool, descriptor: bool) -> bool {
        match self {
            Self::Union => sidecar || descriptor,
            Self::Intersection => sidecar && descriptor,
            Self::PreferSidecar => sidecar,
            Self::PreferDescriptor => descriptor,
        }
    }
}

impl Display for SyncPolicy {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            Self::Union => "union",
            Self::Intersection => "intersection",
            Self::PreferSidecar => "sidecar",
            Self::PreferDescriptor => "gamelist",
        };
        fmt.write_str(name)
    }
}

/// Records of one reconciliation, split by the store they touched.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub sidecar: Journal,
    pub descriptor: Journal,
}

/// Reconcile flags of one collection across both stores.
///
/// Entries sharing an entity name are reconciled as one entity: the
/// descriptor side is set if any of them has the flag, and the outcome is
/// written to all of them.
#[instrument(skip(sidecar, descriptor, flags), level = "debug")]
pub fn reconcile(
    sidecar: &mut SidecarStore,
    descriptor: &mut Descriptor,
    collection: &str,
    policy: SyncPolicy,
    flags: &[FlagToken],
) -> Reconciliation {
    let mut result = Reconciliation {
        sidecar: Journal::new(collection),
        descriptor: Journal::new(collection),
    };
    let side = sidecar.collection_mut(collection);

    for (name, indices) in entities(descriptor) {
        let mut listed = side.entity(name, &mut result.sidecar);
        for flag in flags {
            let described = indices
                .iter()
                .any(|index| descriptor.entries[*index].has_flag(*flag));
            let value = policy.resolve(listed.is_set(*flag), described);
            debug!("{} {flag} -> {value}", listed.name());

            listed.set(*flag, value);
            for index in &indices {
                descriptor.entries[*index]
                    .entity(&mut result.descriptor)
                    .set(*flag, value);
            }
        }
    }

    for (flag, name) in stale_names(side_names(sidecar, collection, flags), descriptor) {
        result.sidecar.notice(format!(
            "`{name}` listed as `{flag}` but missing from the gamelist"
        ));
    }

    result
}

/// Entry indices grouped by entity name, in document order.
fn entities(descriptor: &Descriptor) -> Vec<(String, Vec<usize>)> {
    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
    let mut by_name: HashMap<String, usize> = HashMap::new();

    for (index, entry) in descriptor.entries.iter().enumerate() {
        let name = entry.entity_name();
        if name.is_empty() {
            continue;
        }

        match by_name.get(&name) {
            Some(group) => groups[*group].1.push(index),
            None => {
                by_name.insert(name.clone(), groups.len());
                groups.push((name, vec![index]));
            }
        }
    }

    groups
}

/// Drop sidecar names that have no entity in the descriptor.
#[instrument(skip(sidecar, descriptor, flags), level = "debug")]
pub fn prune_stale(
    sidecar: &mut SidecarStore,
    descriptor: &Descriptor,
    collection: &str,
    flags: &[FlagToken],
) -> Journal {
    let mut journal = Journal::new(collection);
    let stale = stale_names(side_names(sidecar, collection, flags), descriptor);
    if stale.is_empty() {
        return journal;
    }

    let side = sidecar.collection_mut(collection);
    for (flag, name) in stale {
        if side.remove(flag, &name) {
            journal.change(format!("removed stale `{name}` from `{flag}`"));
        }
    }

    journal
}

fn side_names(
    sidecar: &SidecarStore,
    collection: &str,
    flags: &[FlagToken],
) -> Vec<(FlagToken, String)> {
    let Some(side) = sidecar.collection(collection) else {
        return Vec::new();
    };

    flags
        .iter()
        .flat_map(|flag| side.list(*flag).iter().map(|name| (*flag, name.clone())))
        .collect()
}

fn stale_names(
    listed: Vec<(FlagToken, String)>,
    descriptor: &Descriptor,
) -> Vec<(FlagToken, String)> {
    let known = descriptor
        .entries
        .iter()
        .map(|entry| entry.entity_name())
        .collect::<BTreeSet<_>>();

    listed
        .into_iter()
        .filter(|(_, name)| !known.contains(name))
        .collect()
}
