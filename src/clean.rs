// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Descriptor cleaning.
//!
//! Scrapers and manual edits leave gamelists with entries for files that no
//! longer exist, several entries for one file, several files for one game, and
//! double escaped text. Cleaning fixes all of that in four passes, in order:
//!
//! 1. Prune entries whose resource is missing.
//! 2. Merge entries that point to the same resource.
//! 3. Break ties between entries sharing a display name, using the preferred
//!    region tag of their file name.
//! 4. Normalize free text fields, and fix misspelled categories.
//!
//! Every pass is idempotent, so cleaning its own output records no changes.

pub mod video;

use crate::{
    journal::Journal,
    store::descriptor::{Descriptor, Entry},
    variant::tokenize_path,
};

use serde::{Deserialize, Serialize};
use std::{
    collections::{HashMap, HashSet},
    mem::take,
    path::{Path, PathBuf},
};
use tracing::{debug, instrument, warn};

/// Upper bound on replacement passes over one text.
const MAX_REPLACEMENT_PASSES: usize = 16;

/// Resource existence check.
pub trait Resources {
    /// Check if resource at path exists.
    fn exists(&self, path: &Path) -> bool;
}

/// Resources on the local file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsResources;

impl Resources for FsResources {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// Settings for descriptor cleaning.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CleaningRules {
    /// Tag that wins duplicate name ties.
    pub preferred_tag: String,

    /// Free text fields to normalize.
    pub text_fields: Vec<String>,

    /// Literal replacements applied to text fields, in order.
    pub replacements: Vec<(String, String)>,

    /// Field holding the category of a game.
    pub category_field: String,

    /// Misspelled category labels and their corrections.
    pub category_fixes: Vec<(String, String)>,

    /// Pixel format every video should be in.
    pub video_pixel_format: String,
}

impl Default for CleaningRules {
    fn default() -> Self {
        Self {
            preferred_tag: "USA".into(),
            text_fields: vec!["desc".into(), "developer".into(), "publisher".into()],
            replacements: pairs([
                ("&amp;", "&"),
                ("&quot;", "\""),
                ("&apos;", "'"),
                ("&#39;", "'"),
            ]),
            category_field: "genre".into(),
            category_fixes: pairs([("Plateform", "Platform"), ("Shoot'em Up", "Shoot'em up")]),
            video_pixel_format: "yuv420p".into(),
        }
    }
}

/// Run every cleaning pass over one collection's descriptor.
#[instrument(skip(descriptor, resources, rules), level = "debug")]
pub fn clean(
    descriptor: &mut Descriptor,
    collection: &str,
    resources: &impl Resources,
    rules: &CleaningRules,
) -> Journal {
    let mut journal = Journal::new(collection);
    prune_missing(descriptor, resources, &mut journal);
    merge_duplicate_paths(descriptor, &mut journal);
    break_duplicate_names(descriptor, &rules.preferred_tag, &mut journal);
    normalize_text(descriptor, rules, &mut journal);
    journal
}

/// Remove entries whose resource does not exist.
///
/// Entries without a path are not resources, and are kept.
pub fn prune_missing(
    descriptor: &mut Descriptor,
    resources: &impl Resources,
    journal: &mut Journal,
) {
    let entries = take(&mut descriptor.entries);
    for entry in entries {
        let missing = entry
            .path()
            .is_some_and(|path| !resources.exists(&descriptor.resolve(path)));
        if missing {
            journal.change(format!("removed `{}` (missing resource)", entry.display_name()));
        } else {
            descriptor.entries.push(entry);
        }
    }
}

/// Merge entries that resolve to the same resource path.
///
/// The first entry survives. Attributes of later duplicates overwrite the
/// survivor's, and fields only a duplicate has are copied over.
pub fn merge_duplicate_paths(descriptor: &mut Descriptor, journal: &mut Journal) {
    let entries = take(&mut descriptor.entries);
    let mut survivors: Vec<Entry> = Vec::with_capacity(entries.len());
    let mut by_path: HashMap<PathBuf, usize> = HashMap::new();

    for entry in entries {
        let Some(resolved) = entry.path().map(|path| descriptor.resolve(path)) else {
            survivors.push(entry);
            continue;
        };

        match by_path.get(&resolved) {
            Some(&index) => {
                warn!("duplicate entries for {:?}", resolved.display());
                merge_into(&mut survivors[index], &entry);
                journal.change(format!("removed `{}` (duplicate path)", entry.display_name()));
            }
            None => {
                by_path.insert(resolved, survivors.len());
                survivors.push(entry);
            }
        }
    }

    descriptor.entries = survivors;
}

fn merge_into(survivor: &mut Entry, duplicate: &Entry) {
    for (key, value) in &duplicate.attributes {
        survivor.set_attribute(key, value.clone());
    }

    for field in &duplicate.fields {
        if !survivor.has_field(&field.name) {
            survivor.fields.push(field.clone());
        }
    }
}

/// Resolve entries that share a display name.
///
/// If exactly one of them carries the preferred tag in its file name, the
/// others are removed. Otherwise nothing is removed, and a notice lists the
/// paths involved.
pub fn break_duplicate_names(
    descriptor: &mut Descriptor,
    preferred_tag: &str,
    journal: &mut Journal,
) {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    for (index, entry) in descriptor.entries.iter().enumerate() {
        let name = entry.display_name();
        groups
            .entry(name.clone())
            .or_insert_with(|| {
                order.push(name);
                Vec::new()
            })
            .push(index);
    }

    let mut doomed = HashSet::new();
    for name in order {
        let members = &groups[&name];
        if members.len() < 2 {
            continue;
        }

        let carriers = members
            .iter()
            .copied()
            .filter(|index| carries_tag(&descriptor.entries[*index], preferred_tag))
            .collect::<Vec<_>>();

        if let [keep] = carriers.as_slice() {
            debug!("keep {name:?} at entry {keep}");
            for index in members.iter().filter(|index| *index != keep) {
                doomed.insert(*index);
                journal.change(format!(
                    "removed `{name}` (duplicate name, missing preferred tag)"
                ));
            }
        } else {
            let paths = members
                .iter()
                .map(|index| descriptor.entries[*index].path().unwrap_or("<no path>"))
                .collect::<Vec<_>>();
            journal.notice(format!("`{name}` is shared by {}", paths.join(", ")));
        }
    }

    let mut index = 0;
    descriptor.entries.retain(|_| {
        let keep = !doomed.contains(&index);
        index += 1;
        keep
    });
}

fn carries_tag(entry: &Entry, tag: &str) -> bool {
    let source = entry.path().map(str::to_string).unwrap_or_else(|| entry.display_name());
    tokenize_path(source).tags.iter().any(|t| t == tag)
}

/// Normalize text fields, and fix category labels.
pub fn normalize_text(descriptor: &mut Descriptor, rules: &CleaningRules, journal: &mut Journal) {
    for entry in descriptor.entries.iter_mut() {
        let mut cleaned = false;
        for name in &rules.text_fields {
            if let Some(text) = entry.field(name) {
                let replaced = replace_all(text, &rules.replacements);
                if replaced != text {
                    entry.set_field(name, replaced);
                    cleaned = true;
                }
            }
        }

        if cleaned {
            journal.change(format!("cleaned text of `{}`", entry.display_name()));
        }

        if let Some(category) = entry.field(&rules.category_field) {
            let fixed = replace_all(category, &rules.category_fixes);
            if fixed != category {
                entry.set_field(&rules.category_field, fixed);
                journal.change(format!("fixed category of `{}`", entry.display_name()));
            }
        }
    }
}

/// Apply replacements in order until the text stops changing.
fn replace_all(text: &str, replacements: &[(String, String)]) -> String {
    let mut current = text.to_string();
    for _ in 0..MAX_REPLACEMENT_PASSES {
        let next = replacements
            .iter()
            .fold(current.clone(), |acc, (from, to)| acc.replace(from.as_str(), to));
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn pairs<const N: usize>(items: [(&str, &str); N]) -> Vec<(String, String)> {
    items
        .into_iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect()
}
