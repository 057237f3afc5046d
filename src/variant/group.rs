// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Variant grouping.

use crate::variant::{tokenize::tokenize_path, Result, SelectError, Variant};

use std::{
    collections::{BTreeMap, HashMap},
    path::PathBuf,
};
use tracing::debug;

/// Variants sharing one base name.
///
/// # Invariant
///
/// - No two variants share a tag combination key.
/// - Variants keep the order in which they were inserted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VariantGroup {
    base_name: String,
    variants: Vec<Variant>,
    keys: HashMap<String, usize>,
}

impl VariantGroup {
    /// Construct new empty group.
    pub fn new(base_name: impl Into<String>) -> Self {
        Self {
            base_name: base_name.into(),
            ..Default::default()
        }
    }

    pub fn base_name(&self) -> &str {
        self.base_name.as_str()
    }

    pub fn variants(&self) -> &[Variant] {
        self.variants.as_slice()
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Insert variant into group.
    ///
    /// # Errors
    ///
    /// - Return [`SelectError::DuplicateVariant`] if a variant with the same
    ///   tag combination is already in the group.
    pub fn insert(&mut self, variant: Variant) -> Result<()> {
        let key = variant.key();
        if let Some(index) = self.keys.get(&key) {
            return Err(SelectError::DuplicateVariant {
                name: self.base_name.clone(),
                key,
                first: self.variants[*index].identity().to_path_buf(),
                second: variant.identity().to_path_buf(),
            });
        }

        self.keys.insert(key, self.variants.len());
        self.variants.push(variant);

        Ok(())
    }
}

/// Bucket candidate paths into variant groups by base name.
///
/// A group that runs into a duplicate tag combination is poisoned: it holds
/// the error, and any later candidates for it are dropped. Other groups are
/// not affected.
pub fn group_variants(
    candidates: impl IntoIterator<Item = impl Into<PathBuf>>,
) -> BTreeMap<String, Result<VariantGroup>> {
    let mut groups: BTreeMap<String, Result<VariantGroup>> = BTreeMap::new();

    for candidate in candidates {
        let path = candidate.into();
        let tokens = tokenize_path(&path);
        let entry = groups
            .entry(tokens.base_name.clone())
            .or_insert_with(|| Ok(VariantGroup::new(tokens.base_name.clone())));

        let outcome = match entry {
            Ok(group) => {
                debug!("group {:?} under {:?}", path.display(), tokens.base_name);
                group.insert(Variant::new(path, tokens.tags))
            }
            Err(_) => continue,
        };

        if let Err(error) = outcome {
            *entry = Err(error);
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn group_by_base_name() {
        let groups = group_variants([
            "roms/Tetris (USA).zip",
            "roms/Tetris (Europe).zip",
            "roms/Dr. Mario (USA).zip",
        ]);

        let names = groups.keys().cloned().collect::<Vec<_>>();
        assert_eq!(names, vec!["dr mario", "tetris"]);

        let tetris = groups["tetris"].as_ref().unwrap();
        assert_eq!(tetris.len(), 2);
        assert_eq!(tetris.variants()[0].tags(), ["USA"]);
        assert_eq!(tetris.variants()[1].tags(), ["Europe"]);
    }

    #[test]
    fn duplicate_tag_combination_poisons_group_only() {
        let groups = group_variants([
            "a/Tetris (USA).zip",
            "b/Tetris (USA).7z",
            "a/Tetris (Europe).zip",
            "a/Dr. Mario (USA).zip",
        ]);

        let expect = SelectError::DuplicateVariant {
            name: "tetris".into(),
            key: "USA".into(),
            first: "a/Tetris (USA).zip".into(),
            second: "b/Tetris (USA).7z".into(),
        };
        assert_eq!(groups["tetris"], Err(expect));
        assert!(groups["dr mario"].is_ok());
    }
}
