// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Sidecar flag store.
//!
//! # Document Layout
//!
//! The sidecar is a JSON object keyed by collection name. Each collection
//! lists the names of flagged games per flag, and may hide itself as a whole:
//!
//! ```json
//! {
//!   "nes": {
//!     "favorite": ["Tetris (USA)"],
//!     "hidden": [],
//!     "kidgame": ["Duck Tales (USA)", "Tetris (USA)"]
//!   },
//!   "mame": {
//!     "favorite": [],
//!     "hidden": [],
//!     "hide_all": true,
//!     "kidgame": []
//!   }
//! }
//! ```
//!
//! Names are always kept sorted and unique.

use crate::{
    flag::{marked, FlagState, FlagToken},
    journal::Journal,
    path::collection_name,
    store::{write_with_backup, Result, StoreError},
};

use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    fs::{canonicalize, read_to_string},
    path::{Path, PathBuf},
};
use tracing::{debug, instrument};

/// Flag lists of a single collection.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct SidecarCollection {
    #[serde(default)]
    pub favorite: BTreeSet<String>,

    #[serde(default)]
    pub hidden: BTreeSet<String>,

    /// Hide every game of the collection regardless of its own flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide_all: Option<bool>,

    #[serde(default)]
    pub kidgame: BTreeSet<String>,
}

impl SidecarCollection {
    /// Names listed under flag.
    pub fn list(&self, flag: FlagToken) -> &BTreeSet<String> {
        match flag {
            FlagToken::Kidgame => &self.kidgame,
            FlagToken::Favorite => &self.favorite,
            FlagToken::Hidden => &self.hidden,
        }
    }

    fn list_mut(&mut self, flag: FlagToken) -> &mut BTreeSet<String> {
        match flag {
            FlagToken::Kidgame => &mut self.kidgame,
            FlagToken::Favorite => &mut self.favorite,
            FlagToken::Hidden => &mut self.hidden,
        }
    }

    /// Check if the collection is hidden as a whole.
    pub fn hide_all(&self) -> bool {
        self.hide_all.unwrap_or(false)
    }

    /// Insert name under flag, returning whether it was new.
    pub fn insert(&mut self, flag: FlagToken, name: impl Into<String>) -> bool {
        self.list_mut(flag).insert(name.into())
    }

    /// Remove name from flag, returning whether it was listed.
    pub fn remove(&mut self, flag: FlagToken, name: &str) -> bool {
        self.list_mut(flag).remove(name)
    }

    /// View entity of this collection for flag manipulation.
    ///
    /// The collection override is captured once, at construction.
    pub fn entity<'a>(
        &'a mut self,
        name: impl Into<String>,
        journal: &'a mut Journal,
    ) -> SidecarEntity<'a> {
        let hide_all = self.hide_all();
        SidecarEntity {
            name: name.into(),
            collection: self,
            hide_all,
            journal,
        }
    }
}

/// Sidecar-backed entity.
#[derive(Debug)]
pub struct SidecarEntity<'a> {
    name: String,
    collection: &'a mut SidecarCollection,
    hide_all: bool,
    journal: &'a mut Journal,
}

impl FlagState for SidecarEntity<'_> {
    fn name(&self) -> &str {
        self.name.as_str()
    }

    fn is_set(&self, flag: FlagToken) -> bool {
        (flag == FlagToken::Hidden && self.hide_all)
            || self.collection.list(flag).contains(&self.name)
    }

    fn set(&mut self, flag: FlagToken, value: bool) {
        if self.is_set(flag) == value {
            return;
        }

        if value {
            self.collection.insert(flag, self.name.clone());
        } else if flag == FlagToken::Hidden && self.hide_all {
            self.journal.notice(format!(
                "cannot mark `{}` as not `{flag}`, collection is hidden as a whole",
                self.name
            ));
            return;
        } else {
            self.collection.remove(flag, &self.name);
        }

        self.journal.change(marked(&self.name, flag, value));
    }
}

/// Outcome of adding a resource to the sidecar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Addition {
    pub collection: String,
    pub name: String,

    /// Whether the name was not listed before.
    pub added: bool,
}

/// Sidecar store of every collection.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SidecarStore {
    path: PathBuf,
    collections: BTreeMap<String, SidecarCollection>,
}

impl SidecarStore {
    /// Load sidecar store.
    ///
    /// A missing document is treated as an empty store.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Read`] if the document cannot be read.
    /// - Return [`StoreError::ParseSidecar`] if the document is not valid.
    #[instrument(skip(path), level = "debug")]
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            debug!("no sidecar at {:?}, starting empty", path.display());
            return Ok(Self {
                path,
                collections: BTreeMap::new(),
            });
        }

        let content = read_to_string(&path).map_err(|err| StoreError::Read {
            source: err,
            path: path.clone(),
        })?;
        Self::parse(path, &content)
    }

    /// Parse sidecar store from document contents.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::ParseSidecar`] if the document is not valid.
    pub fn parse(path: impl Into<PathBuf>, content: &str) -> Result<Self> {
        let path = path.into();
        let collections = if content.trim().is_empty() {
            BTreeMap::new()
        } else {
            serde_json::from_str(content).map_err(|err| StoreError::ParseSidecar {
                source: err,
                path: path.clone(),
            })?
        };

        Ok(Self { path, collections })
    }

    /// Save sidecar store, backing up the previous version first.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Backup`] if the backup cannot be written.
    /// - Return [`StoreError::Write`] if the document cannot be written.
    #[instrument(skip(self), level = "debug")]
    pub fn save(&self) -> Result<()> {
        write_with_backup(&self.path, self.to_json_string()?)
    }

    /// Serialize store to pretty printed JSON.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Json`] if serialization fails.
    pub fn to_json_string(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(&self.collections)?;
        json.push('\n');
        Ok(json)
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Names of every collection in the store.
    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    pub fn collection(&self, name: &str) -> Option<&SidecarCollection> {
        self.collections.get(name)
    }

    /// Collection by name, created empty if missing.
    pub fn collection_mut(&mut self, name: &str) -> &mut SidecarCollection {
        self.collections.entry(name.to_string()).or_default()
    }

    /// Put back a collection as it was, or drop it if it did not exist.
    pub fn replace_collection(&mut self, name: &str, collection: Option<SidecarCollection>) {
        match collection {
            Some(collection) => {
                self.collections.insert(name.to_string(), collection);
            }
            None => {
                self.collections.remove(name);
            }
        }
    }

    /// Add entity name under flag in collection.
    ///
    /// Returns whether the name was new.
    pub fn add(&mut self, collection: &str, flag: FlagToken, name: impl Into<String>) -> bool {
        self.collection_mut(collection).insert(flag, name)
    }

    /// Add the game stored at a resource path under flag.
    ///
    /// The collection is the directory holding the resource, and the entity
    /// name is its file stem. Relative paths are resolved against the current
    /// directory first.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::MissingResource`] if the resource does not exist.
    /// - Return [`StoreError::NoCollection`] if the resource has no parent
    ///   directory to name a collection after.
    pub fn add_resource(&mut self, path: impl AsRef<Path>, flag: FlagToken) -> Result<Addition> {
        let path = path.as_ref();
        let resolved = canonicalize(path).map_err(|err| StoreError::MissingResource {
            source: err,
            path: path.to_path_buf(),
        })?;

        let collection = collection_name(&resolved);
        let name = resolved
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        if collection.is_empty() || name.is_empty() {
            return Err(StoreError::NoCollection { path: resolved });
        }

        let added = self.add(&collection, flag, name.clone());
        debug!("{collection}: `{name}` under `{flag}`, new: {added}");

        Ok(Addition {
            collection,
            name,
            added,
        })
    }
}
