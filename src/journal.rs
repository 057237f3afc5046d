// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Change and notice records.
//!
//! Every mutation made to a store during a run is recorded as a __change__,
//! and every observation that needed no action (or could not be acted on
//! safely) is recorded as a __notice__. Records are kept per collection, are
//! append-only, and are never persisted. They exist so the user can see what
//! a run did before anything gets written back to disk.

use std::fmt::{Display, Formatter, Result as FmtResult};
use tracing::{info, warn};

/// Committed mutation of a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change(String);

impl Change {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for Change {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(&self.0)
    }
}

/// Observation that required no action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice(String);

impl Notice {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for Notice {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(&self.0)
    }
}

/// Append-only record of changes and notices for one collection.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Journal {
    collection: String,
    changes: Vec<Change>,
    notices: Vec<Notice>,
}

impl Journal {
    /// Construct new empty journal for target collection.
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            ..Default::default()
        }
    }

    pub fn collection(&self) -> &str {
        self.collection.as_str()
    }

    /// Record a committed mutation.
    pub fn change(&mut self, message: impl Into<String>) {
        self.changes.push(Change(message.into()));
    }

    /// Record an observation.
    pub fn notice(&mut self, message: impl Into<String>) {
        self.notices.push(Notice(message.into()));
    }

    pub fn changes(&self) -> &[Change] {
        self.changes.as_slice()
    }

    pub fn notices(&self) -> &[Notice] {
        self.notices.as_slice()
    }

    /// Number of committed changes.
    ///
    /// Notices are not counted, because they never warrant persistence.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Move all records of another journal onto the end of this one.
    pub fn absorb(&mut self, other: Journal) {
        self.changes.extend(other.changes);
        self.notices.extend(other.notices);
    }

    /// Emit every record through the logger.
    ///
    /// Changes are logged at info level, notices as warnings.
    pub fn report(&self) {
        for change in &self.changes {
            info!("{}: {change}", self.collection);
        }

        for notice in &self.notices {
            warn!("{}: {notice}", self.collection);
        }
    }
}

impl Display for Journal {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        for change in &self.changes {
            writeln!(fmt, "{change}")?;
        }

        for notice in &self.notices {
            writeln!(fmt, "notice: {notice}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn journal_counts_only_changes() {
        let mut journal = Journal::new("nes");
        journal.change("Marked `Tetris` as `favorite`");
        journal.notice("`Zelda` listed as `kidgame` but missing from the gamelist");

        assert_eq!(journal.len(), 1);
        assert!(!journal.is_empty());
        assert_eq!(journal.notices().len(), 1);
    }

    #[test]
    fn journal_absorb_keeps_order() {
        let mut first = Journal::new("snes");
        first.change("one");
        let mut second = Journal::new("snes");
        second.change("two");
        second.notice("three");
        first.absorb(second);

        let expect = indoc! {r#"
            one
            two
            notice: three
        "#};
        assert_eq!(first.to_string(), expect);
    }
}
