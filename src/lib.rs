// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Tidy up a ROM library's metadata.
//!
//! Romtidy keeps a personal ROM library in order. It picks a single copy of
//! every game out of a pile of near-duplicate region and revision variants,
//! keeps per-game flags like `kidgame` or `favorite` consistent between the
//! sidecar `kidlist.json` document and every system's `gamelist.xml`, and
//! cleans up the gamelists themselves.
//!
//! # Two Stores, One Truth
//!
//! Flags live in two places that can both be edited by hand between runs. The
//! __sidecar__ is a small JSON document listing game names per collection and
//! flag. The __descriptor__ is the front end's own gamelist, where flags are
//! child records of each game entry. Neither side wins by default. Instead,
//! [`reconcile`](reconcile::reconcile) combines both through a policy and
//! writes the result back to both, recording every change it makes.
//!
//! Nothing is persisted unless a change was recorded, and every document is
//! backed up right before it is overwritten.

pub mod clean;
pub mod config;
pub mod flag;
pub mod journal;
pub mod library;
pub mod media;
pub mod path;
pub mod reconcile;
pub mod run;
pub mod store;
pub mod unique;
pub mod variant;
