// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

mod unique;

use crate::LibraryFixture;

use romtidy::{
    clean::FsResources,
    flag::FlagToken,
    library::discover,
    media::{MediaProbe, Result as MediaResult},
    reconcile::SyncPolicy,
    run::{RunOptions, Session, Task},
    store::{backup_path, descriptor::Descriptor, restore, sidecar::SidecarStore},
};

use anyhow::Result;
use indoc::indoc;
use pretty_assertions::assert_eq;
use sealed_test::prelude::*;
use std::{fs::read_to_string, path::Path};

struct NoVideos;

impl MediaProbe for NoVideos {
    fn pixel_format(&self, _: &Path) -> MediaResult<Option<String>> {
        Ok(None)
    }

    fn transcode(&self, _: &Path, _: &str) -> MediaResult<()> {
        Ok(())
    }
}

const NES_GAMELIST: &str = indoc! {r#"
    <?xml version="1.0"?>
    <gameList>
        <game id="1">
            <path>./Tetris (USA).zip</path>
            <name>Tetris</name>
            <favorite>true</favorite>
        </game>
        <game id="2">
            <path>Tetris (USA).zip</path>
            <name>Tetris</name>
            <rating>0.8</rating>
        </game>
        <game>
            <path>./The Legend of Zelda (USA).zip</path>
            <name>The Legend of Zelda</name>
        </game>
        <game>
            <path>./Super Mario Bros. (World).zip</path>
            <name>Super Mario Bros.</name>
            <desc>Rescue the princess &amp;amp; save the kingdom</desc>
        </game>
    </gameList>
"#};

const KIDLIST: &str = indoc! {r#"
    {
      "nes": {
        "kidgame": ["Super Mario Bros. (World)"]
      }
    }
"#};

fn nes_library() -> Result<LibraryFixture> {
    let library = LibraryFixture::new("roms")?;
    library
        .with_roms("nes", &["Tetris (USA).zip", "Super Mario Bros. (World).zip"])?
        .with_gamelist("nes", NES_GAMELIST)?;
    std::fs::write("kidlist.json", KIDLIST)?;

    Ok(library)
}

fn session(dry_run: bool) -> Result<Session<FsResources, NoVideos>> {
    let options = RunOptions {
        dry_run,
        ..Default::default()
    };
    Ok(Session::new(SidecarStore::load("kidlist.json")?, options, FsResources, NoVideos))
}

#[sealed_test]
fn sync_and_clean_settle_after_one_run() -> Result<()> {
    let library = nes_library()?;
    let tasks = [Task::Sync(SyncPolicy::Union), Task::Clean];
    let collections = discover(library.root())?;
    assert_eq!(collections.len(), 1);

    let mut first = session(false)?;
    let report = first.run(&collections[0], &tasks)?;
    assert_eq!(report.sidecar.len(), 1);
    assert_eq!(report.descriptor.len(), 5);
    assert!(first.finish()?);

    let gamelist = Descriptor::load(library.gamelist("nes"))?;
    assert_eq!(gamelist.entries.len(), 2);

    let tetris = &gamelist.entries[0];
    assert_eq!(tetris.attribute("id"), Some("2"));
    assert_eq!(tetris.field("favorite"), Some("true"));
    assert_eq!(tetris.field("rating"), Some("0.8"));

    let mario = &gamelist.entries[1];
    assert_eq!(mario.field("kidgame"), Some("true"));
    assert_eq!(mario.field("desc"), Some("Rescue the princess & save the kingdom"));

    let sidecar = SidecarStore::load("kidlist.json")?;
    let nes = sidecar.collection("nes").unwrap();
    assert!(nes.list(FlagToken::Favorite).contains("Tetris (USA)"));
    assert_eq!(read_to_string(backup_path("kidlist.json"))?, KIDLIST);

    let mut second = session(false)?;
    assert!(second.run(&collections[0], &tasks)?.is_empty());
    assert!(!second.finish()?);

    Ok(())
}

#[sealed_test]
fn restore_undoes_last_save() -> Result<()> {
    let library = nes_library()?;
    let collections = discover(library.root())?;

    let mut session = session(false)?;
    session.run(&collections[0], &[Task::Clean])?;
    session.finish()?;
    assert_ne!(read_to_string(library.gamelist("nes"))?, NES_GAMELIST);

    restore(library.gamelist("nes"))?;
    assert_eq!(read_to_string(library.gamelist("nes"))?, NES_GAMELIST);

    Ok(())
}

#[sealed_test]
fn extract_then_apply_across_systems() -> Result<()> {
    let library = LibraryFixture::new("roms")?;
    library
        .with_roms("snes", &["Zelda (USA).sfc"])?
        .with_gamelist(
            "snes",
            indoc! {r#"
                <gameList>
                    <game>
                        <path>./Zelda (USA).sfc</path>
                        <hidden>true</hidden>
                    </game>
                </gameList>
            "#},
        )?
        .with_roms("gb", &["Tetris (World).gb"])?
        .with_gamelist(
            "gb",
            indoc! {r#"
                <gameList>
                    <game><path>./Tetris (World).gb</path></game>
                </gameList>
            "#},
        )?;
    std::fs::write("kidlist.json", r#"{"gb": {"kidgame": ["Tetris (World)"]}}"#)?;

    let collections = discover(library.root())?;
    let mut extract = session(false)?;
    for collection in &collections {
        extract.run(collection, &[Task::Sync(SyncPolicy::PreferDescriptor)])?;
    }
    extract.finish()?;

    // Gamelists win, so the kidgame flag of the gb system is gone.
    let sidecar = SidecarStore::load("kidlist.json")?;
    assert!(sidecar.collection("gb").unwrap().kidgame.is_empty());
    assert!(sidecar.collection("snes").unwrap().hidden.contains("Zelda (USA)"));

    let mut sidecar = sidecar;
    sidecar.add("gb", FlagToken::Favorite, "Tetris (World)");
    sidecar.save()?;

    let mut apply = session(false)?;
    for collection in &collections {
        apply.run(collection, &[Task::Sync(SyncPolicy::PreferSidecar)])?;
    }
    apply.finish()?;

    let gb = Descriptor::load(library.gamelist("gb"))?;
    assert_eq!(gb.entries[0].field("favorite"), Some("true"));
    let snes = Descriptor::load(library.gamelist("snes"))?;
    assert_eq!(snes.entries[0].field("hidden"), Some("true"));

    Ok(())
}
