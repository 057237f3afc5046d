// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::LibraryFixture;

use romtidy::{
    config::Config,
    unique::{
        blacklist, execute, parse_catver, plan, read_whitelist, scan, Action, Decision, Filters,
    },
};

use anyhow::Result;
use indoc::indoc;
use pretty_assertions::assert_eq;
use regex::Regex;
use sealed_test::prelude::*;
use std::{fs::write, path::Path};

#[sealed_test]
fn copy_one_of_each_game() -> Result<()> {
    let library = LibraryFixture::new("all")?;
    library.with_roms(
        "nes",
        &[
            "Tetris (USA).zip",
            "Tetris (Europe).zip",
            "Tetris (USA) (Beta).zip",
            "Bomberman (USA) (Hudson).zip",
            "Bomberman (USA) (Namco).zip",
            "Kirby (Japan).zip",
            "[BIOS] Famicom Disk System (Japan).zip",
        ],
    )?;

    let config = Config::default();
    let ignore = Regex::new(&config.unique.ignore)?;
    let candidates = scan(library.system("nes"), &config.unique.extension, &ignore)?;
    assert_eq!(candidates.len(), 6);

    let decisions = plan(candidates, &config.selection, &Filters::default());
    let kept = decisions
        .iter()
        .filter_map(|decision| match decision {
            Decision::Keep { chosen, .. } => chosen
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(kept, vec!["Bomberman (USA) (Namco).zip", "Tetris (USA).zip"]);
    assert!(matches!(&decisions[1], Decision::Ambiguous { name, .. } if name == "kirby"));

    // Nothing happens without a run.
    execute(&decisions, Action::Copy, "unique/nes", false)?;
    assert!(!Path::new("unique/nes").exists());

    assert_eq!(execute(&decisions, Action::Copy, "unique/nes", true)?, 2);
    assert!(Path::new("unique/nes/Tetris (USA).zip").is_file());
    assert!(Path::new("unique/nes/Bomberman (USA) (Namco).zip").is_file());
    assert!(!Path::new("unique/nes/Tetris (Europe).zip").exists());

    Ok(())
}

#[sealed_test]
fn arcade_sets_by_listing_and_category() -> Result<()> {
    let library = LibraryFixture::new("arcade")?;
    library.with_roms("mame", &["pacman.zip", "puckman.zip", "mspacman.zip", "mahjong.zip"])?;
    write(
        "mame.xml",
        indoc! {r#"
            <mame>
                <game name="pacman"/>
                <game name="puckman" cloneof="pacman"/>
                <game name="mspacman"/>
                <game name="mahjong"/>
            </mame>
        "#},
    )?;
    let categories = parse_catver(indoc! {r#"
        [Category]
        pacman=Maze
        mspacman=Maze * Mature *
        mahjong=Mahjong
    "#});

    let config = Config::default();
    let filters = Filters {
        whitelist: Some(read_whitelist("mame.xml")?),
        blacklist: blacklist(&categories, &config.unique.exclude_categories),
    };
    let candidates = scan(library.system("mame"), "zip", &Regex::new(&config.unique.ignore)?)?;
    let decisions = plan(candidates, &config.selection, &filters);

    let expect = vec![
        Decision::Blacklisted {
            name: "mahjong".into(),
        },
        Decision::Blacklisted {
            name: "mspacman".into(),
        },
        Decision::Keep {
            name: "pacman".into(),
            chosen: library.system("mame").join("pacman.zip"),
            others: vec![],
        },
        Decision::Filtered {
            name: "puckman".into(),
        },
    ];
    assert_eq!(decisions, expect);

    Ok(())
}
