// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Run tasks over collections.
//!
//! A [`Session`] owns the sidecar store for the whole run, and loads one
//! descriptor at a time. Each collection goes through its tasks in memory,
//! reports its changes and notices, and is then saved only if something
//! changed and the run is not dry. A collection that fails to load or save
//! does not stop the others, and its sidecar edits are rolled back. The
//! sidecar is saved once, at the end.

use crate::{
    clean::{clean, video::format_videos, CleaningRules, Resources},
    flag::FlagToken,
    journal::Journal,
    library::Collection,
    media::MediaProbe,
    reconcile::{prune_stale, reconcile, SyncPolicy},
    store::{descriptor::Descriptor, sidecar::SidecarStore, StoreError},
};

use tracing::{error, info, instrument};

/// One in-memory pass over a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Reconcile flags across both stores.
    Sync(SyncPolicy),

    /// Drop sidecar names missing from the gamelist.
    PruneStale,

    /// Clean gamelist entries.
    Clean,

    /// Normalize preview videos.
    FormatVideos,
}

/// Knobs shared by every collection of a run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub flags: Vec<FlagToken>,
    pub cleaning: CleaningRules,
    pub dry_run: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            flags: FlagToken::ALL.to_vec(),
            cleaning: CleaningRules::default(),
            dry_run: false,
        }
    }
}

/// Records of one collection, split by what they touched.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectionReport {
    pub sidecar: Journal,
    pub descriptor: Journal,
    pub media: Journal,
}

impl CollectionReport {
    fn new(collection: &str) -> Self {
        Self {
            sidecar: Journal::new(collection),
            descriptor: Journal::new(collection),
            media: Journal::new(collection),
        }
    }

    /// Total number of changes.
    pub fn len(&self) -> usize {
        self.sidecar.len() + self.descriptor.len() + self.media.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Emit every record through the logger.
    pub fn report(&self) {
        self.sidecar.report();
        self.descriptor.report();
        self.media.report();
    }
}

/// Outcome of a run over many collections.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Reports of collections that went through.
    pub reports: Vec<CollectionReport>,

    /// Collections that failed, by name.
    pub failures: Vec<(String, StoreError)>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Run state that outlives a single collection.
#[derive(Debug)]
pub struct Session<R, M> {
    sidecar: SidecarStore,
    sidecar_changed: bool,
    options: RunOptions,
    resources: R,
    probe: M,
}

impl<R, M> Session<R, M>
where
    R: Resources,
    M: MediaProbe,
{
    /// Construct new session around loaded sidecar store.
    pub fn new(sidecar: SidecarStore, options: RunOptions, resources: R, probe: M) -> Self {
        Self {
            sidecar,
            sidecar_changed: false,
            options,
            resources,
            probe,
        }
    }

    pub fn sidecar(&self) -> &SidecarStore {
        &self.sidecar
    }

    /// Run tasks over every collection, skipping the ones that fail.
    pub fn run_all(&mut self, collections: &[Collection], tasks: &[Task]) -> RunSummary {
        let mut summary = RunSummary::default();
        for collection in collections {
            match self.run(collection, tasks) {
                Ok(report) => summary.reports.push(report),
                Err(err) => {
                    error!("{}: {err}", collection.name());
                    summary.failures.push((collection.name().to_string(), err));
                }
            }
        }

        summary
    }

    /// Run tasks over one collection, in order.
    ///
    /// Sidecar edits made for this collection are undone if its gamelist
    /// cannot be saved.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError`] if the descriptor cannot be loaded or saved.
    #[instrument(skip(self, collection), fields(collection = collection.name()), level = "debug")]
    pub fn run(
        &mut self,
        collection: &Collection,
        tasks: &[Task],
    ) -> Result<CollectionReport, StoreError> {
        let name = collection.name();
        let mut descriptor = Descriptor::load(collection.gamelist())?;
        let mut report = CollectionReport::new(name);
        let snapshot = self.sidecar.collection(name).cloned();

        for task in tasks {
            match task {
                Task::Sync(policy) => {
                    let result = reconcile(
                        &mut self.sidecar,
                        &mut descriptor,
                        name,
                        *policy,
                        &self.options.flags,
                    );
                    report.sidecar.absorb(result.sidecar);
                    report.descriptor.absorb(result.descriptor);
                }
                Task::PruneStale => {
                    let journal =
                        prune_stale(&mut self.sidecar, &descriptor, name, &self.options.flags);
                    report.sidecar.absorb(journal);
                }
                Task::Clean => {
                    let journal =
                        clean(&mut descriptor, name, &self.resources, &self.options.cleaning);
                    report.descriptor.absorb(journal);
                }
                Task::FormatVideos => {
                    let journal = format_videos(
                        &descriptor,
                        name,
                        &self.probe,
                        &self.options.cleaning.video_pixel_format,
                        self.options.dry_run,
                    );
                    report.media.absorb(journal);
                }
            }
        }

        if report.descriptor.is_empty() {
            info!("{name}: gamelist unchanged");
        } else if self.options.dry_run {
            info!("{name}: dry run, gamelist not saved");
        } else if let Err(err) = descriptor.save() {
            self.sidecar.replace_collection(name, snapshot);
            return Err(err);
        } else {
            info!("{name}: saved {:?}", descriptor.path().display());
        }

        report.report();
        self.sidecar_changed |= !report.sidecar.is_empty();

        Ok(report)
    }

    /// Save sidecar store if any collection changed it.
    ///
    /// Returns whether the sidecar was written.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError`] if the sidecar cannot be saved.
    pub fn finish(self) -> Result<bool, StoreError> {
        if !self.sidecar_changed {
            info!("sidecar unchanged");
            return Ok(false);
        }

        if self.options.dry_run {
            info!("dry run, sidecar not saved");
            return Ok(false);
        }

        self.sidecar.save()?;
        info!("saved {:?}", self.sidecar.path().display());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::Result as MediaResult;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use std::{
        fs::{create_dir_all, read_to_string, write},
        path::Path,
    };

    struct Everything;

    impl Resources for Everything {
        fn exists(&self, _: &Path) -> bool {
            true
        }
    }

    struct NoVideos;

    impl MediaProbe for NoVideos {
        fn pixel_format(&self, _: &Path) -> MediaResult<Option<String>> {
            Ok(None)
        }

        fn transcode(&self, _: &Path, _: &str) -> MediaResult<()> {
            Ok(())
        }
    }

    const GAMELIST: &str = indoc! {r#"
        <?xml version="1.0" encoding="UTF-8"?>
        <gameList>
        	<game>
        		<path>./Tetris (USA).zip</path>
        		<name>Tetris</name>
        		<favorite>true</favorite>
        	</game>
        </gameList>
    "#};

    fn setup() -> anyhow::Result<Collection> {
        create_dir_all("roms/nes")?;
        write("roms/nes/gamelist.xml", GAMELIST)?;
        Ok(Collection::new("roms/nes/gamelist.xml"))
    }

    fn session() -> anyhow::Result<Session<Everything, NoVideos>> {
        let sidecar = SidecarStore::load("kidlist.json")?;
        Ok(Session::new(sidecar, RunOptions::default(), Everything, NoVideos))
    }

    #[sealed_test]
    fn dry_run_writes_nothing() -> anyhow::Result<()> {
        let collection = setup()?;
        let options = RunOptions {
            dry_run: true,
            ..Default::default()
        };
        let sidecar = SidecarStore::load("kidlist.json")?;
        let mut session = Session::new(sidecar, options, Everything, NoVideos);

        let report = session.run(&collection, &[Task::Sync(SyncPolicy::Union)])?;
        assert_eq!(report.sidecar.len(), 1);
        assert!(!session.finish()?);
        assert!(!Path::new("kidlist.json").exists());
        assert_eq!(read_to_string("roms/nes/gamelist.xml")?, GAMELIST);

        Ok(())
    }

    #[sealed_test]
    fn second_run_changes_nothing() -> anyhow::Result<()> {
        let collection = setup()?;
        let tasks = [Task::Sync(SyncPolicy::Union), Task::Clean, Task::FormatVideos];

        let mut session = session()?;
        assert_eq!(session.run(&collection, &tasks)?.len(), 1);
        assert!(session.finish()?);
        assert!(!Path::new("roms/nes/gamelist-bak.xml").exists());

        let mut session = self::session()?;
        assert!(session.run(&collection, &tasks)?.is_empty());
        assert!(!session.finish()?);

        Ok(())
    }

    #[sealed_test]
    fn malformed_gamelist_does_not_stop_others() -> anyhow::Result<()> {
        let nes = setup()?;
        create_dir_all("roms/snes")?;
        write(
            "roms/snes/gamelist.xml",
            "<gameList><game><path><x>1</x></path></game></gameList>",
        )?;
        write("kidlist.json", r#"{"nes": {"kidgame": ["Tetris (USA)"]}}"#)?;
        let snes = Collection::new("roms/snes/gamelist.xml");

        let mut session = session()?;
        let summary = session.run_all(&[snes, nes], &[Task::Sync(SyncPolicy::Union)]);
        assert!(!summary.is_success());
        assert_eq!(summary.reports.len(), 1);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].0, "snes");
        assert!(matches!(summary.failures[0].1, StoreError::Malformed { .. }));
        assert!(session.finish()?);

        let saved = Descriptor::load("roms/nes/gamelist.xml")?;
        assert_eq!(saved.entries[0].field("kidgame"), Some("true"));
        assert!(Path::new("roms/nes/gamelist-bak.xml").exists());

        Ok(())
    }

    #[sealed_test]
    fn failed_save_rolls_back_sidecar() -> anyhow::Result<()> {
        let collection = setup()?;
        write("kidlist.json", r#"{"nes": {"kidgame": ["Tetris (USA)"]}}"#)?;
        // A directory in the way of the backup copy makes the save fail.
        create_dir_all("roms/nes/gamelist-bak.xml")?;

        let mut session = session()?;
        let before = session.sidecar().collection("nes").cloned();
        let result = session.run(&collection, &[Task::Sync(SyncPolicy::Union)]);
        assert!(matches!(result, Err(StoreError::Backup { .. })));
        assert_eq!(session.sidecar().collection("nes").cloned(), before);
        assert!(!session.finish()?);
        assert!(!Path::new("kidlist-bak.json").exists());
        assert_eq!(read_to_string("roms/nes/gamelist.xml")?, GAMELIST);

        Ok(())
    }
}
