// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use romtidy::{
    clean::FsResources,
    config::Config,
    flag::FlagToken,
    library::{discover, Collection},
    media::Ffmpeg,
    path::default_config_path,
    reconcile::SyncPolicy,
    run::{RunOptions, Session, Task},
    store::{restore, sidecar::SidecarStore},
    unique::{self, Action, Decision, Filters},
};

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use inquire::Confirm;
use regex::Regex;
use std::{path::PathBuf, process::exit};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "romtidy [options] <command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Log debug information.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let config_path = match self.config {
            Some(path) => path,
            None => default_config_path()?,
        };
        let config = Config::load(config_path)?;

        match self.command {
            Command::Sync(opts) => run_sync(config, opts),
            Command::Extract(opts) => run_one_way(config, opts, SyncPolicy::PreferDescriptor),
            Command::Apply(opts) => run_one_way(config, opts, SyncPolicy::PreferSidecar),
            Command::Clean(opts) => run_clean(config, opts),
            Command::FormatVideos(opts) => run_format_videos(config, opts),
            Command::Add(opts) => run_add(config, opts),
            Command::Unique(opts) => run_unique(config, opts),
            Command::Restore(opts) => run_restore(config, opts),
            Command::Config => run_config(config),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Reconcile flags between sidecar and gamelists.
    #[command(override_usage = "romtidy sync [options] [target]")]
    Sync(SyncOptions),

    /// Copy flags from gamelists into the sidecar.
    #[command(override_usage = "romtidy extract [options] [target]")]
    Extract(TargetOptions),

    /// Copy flags from the sidecar into gamelists.
    #[command(override_usage = "romtidy apply [options] [target]")]
    Apply(TargetOptions),

    /// Remove missing, duplicate, and badly escaped gamelist entries.
    #[command(override_usage = "romtidy clean [options] [target]")]
    Clean(CleanOptions),

    /// Transcode preview videos the front end cannot play.
    #[command(override_usage = "romtidy format-videos [options] [target]")]
    FormatVideos(TargetOptions),

    /// Flag a game in the sidecar.
    #[command(override_usage = "romtidy add [options] <path>")]
    Add(AddOptions),

    /// Keep one copy of every game.
    #[command(override_usage = "romtidy unique [options] <source> <destination>")]
    Unique(UniqueOptions),

    /// Restore documents from their last backup.
    #[command(override_usage = "romtidy restore [options] [target]")]
    Restore(RestoreOptions),

    /// Print effective configuration.
    Config,
}

#[derive(Args, Clone, Debug)]
struct TargetOptions {
    /// Gamelist, system directory, or library to work on.
    #[arg(value_name = "target")]
    pub target: Option<PathBuf>,

    /// Flags to work on, all of them by default.
    #[arg(short, long = "flag", value_name = "flag")]
    pub flags: Vec<FlagToken>,

    /// Report changes without saving anything.
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

#[derive(Args, Clone, Debug)]
struct SyncOptions {
    #[command(flatten)]
    pub target: TargetOptions,

    /// Keep a flag only when both sides have it.
    #[arg(short, long)]
    pub require_both: bool,

    /// Drop sidecar names missing from the gamelist.
    #[arg(short, long)]
    pub prune: bool,
}

#[derive(Args, Clone, Debug)]
struct CleanOptions {
    #[command(flatten)]
    pub target: TargetOptions,

    /// Also transcode preview videos.
    #[arg(long)]
    pub videos: bool,
}

#[derive(Args, Clone, Debug)]
struct AddOptions {
    /// Path to the ROM file to flag.
    #[arg(required = true, value_name = "path")]
    pub path: PathBuf,

    /// Flag to set.
    #[arg(short, long, default_value_t = FlagToken::Kidgame, value_name = "flag")]
    pub flag: FlagToken,
}

#[derive(Args, Clone, Debug)]
struct UniqueOptions {
    /// Directory holding every variant.
    #[arg(required = true, value_name = "source")]
    pub source: PathBuf,

    /// Directory to link or copy chosen copies into.
    #[arg(required = true, value_name = "destination")]
    pub destination: PathBuf,

    /// What to do with chosen copies.
    #[arg(short, long, default_value_t = Action::Link, value_name = "action")]
    pub action: Action,

    /// Extension of candidate files.
    #[arg(short, long, value_name = "ext")]
    pub extension: Option<String>,

    /// Pattern of file names to skip.
    #[arg(short, long, value_name = "regex")]
    pub ignore: Option<String>,

    /// MAME listing of sets to keep.
    #[arg(short, long, value_name = "path")]
    pub whitelist: Option<PathBuf>,

    /// Category listing of sets to exclude.
    #[arg(long, value_name = "path")]
    pub catver: Option<PathBuf>,

    /// Pause on every game that cannot be decided.
    #[arg(short, long)]
    pub show_failure: bool,

    /// Actually touch the file system.
    #[arg(short, long)]
    pub run: bool,
}

#[derive(Args, Clone, Debug)]
struct RestoreOptions {
    /// Gamelist, system directory, or library to restore.
    #[arg(value_name = "target")]
    pub target: Option<PathBuf>,

    /// Restore the sidecar instead of gamelists.
    #[arg(short, long)]
    pub sidecar: bool,
}

fn main() {
    let cli = Cli::parse();

    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = cli.run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn collections(config: &Config, target: Option<PathBuf>) -> Result<Vec<Collection>> {
    let target = target.unwrap_or_else(|| config.paths.library.clone());
    Ok(discover(target)?)
}

fn run_tasks(config: Config, opts: TargetOptions, tasks: &[Task]) -> Result<()> {
    let targets = collections(&config, opts.target)?;
    let options = RunOptions {
        flags: if opts.flags.is_empty() {
            FlagToken::ALL.to_vec()
        } else {
            opts.flags
        },
        cleaning: config.cleaning,
        dry_run: opts.dry_run,
    };

    let sidecar = SidecarStore::load(&config.paths.sidecar)?;
    let mut session = Session::new(sidecar, options, FsResources, Ffmpeg::default());
    let summary = session.run_all(&targets, tasks);
    session.finish()?;

    if !summary.is_success() {
        let failed = summary
            .failures
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "{} of {} collections failed: {}",
            failed.len(),
            targets.len(),
            failed.join(", ")
        ));
    }

    Ok(())
}

fn run_sync(config: Config, opts: SyncOptions) -> Result<()> {
    let mut tasks = vec![Task::Sync(SyncPolicy::from_require_both(opts.require_both))];
    if opts.prune {
        tasks.push(Task::PruneStale);
    }
    run_tasks(config, opts.target, &tasks)
}

fn run_one_way(config: Config, opts: TargetOptions, policy: SyncPolicy) -> Result<()> {
    info!("copying flags with {policy} authoritative");
    run_tasks(config, opts, &[Task::Sync(policy)])
}

fn run_clean(config: Config, opts: CleanOptions) -> Result<()> {
    let mut tasks = vec![Task::Clean];
    if opts.videos {
        tasks.push(Task::FormatVideos);
    }
    run_tasks(config, opts.target, &tasks)
}

fn run_format_videos(config: Config, opts: TargetOptions) -> Result<()> {
    run_tasks(config, opts, &[Task::FormatVideos])
}

fn run_add(config: Config, opts: AddOptions) -> Result<()> {
    let mut sidecar = SidecarStore::load(&config.paths.sidecar)?;
    let addition = sidecar.add_resource(&opts.path, opts.flag)?;
    let (collection, name) = (&addition.collection, &addition.name);
    if !addition.added {
        info!("{collection}: `{name}` already listed as `{}`", opts.flag);
        return Ok(());
    }

    sidecar.save()?;
    info!("{collection}: added `{name}` to `{}`", opts.flag);

    Ok(())
}

fn run_unique(config: Config, opts: UniqueOptions) -> Result<()> {
    let settings = config.unique;
    let extension = opts.extension.unwrap_or(settings.extension);
    let ignore = Regex::new(&opts.ignore.unwrap_or(settings.ignore))?;

    let mut filters = Filters::default();
    if let Some(path) = opts.whitelist.or(config.paths.whitelist) {
        filters.whitelist = Some(unique::read_whitelist(path)?);
    }
    if let Some(path) = opts.catver.or(config.paths.catver) {
        let categories = unique::read_catver(path)?;
        filters.blacklist = unique::blacklist(&categories, &settings.exclude_categories);
    }

    let candidates = unique::scan(&opts.source, &extension, &ignore)?;
    let decisions = unique::plan(candidates, &config.selection, &filters);

    for decision in &decisions {
        match decision {
            Decision::Blacklisted { name } => info!("{name}: blacklisted"),
            Decision::Filtered { name } => info!("{name}: filtered"),
            Decision::Duplicate { name, error } => warn!("{name}: {error}"),
            Decision::Ambiguous {
                name,
                reason,
                candidates,
            } => {
                warn!("{name}: {reason}");
                for candidate in candidates {
                    warn!("  {:?} {:?}", candidate.identity().display(), candidate.tags());
                }

                if opts.show_failure && !Confirm::new("Continue?").with_default(true).prompt()? {
                    return Err(anyhow!("stopped at {name}"));
                }
            }
            Decision::Keep { .. } => {}
        }
    }

    let kept = unique::execute(&decisions, opts.action, &opts.destination, opts.run)?;
    info!("{kept} games kept out of {}", decisions.len());
    if !opts.run {
        info!("dry run, pass --run to {}", opts.action);
    }

    Ok(())
}

fn run_restore(config: Config, opts: RestoreOptions) -> Result<()> {
    if opts.sidecar {
        let backup = restore(&config.paths.sidecar)?;
        info!("restored sidecar from {:?}", backup.display());
        return Ok(());
    }

    for collection in collections(&config, opts.target)? {
        match restore(collection.gamelist()) {
            Ok(backup) => info!("{}: restored from {:?}", collection.name(), backup.display()),
            Err(err) => warn!("{}: {err}", collection.name()),
        }
    }

    Ok(())
}

fn run_config(config: Config) -> Result<()> {
    print!("{config}");
    Ok(())
}
