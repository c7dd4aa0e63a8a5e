use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::album::Album;
use crate::config::Config;
use crate::dependency::Dependencies;
use crate::error::{Result, RipcordError};
use crate::process::{CommandRunner, CommandRunnerFactory};
use crate::rip::{Pipeline, TrackSelection};

/// Name of the album descriptor stored inside the rip directory
pub const ALBUMDATA_FILE: &str = "albumdata.json";

/// One rip of one album: prepares the rip directory, runs the pipeline and
/// cleans up after a successful run
pub struct RipSession {
    config: Arc<Config>,
    deps: Arc<Dependencies>,
    runner: Arc<dyn CommandRunner>,
    show_progress: bool,
}

impl RipSession {
    pub fn new(config: Config, deps: Dependencies) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config: Arc::new(config),
            deps: Arc::new(deps),
            runner: CommandRunnerFactory::create_runner(),
            show_progress: false,
        })
    }

    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Rip `selection` of `album` into the library
    pub async fn rip(&self, album: Album, selection: TrackSelection) -> Result<()> {
        let album = Arc::new(self.stored_album(album, &selection)?);
        let ripdir = album.ripdir().to_path_buf();
        info!(
            "Starting rip of tracks {}-{} of {} by {}",
            selection.begin_track,
            selection.end_track,
            album.title(),
            album.albumartist()
        );
        if album.is_multiartist() {
            info!("Album is multi-artist, tagging album artist");
        }

        prepare_ripdir(&ripdir)?;
        album.save_to_file(ripdir.join(ALBUMDATA_FILE))?;

        let mut pipeline = Pipeline::new(album.clone(), self.deps.clone(), self.config.clone())
            .with_runner(self.runner.clone());
        if self.show_progress {
            pipeline = pipeline.with_progress(progress_bar());
        }

        if let Err(e) = pipeline.run(selection).await {
            warn!("Keeping rip directory {} for --continue", ripdir.display());
            return Err(e);
        }

        if self.config.keep_ripdir {
            info!("Rip finished, rip directory kept at {}", ripdir.display());
        } else {
            let removed = clean_ripdir(&album, &selection)?;
            info!("Rip finished, removed {} files from rip directory", removed);
        }
        Ok(())
    }

    /// On `--continue`, prefer the album data stored by the interrupted run
    fn stored_album(&self, album: Album, selection: &TrackSelection) -> Result<Album> {
        let stored = album.ripdir().join(ALBUMDATA_FILE);
        if !(selection.continue_rip && self.config.reuse_albumdata && stored.is_file()) {
            return Ok(album);
        }

        let previous = Album::from_file(&stored)?;
        if previous.track_count() != album.track_count() {
            warn!(
                "Ignoring {}: it has {} tracks, expected {}",
                stored.display(),
                previous.track_count(),
                album.track_count()
            );
            return Ok(album);
        }
        info!("Reusing album data from {}", stored.display());
        Ok(previous)
    }
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// Create the rip directory, readable only by the current user
pub fn prepare_ripdir(ripdir: &Path) -> Result<()> {
    if ripdir.is_dir() {
        debug!("Reusing rip directory {}", ripdir.display());
        return Ok(());
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        std::fs::DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(ripdir)?;
    }
    #[cfg(not(unix))]
    std::fs::create_dir_all(ripdir)?;

    info!("Created rip directory {}", ripdir.display());
    Ok(())
}

/// Remove the files of the selected tracks from the rip directory, and the
/// directory itself if nothing else is left in it. Completed rips of other
/// tracks stay for a later `--continue`, and so does the album data unless
/// the whole album was selected. Returns the number of files removed.
pub fn clean_ripdir(album: &Album, selection: &TrackSelection) -> Result<usize> {
    let ripdir = album.ripdir();
    let whole_album = selection.begin_track == 1 && selection.end_track == album.track_count();
    let artifact = |name: &str| {
        (whole_album && name == ALBUMDATA_FILE)
            || album
                .tracks()
                .iter()
                .filter(|t| selection.contains(t.tracknumber))
                .any(|t| {
                    let n = t.tracknumber;
                    name == format!("{}.wav", n) || name == format!("{}{}", n, t.extension())
                })
    };

    let mut removed = 0;
    for entry in WalkDir::new(ripdir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| RipcordError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if artifact(&entry.file_name().to_string_lossy()) {
            std::fs::remove_file(entry.path())?;
            removed += 1;
        }
    }

    match std::fs::remove_dir(ripdir) {
        Ok(()) => debug!("Removed rip directory {}", ripdir.display()),
        Err(e) => warn!("Rip directory {} not removed: {}", ripdir.display(), e),
    }
    Ok(removed)
}
