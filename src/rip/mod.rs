// Rip pipeline
//
// One TrackTask per selected track runs concurrently; the drive lock makes
// the rip subprocesses take turns while encoding and tagging overlap freely.
// After every task has settled, Finalizer runs post_finished hooks and copies
// the tagged files into the library, but only if no track failed.
//
// Files kept in the rip directory per track:
// - <n>.wav.rip  rip in progress (or failed rip / failed post_rip hook)
// - <n>.wav      rip and post_rip hooks done; marker for --continue
// - <n><ext>     encoded and tagged file awaiting the copy

pub mod finish;
pub mod tag;
pub mod track;

#[cfg(test)]
pub(crate) mod testing;

use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

pub use finish::Finalizer;
pub use track::{TrackState, TrackTask};

use crate::album::{Album, Track};
use crate::config::Config;
use crate::dependency::Dependencies;
use crate::error::{Result, RipcordError};
use crate::process::{CommandRunner, CommandRunnerFactory};

/// Path of a rip in progress: `<ripdir>/<n>.wav.rip`
pub fn rip_path(ripdir: &Path, tracknumber: u32) -> PathBuf {
    ripdir.join(format!("{}.wav.rip", tracknumber))
}

/// Path of a completed rip: `<ripdir>/<n>.wav`
pub fn wav_path(ripdir: &Path, tracknumber: u32) -> PathBuf {
    ripdir.join(format!("{}.wav", tracknumber))
}

/// Path of the encoded file: `<ripdir>/<n><ext of target>`
pub fn encoded_path(ripdir: &Path, track: &Track) -> PathBuf {
    ripdir.join(format!("{}{}", track.tracknumber, track.extension()))
}

/// A tagged file waiting to be copied into the library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFile {
    pub tracknumber: u32,
    pub temp: PathBuf,
    pub target: PathBuf,
}

/// Encoded files collected from concurrently running track tasks
#[derive(Debug, Clone, Default)]
pub struct EncodedFiles {
    inner: Arc<Mutex<Vec<EncodedFile>>>,
}

impl EncodedFiles {
    pub async fn insert(&self, file: EncodedFile) {
        self.inner.lock().await.push(file);
    }

    /// All entries, ordered by track number
    pub async fn snapshot(&self) -> Vec<EncodedFile> {
        let mut files = self.inner.lock().await.clone();
        files.sort_by_key(|f| f.tracknumber);
        files
    }
}

/// Which tracks to rip, and whether completed rips are reused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackSelection {
    pub begin_track: u32,
    pub end_track: u32,
    pub continue_rip: bool,
}

impl TrackSelection {
    /// Validate `begin..=end` against the album's track count
    pub fn new(begin_track: u32, end_track: u32, continue_rip: bool, track_count: u32) -> Result<Self> {
        if begin_track < 1 || begin_track > end_track || end_track > track_count {
            return Err(RipcordError::Config(format!(
                "Invalid track range {}-{} for an album of {} tracks",
                begin_track, end_track, track_count
            )));
        }
        Ok(Self {
            begin_track,
            end_track,
            continue_rip,
        })
    }

    /// Every track of `album`
    pub fn all(album: &Album, continue_rip: bool) -> Self {
        Self {
            begin_track: 1,
            end_track: album.track_count(),
            continue_rip,
        }
    }

    pub fn contains(&self, tracknumber: u32) -> bool {
        (self.begin_track..=self.end_track).contains(&tracknumber)
    }
}

/// Everything a track task shares with its siblings
#[derive(Clone)]
pub(crate) struct TrackContext {
    pub album: Arc<Album>,
    pub deps: Arc<Dependencies>,
    pub config: Arc<Config>,
    pub runner: Arc<dyn CommandRunner>,
    /// Held only while the ripper runs
    pub drive: Arc<Mutex<()>>,
    pub encoded: EncodedFiles,
    pub progress: Option<ProgressBar>,
}

/// Rips, encodes and tags a selection of an album's tracks
pub struct Pipeline {
    album: Arc<Album>,
    deps: Arc<Dependencies>,
    config: Arc<Config>,
    runner: Arc<dyn CommandRunner>,
    drive: Arc<Mutex<()>>,
    progress: Option<ProgressBar>,
}

impl Pipeline {
    pub fn new(album: Arc<Album>, deps: Arc<Dependencies>, config: Arc<Config>) -> Self {
        Self {
            album,
            deps,
            config,
            runner: CommandRunnerFactory::create_runner(),
            drive: Arc::new(Mutex::new(())),
            progress: None,
        }
    }

    /// Use `runner` to start subprocesses
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Tick `progress` once for every finished track
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Run the pipeline over `selection`.
    ///
    /// Every started track task is awaited even after a failure. The first
    /// failure observed is returned and finalization is skipped; otherwise
    /// post_finished hooks run and the files are copied to their targets.
    pub async fn run(&self, selection: TrackSelection) -> Result<()> {
        let encoded = EncodedFiles::default();
        let ctx = TrackContext {
            album: self.album.clone(),
            deps: self.deps.clone(),
            config: self.config.clone(),
            runner: self.runner.clone(),
            drive: self.drive.clone(),
            encoded: encoded.clone(),
            progress: self.progress.clone(),
        };

        let ripdir = self.album.ripdir();
        let mut tasks = JoinSet::new();
        for track in self.album.tracks() {
            if !selection.contains(track.tracknumber) {
                continue;
            }
            let resume = selection.continue_rip && wav_path(ripdir, track.tracknumber).is_file();
            let task = TrackTask::new(track.clone(), ctx.clone(), resume);
            tasks.spawn(task.run());
        }

        info!(
            "Started {} track tasks for tracks {}-{}",
            tasks.len(),
            selection.begin_track,
            selection.end_track
        );
        if let Some(progress) = &self.progress {
            progress.set_length(tasks.len() as u64);
        }

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined
                .map_err(|e| RipcordError::TaskJoin(e.to_string()))
                .and_then(|result| result);
            if let Err(e) = outcome {
                error!("{}", e);
                first_error.get_or_insert(e);
            }
        }

        if let Some(e) = first_error {
            warn!("Rip failed, not running post_finished tasks or copying files");
            return Err(e);
        }

        let files = encoded.snapshot().await;
        Finalizer::new(&self.config.post_finished, self.runner.as_ref())
            .run(&files)
            .await?;

        if let Some(progress) = &self.progress {
            progress.finish_with_message("done");
        }
        info!("Ripped {} tracks of {}", files.len(), self.album.title());
        Ok(())
    }
}
