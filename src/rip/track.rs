use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

use super::tag::{TrackTags, write_tags};
use super::{EncodedFile, TrackContext, encoded_path, rip_path, wav_path};
use crate::album::Track;
use crate::config::Hook;
use crate::error::{Result, RipcordError};
use crate::process::CommandBuilder;
use crate::template::Substitutions;

/// Phase of a single track's rip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Pending,
    Ripping,
    PostRip,
    Encoding,
    PostEncode,
    Tagging,
    Done,
    Failed,
}

impl fmt::Display for TrackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrackState::Pending => "pending",
            TrackState::Ripping => "ripping",
            TrackState::PostRip => "post_rip",
            TrackState::Encoding => "encoding",
            TrackState::PostEncode => "post_encode",
            TrackState::Tagging => "tagging",
            TrackState::Done => "done",
            TrackState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Which hook list a hook failure belongs to
#[derive(Debug, Clone, Copy)]
enum HookStage {
    PostRip,
    PostEncode,
}

/// Rips, encodes and tags one track.
///
/// Phases run strictly in order; the first failing phase moves the task to
/// `Failed` and nothing after it runs. Only the rip subprocess itself holds
/// the drive lock.
pub struct TrackTask {
    track: Track,
    ctx: TrackContext,
    state: TrackState,
    resume: bool,
}

impl TrackTask {
    /// A task that rips from scratch, or starts at encoding when `resume` is set
    pub(crate) fn new(track: Track, ctx: TrackContext, resume: bool) -> Self {
        Self {
            track,
            ctx,
            state: TrackState::Pending,
            resume,
        }
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    fn rip_path(&self) -> PathBuf {
        rip_path(self.ctx.album.ripdir(), self.track.tracknumber)
    }

    fn wav_path(&self) -> PathBuf {
        wav_path(self.ctx.album.ripdir(), self.track.tracknumber)
    }

    fn encoded_path(&self) -> PathBuf {
        encoded_path(self.ctx.album.ripdir(), &self.track)
    }

    /// Drive the task to `Done` or `Failed`
    pub async fn run(mut self) -> Result<()> {
        while self.state != TrackState::Done {
            match self.advance().await {
                Ok(next) => {
                    debug!(
                        "Track {}: {} -> {}",
                        self.track.tracknumber, self.state, next
                    );
                    self.state = next;
                }
                Err(e) => {
                    debug!(
                        "Track {}: {} -> {}",
                        self.track.tracknumber,
                        self.state,
                        TrackState::Failed
                    );
                    self.state = TrackState::Failed;
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Perform the work of the current state and return the next one
    async fn advance(&mut self) -> Result<TrackState> {
        let next = match self.state {
            TrackState::Pending if self.resume => {
                info!(
                    "Track {} was already ripped, continuing from encoding",
                    self.track.tracknumber
                );
                TrackState::Encoding
            }
            TrackState::Pending => TrackState::Ripping,
            TrackState::Ripping => {
                self.rip().await?;
                TrackState::PostRip
            }
            TrackState::PostRip => {
                self.post_rip().await?;
                TrackState::Encoding
            }
            TrackState::Encoding => {
                self.encode().await?;
                TrackState::PostEncode
            }
            TrackState::PostEncode => {
                let encoded = self.encoded_path();
                self.run_hooks(HookStage::PostEncode, &self.ctx.config.post_encode, &encoded)
                    .await?;
                TrackState::Tagging
            }
            TrackState::Tagging => {
                self.tag().await?;
                TrackState::Done
            }
            TrackState::Done | TrackState::Failed => self.state,
        };
        Ok(next)
    }

    async fn rip(&self) -> Result<()> {
        let tracknumber = self.track.tracknumber;
        let output = self.rip_path();
        let command = CommandBuilder::rip_track(&self.ctx.deps.ripper, tracknumber, &output);

        let ok = {
            let _drive = self.ctx.drive.lock().await;
            debug!("Track {}: acquired drive", tracknumber);
            self.ctx.runner.run(&command).await?
        };
        debug!("Track {}: released drive", tracknumber);

        if !ok {
            return Err(RipcordError::RipFailed { track: tracknumber });
        }
        info!("Ripped track {}", tracknumber);
        Ok(())
    }

    /// Run post_rip hooks on the raw rip, then mark the rip complete
    async fn post_rip(&self) -> Result<()> {
        let raw = self.rip_path();
        self.run_hooks(HookStage::PostRip, &self.ctx.config.post_rip, &raw)
            .await?;

        tokio::fs::rename(&raw, self.wav_path()).await?;
        Ok(())
    }

    async fn encode(&self) -> Result<()> {
        let tracknumber = self.track.tracknumber;
        let encoded = self.encoded_path();
        let args = Substitutions::new(self.wav_path())
            .with_out_file(&encoded)
            .expand(&self.ctx.config.encoder.args)?;
        let command = CommandBuilder::templated(
            &self.ctx.deps.encoder,
            format!("Encode track {}", tracknumber),
            args,
        );

        if !self.ctx.runner.run(&command).await? {
            return Err(RipcordError::EncodeFailed { track: tracknumber });
        }
        info!("Encoded track {}", tracknumber);
        Ok(())
    }

    /// Run hooks one after another on `file`, stopping at the first failure
    async fn run_hooks(&self, stage: HookStage, hooks: &[Hook], file: &std::path::Path) -> Result<()> {
        let tracknumber = self.track.tracknumber;
        for hook in hooks {
            let args = Substitutions::new(file).expand(&hook.args)?;
            let label = match stage {
                HookStage::PostRip => "post_rip",
                HookStage::PostEncode => "post_encode",
            };
            let command = CommandBuilder::templated(
                &hook.name,
                format!("{} task {} for track {}", label, hook.name, tracknumber),
                args,
            );

            if !self.ctx.runner.run(&command).await? {
                let hook = hook.name.clone();
                return Err(match stage {
                    HookStage::PostRip => RipcordError::PostRipTaskFailed { track: tracknumber, hook },
                    HookStage::PostEncode => RipcordError::PostEncodeTaskFailed { track: tracknumber, hook },
                });
            }
        }
        Ok(())
    }

    async fn tag(&self) -> Result<()> {
        let album = &self.ctx.album;
        let tracknumber = self.track.tracknumber;
        let encoded = self.encoded_path();

        let albumartist = (album.is_multiartist() || self.ctx.config.always_tag_albumartist)
            .then(|| album.albumartist());
        let tags = TrackTags {
            artist: &self.track.artist,
            album: album.title(),
            title: &self.track.title,
            tracknumber,
            date: album.date(),
            albumartist,
        };

        write_tags(&encoded, &tags).map_err(|source| RipcordError::TagFailed {
            track: tracknumber,
            source,
        })?;
        info!("Tagged {}", self.track.filename.display());

        self.ctx
            .encoded
            .insert(EncodedFile {
                tracknumber,
                temp: encoded,
                target: self.track.filename.clone(),
            })
            .await;

        if let Some(progress) = &self.ctx.progress {
            progress.inc(1);
            progress.set_message(self.track.title.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::album::Album;
    use crate::config::Config;
    use crate::process::MockCommandRunner;
    use crate::rip::EncodedFiles;
    use crate::rip::testing::{self, FakeRunner};
    use id3::TagLike;
    use std::sync::Arc;

    fn context(root: &std::path::Path, config: Arc<Config>, runner: Arc<dyn crate::process::CommandRunner>) -> TrackContext {
        TrackContext {
            album: testing::album(root, 2),
            deps: testing::deps(),
            config,
            runner,
            drive: Default::default(),
            encoded: EncodedFiles::default(),
            progress: None,
        }
    }

    #[tokio::test]
    async fn test_full_track_produces_tagged_file() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner::new());
        let ctx = context(dir.path(), testing::config(), runner.clone());
        let track = ctx.album.tracks()[0].clone();
        let ripdir = ctx.album.ripdir().to_path_buf();
        let encoded = ctx.encoded.clone();

        TrackTask::new(track.clone(), ctx, false).run().await.unwrap();

        assert_eq!(runner.descriptions(), vec!["Rip track 1", "Encode track 1"]);
        assert!(ripdir.join("1.wav").is_file());
        assert!(!ripdir.join("1.wav.rip").exists());

        let files = encoded.snapshot().await;
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].temp, ripdir.join("1.mp3"));
        assert_eq!(files[0].target, track.filename);

        let tag = id3::Tag::read_from_path(ripdir.join("1.mp3")).unwrap();
        assert_eq!(tag.title(), Some("Song 1"));
        assert_eq!(tag.album_artist(), None);
    }

    #[tokio::test]
    async fn test_encoder_gets_wav_and_encoded_paths() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner::new());
        let ctx = context(dir.path(), testing::config(), runner.clone());
        let track = ctx.album.tracks()[1].clone();
        let ripdir = ctx.album.ripdir().to_path_buf();

        TrackTask::new(track, ctx, false).run().await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls[0].program, PathBuf::from("ripper"));
        assert_eq!(calls[0].args[2], ripdir.join("2.wav.rip").into_os_string());
        assert_eq!(calls[1].program, PathBuf::from("encoder"));
        assert_eq!(calls[1].args[0], ripdir.join("2.wav").into_os_string());
        assert_eq!(calls[1].args[1], ripdir.join("2.mp3").into_os_string());
    }

    #[tokio::test]
    async fn test_hooks_run_in_order_on_phase_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = (*testing::config()).clone();
        config.post_rip = vec![Hook::new("normalize", &["${one_file}"]), Hook::new("check", &["-q", "$one_file"])];
        config.post_encode = vec![Hook::new("mp3gain", &["${one_file}"])];
        let runner = Arc::new(FakeRunner::new());
        let ctx = context(dir.path(), Arc::new(config), runner.clone());
        let track = ctx.album.tracks()[0].clone();
        let ripdir = ctx.album.ripdir().to_path_buf();

        TrackTask::new(track, ctx, false).run().await.unwrap();

        assert_eq!(
            runner.descriptions(),
            vec![
                "Rip track 1",
                "post_rip task normalize for track 1",
                "post_rip task check for track 1",
                "Encode track 1",
                "post_encode task mp3gain for track 1",
            ]
        );
        let calls = runner.calls();
        assert_eq!(calls[1].args[0], ripdir.join("1.wav.rip").into_os_string());
        assert_eq!(calls[2].args[1], ripdir.join("1.wav.rip").into_os_string());
        assert_eq!(calls[4].args[0], ripdir.join("1.mp3").into_os_string());
    }

    #[tokio::test]
    async fn test_post_rip_failure_keeps_raw_rip() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = (*testing::config()).clone();
        config.post_rip = vec![Hook::new("verify", &["${one_file}"]), Hook::new("never", &[])];
        let runner = Arc::new(FakeRunner::new().failing("post_rip task verify for track 1"));
        let ctx = context(dir.path(), Arc::new(config), runner.clone());
        let track = ctx.album.tracks()[0].clone();
        let ripdir = ctx.album.ripdir().to_path_buf();

        let err = TrackTask::new(track, ctx, false).run().await.unwrap_err();

        assert!(matches!(
            err,
            RipcordError::PostRipTaskFailed { track: 1, ref hook } if hook == "verify"
        ));
        assert!(ripdir.join("1.wav.rip").is_file());
        assert!(!ripdir.join("1.wav").exists());
        assert_eq!(runner.count("Encode"), 0);
        assert_eq!(runner.count("post_rip task never"), 0);
    }

    #[tokio::test]
    async fn test_post_encode_failure_skips_tagging() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = (*testing::config()).clone();
        config.post_encode = vec![Hook::new("mp3gain", &["${one_file}"])];
        let runner = Arc::new(FakeRunner::new().failing("post_encode task mp3gain for track 2"));
        let ctx = context(dir.path(), Arc::new(config), runner);
        let track = ctx.album.tracks()[1].clone();
        let encoded = ctx.encoded.clone();

        let err = TrackTask::new(track, ctx, false).run().await.unwrap_err();

        assert!(matches!(err, RipcordError::PostEncodeTaskFailed { track: 2, .. }));
        assert!(encoded.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_rip_failure_stops_track() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|cmd| cmd.description == "Rip track 1")
            .times(1)
            .returning(|_| Ok(false));
        let ctx = context(dir.path(), testing::config(), Arc::new(runner));
        let track = ctx.album.tracks()[0].clone();

        let err = TrackTask::new(track, ctx, false).run().await.unwrap_err();
        assert!(matches!(err, RipcordError::RipFailed { track: 1 }));
        assert_eq!(err.track(), Some(1));
    }

    #[tokio::test]
    async fn test_resume_starts_at_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|cmd| cmd.description == "Encode track 1")
            .times(1)
            .returning(|_| Ok(false));
        let ctx = context(dir.path(), testing::config(), Arc::new(runner));
        let track = ctx.album.tracks()[0].clone();

        let task = TrackTask::new(track, ctx, true);
        assert_eq!(task.state(), TrackState::Pending);
        let err = task.run().await.unwrap_err();
        assert!(matches!(err, RipcordError::EncodeFailed { track: 1 }));
    }

    #[tokio::test]
    async fn test_bad_template_fails_before_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = (*testing::config()).clone();
        config.encoder.args = vec!["${all_files}".to_string()];
        let runner = Arc::new(FakeRunner::new());
        let ctx = context(dir.path(), Arc::new(config), runner.clone());
        let track = ctx.album.tracks()[0].clone();

        let err = TrackTask::new(track, ctx, true).run().await.unwrap_err();
        assert!(matches!(err, RipcordError::Template(_)));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_multiartist_album_tags_albumartist() {
        let dir = tempfile::tempdir().unwrap();
        let ripdir = dir.path().join("rip");
        std::fs::create_dir_all(&ripdir).unwrap();
        let tracks = vec![testing::track(&ripdir, 1, "Artist"), testing::track(&ripdir, 2, "Guest")];
        let album = Album::new("Album", "Artist", "1999", &ripdir, tracks).unwrap();
        assert!(album.is_multiartist());

        let mut ctx = context(dir.path(), testing::config(), Arc::new(FakeRunner::new()));
        assert!(!ctx.config.always_tag_albumartist);
        ctx.album = Arc::new(album);

        for track in ctx.album.tracks().to_vec() {
            TrackTask::new(track, ctx.clone(), false).run().await.unwrap();
        }

        for n in [1, 2] {
            let tag = id3::Tag::read_from_path(ripdir.join(format!("{}.mp3", n))).unwrap();
            assert_eq!(tag.album_artist(), Some("Artist"));
        }
        let guest = id3::Tag::read_from_path(ripdir.join("2.mp3")).unwrap();
        assert_eq!(guest.artist(), Some("Guest"));
    }

    #[tokio::test]
    async fn test_always_tag_albumartist() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = (*testing::config()).clone();
        config.always_tag_albumartist = true;
        let ctx = context(dir.path(), Arc::new(config), Arc::new(FakeRunner::new()));
        let track = ctx.album.tracks()[0].clone();
        let ripdir = ctx.album.ripdir().to_path_buf();

        TrackTask::new(track, ctx, false).run().await.unwrap();

        let tag = id3::Tag::read_from_path(ripdir.join("1.mp3")).unwrap();
        assert_eq!(tag.album_artist(), Some("Artist"));
    }
}
