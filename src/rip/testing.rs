use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::album::{Album, Track};
use crate::config::{Config, EncoderConfig};
use crate::dependency::Dependencies;
use crate::error::Result;
use crate::process::{CommandRunner, ExternalCommand};

/// Runner that records commands instead of spawning them.
///
/// Rips and encodes write their output file (the last argument) so the
/// on-disk layout matches a real run. Commands whose description is listed
/// in `failing` exit non-zero.
#[derive(Default)]
pub struct FakeRunner {
    calls: Mutex<Vec<ExternalCommand>>,
    failing: Vec<String>,
    rip_delay: Duration,
    active_rips: AtomicUsize,
    max_active_rips: AtomicUsize,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, description: &str) -> Self {
        self.failing.push(description.to_string());
        self
    }

    pub fn with_rip_delay(mut self, delay: Duration) -> Self {
        self.rip_delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<ExternalCommand> {
        self.calls.lock().unwrap().clone()
    }

    pub fn descriptions(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.description).collect()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.descriptions().iter().filter(|d| d.starts_with(prefix)).count()
    }

    pub fn max_active_rips(&self) -> usize {
        self.max_active_rips.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, command: &ExternalCommand) -> Result<bool> {
        self.calls.lock().unwrap().push(command.clone());

        let is_rip = command.description.starts_with("Rip track");
        let is_encode = command.description.starts_with("Encode track");

        if is_rip {
            let active = self.active_rips.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active_rips.fetch_max(active, Ordering::SeqCst);
            tokio::time::sleep(self.rip_delay).await;
        } else {
            tokio::task::yield_now().await;
        }

        let ok = !self.failing.contains(&command.description);
        if ok && (is_rip || is_encode) {
            let output = PathBuf::from(command.args.last().unwrap().clone());
            tokio::fs::write(&output, b"fake audio data").await?;
        }

        if is_rip {
            self.active_rips.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(ok)
    }
}

pub fn track(ripdir: &Path, n: u32, artist: &str) -> Track {
    Track {
        tracknumber: n,
        title: format!("Song {}", n),
        artist: artist.to_string(),
        filename: ripdir
            .parent()
            .unwrap()
            .join("library")
            .join(format!("{:02} - Song {}.mp3", n, n)),
    }
}

/// Album of `count` tracks by one artist with its ripdir under `root`
pub fn album(root: &Path, count: u32) -> Arc<Album> {
    let ripdir = root.join("rip");
    std::fs::create_dir_all(&ripdir).unwrap();
    let tracks = (1..=count).map(|n| track(&ripdir, n, "Artist")).collect();
    Arc::new(Album::new("Album", "Artist", "1999", ripdir, tracks).unwrap())
}

pub fn config() -> Arc<Config> {
    Arc::new(Config {
        encoder: EncoderConfig {
            name: "encoder".to_string(),
            args: vec!["${one_file}".to_string(), "${out_file}".to_string()],
        },
        ..Config::default()
    })
}

pub fn deps() -> Arc<Dependencies> {
    Arc::new(Dependencies::new("ripper", "encoder"))
}
