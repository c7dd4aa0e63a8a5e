//! Album descriptor handed to the rip pipeline.
//!
//! The descriptor is produced by metadata lookup/editing, which lives outside
//! this crate; here it is only validated, stored and loaded as JSON.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, RipcordError};

/// One track of the album
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub tracknumber: u32,
    pub title: String,
    pub artist: String,
    /// Absolute, sanitized target path in the music library
    pub filename: PathBuf,
}

impl Track {
    /// Extension of the target filename including the dot, or "" if none
    pub fn extension(&self) -> String {
        self.filename
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct Album {
    title: String,
    albumartist: String,
    date: String,
    multiartist: bool,
    tracks: Vec<Track>,
    ripdir: PathBuf,
}

/// On-disk form of a track; numbers come from the position in the list
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TrackData {
    title: String,
    artist: String,
    filename: PathBuf,
}

/// On-disk form of an album descriptor
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AlbumData {
    title: String,
    albumartist: String,
    #[serde(default)]
    date: String,
    ripdir: PathBuf,
    tracks: Vec<TrackData>,
}

impl Album {
    /// Build a descriptor, checking that track numbers run densely from 1
    pub fn new(
        title: impl Into<String>,
        albumartist: impl Into<String>,
        date: impl Into<String>,
        ripdir: impl Into<PathBuf>,
        tracks: Vec<Track>,
    ) -> Result<Self> {
        if tracks.is_empty() {
            return Err(RipcordError::Album("album has no tracks".to_string()));
        }
        for (index, track) in tracks.iter().enumerate() {
            let expected = index as u32 + 1;
            if track.tracknumber != expected {
                return Err(RipcordError::Album(format!(
                    "track {} found where track {} was expected",
                    track.tracknumber, expected
                )));
            }
            if !track.filename.is_absolute() {
                return Err(RipcordError::Album(format!(
                    "target filename of track {} is not absolute: {}",
                    track.tracknumber,
                    track.filename.display()
                )));
            }
        }

        let albumartist = albumartist.into();
        let multiartist = tracks.iter().any(|t| t.artist != albumartist);

        Ok(Self {
            title: title.into(),
            albumartist,
            date: date.into(),
            multiartist,
            tracks,
            ripdir: ripdir.into(),
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            RipcordError::Album(format!(
                "Failed to read album data {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let data: AlbumData = serde_json::from_str(&content)?;

        let tracks = data
            .tracks
            .into_iter()
            .enumerate()
            .map(|(index, t)| Track {
                tracknumber: index as u32 + 1,
                title: t.title,
                artist: t.artist,
                filename: t.filename,
            })
            .collect();

        Self::new(data.title, data.albumartist, data.date, data.ripdir, tracks)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let data = AlbumData {
            title: self.title.clone(),
            albumartist: self.albumartist.clone(),
            date: self.date.clone(),
            ripdir: self.ripdir.clone(),
            tracks: self
                .tracks
                .iter()
                .map(|t| TrackData {
                    title: t.title.clone(),
                    artist: t.artist.clone(),
                    filename: t.filename.clone(),
                })
                .collect(),
        };
        std::fs::write(path, serde_json::to_string_pretty(&data)?)?;
        Ok(())
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn albumartist(&self) -> &str {
        &self.albumartist
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    /// True when at least one track artist differs from the album artist
    pub fn is_multiartist(&self) -> bool {
        self.multiartist
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track_count(&self) -> u32 {
        self.tracks.len() as u32
    }

    pub fn ripdir(&self) -> &Path {
        &self.ripdir
    }
}
