use std::path::PathBuf;
use thiserror::Error;

use crate::template::TemplateError;

#[derive(Error, Debug)]
pub enum RipcordError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Dependency error: {0}")]
    Dependency(String),

    #[error("Album data error: {0}")]
    Album(String),

    #[error("Argument template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Ripping track {track} failed")]
    RipFailed { track: u32 },

    #[error("post_rip task {hook} failed for track {track}")]
    PostRipTaskFailed { track: u32, hook: String },

    #[error("Failed to encode track {track}")]
    EncodeFailed { track: u32 },

    #[error("post_encode task {hook} failed for track {track}")]
    PostEncodeTaskFailed { track: u32, hook: String },

    #[error("Failed to tag track {track}: {source}")]
    TagFailed {
        track: u32,
        #[source]
        source: id3::Error,
    },

    #[error("post_finished task {hook} failed")]
    PostFinishedTaskFailed { hook: String },

    #[error("Failed to copy {} to {}: {source}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Track task did not complete: {0}")]
    TaskJoin(String),
}

impl RipcordError {
    /// Track number the failure belongs to, if it is a per-track failure.
    pub fn track(&self) -> Option<u32> {
        match self {
            RipcordError::RipFailed { track }
            | RipcordError::PostRipTaskFailed { track, .. }
            | RipcordError::EncodeFailed { track }
            | RipcordError::PostEncodeTaskFailed { track, .. }
            | RipcordError::TagFailed { track, .. } => Some(*track),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RipcordError>;
