use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Result, RipcordError};
use crate::template::{self, ALL_FILES, ONE_FILE, OUT_FILE};

fn default_editor() -> String {
    std::env::var("EDITOR").unwrap_or_else(|_| "vim".to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Ripper executable name or path (invoked as `<ripper> -- <n> <file>`)
    pub ripper: String,
    /// Tag the album artist even on single-artist albums
    pub always_tag_albumartist: bool,
    /// Keep the rip directory after a successful rip
    pub keep_ripdir: bool,
    /// On `--continue`, use the album data stored in the rip directory
    pub reuse_albumdata: bool,
    /// Editor used for album data editing
    #[serde(default = "default_editor")]
    pub editor: String,
    /// Encoder executable and its argument template
    pub encoder: EncoderConfig,
    /// Hooks run on each raw rip, before it is marked complete
    pub post_rip: Vec<Hook>,
    /// Hooks run on each encoded file, before tagging
    pub post_encode: Vec<Hook>,
    /// Hooks run once after every selected track is tagged
    pub post_finished: Vec<Hook>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EncoderConfig {
    /// Encoder executable name or path
    pub name: String,
    /// Argument template; `${one_file}` is the wav input, `${out_file}` the output
    pub args: Vec<String>,
}

/// An external command run at a fixed point of the pipeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Hook {
    /// Executable name or path
    pub name: String,
    /// Argument template
    #[serde(default)]
    pub args: Vec<String>,
    /// How post_finished hooks are invoked; ignored elsewhere
    #[serde(default)]
    pub mode: HookMode,
}

impl Hook {
    pub fn new<S: Into<String>>(name: S, args: &[&str]) -> Self {
        Self {
            name: name.into(),
            args: args.iter().map(|s| s.to_string()).collect(),
            mode: HookMode::Auto,
        }
    }

    pub fn with_mode(mut self, mode: HookMode) -> Self {
        self.mode = mode;
        self
    }

    /// Whether a post_finished hook runs once per encoded file
    pub fn is_per_file(&self) -> bool {
        match self.mode {
            HookMode::PerFile => true,
            HookMode::Once => false,
            HookMode::Auto => template::references(&self.args, ONE_FILE),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum HookMode {
    /// Per-file if the arguments mention `one_file`, otherwise once
    #[default]
    Auto,
    /// Once for every encoded file
    PerFile,
    /// A single time for the whole album
    Once,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ripper: "cdparanoia".to_string(),
            always_tag_albumartist: false,
            keep_ripdir: false,
            reuse_albumdata: true,
            editor: default_editor(),
            encoder: EncoderConfig {
                name: "lame".to_string(),
                args: vec![
                    "-V2".to_string(),
                    "${one_file}".to_string(),
                    "${out_file}".to_string(),
                ],
            },
            post_rip: Vec::new(),
            post_encode: Vec::new(),
            post_finished: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RipcordError::Config(format!("Failed to read config file: {}", e)))?;

        Ok(toml::from_str(&content)?)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| RipcordError::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)
            .map_err(|e| RipcordError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Default location: `<config dir>/ripcord/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ripcord").join("config.toml"))
    }

    /// Load from an explicit path, else the default location, else defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            info!("Loading configuration from {}", path.display());
            return Self::from_file(path);
        }

        match Self::default_path() {
            Some(path) if path.is_file() => {
                info!("Found configuration at {}, loading...", path.display());
                Self::from_file(path)
            }
            _ => {
                debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Check every argument template against the placeholders of its stage
    pub fn validate(&self) -> Result<()> {
        let stage_error = |stage: &str, name: &str, e: template::TemplateError| {
            RipcordError::Config(format!("{} {}: {}", stage, name, e))
        };

        if self.ripper.trim().is_empty() {
            return Err(RipcordError::Config("ripper must not be empty".to_string()));
        }
        if self.encoder.name.trim().is_empty() {
            return Err(RipcordError::Config("encoder name must not be empty".to_string()));
        }

        template::check(&self.encoder.args, &[ONE_FILE, OUT_FILE])
            .map_err(|e| stage_error("encoder", &self.encoder.name, e))?;

        for (stage, hooks) in [("post_rip", &self.post_rip), ("post_encode", &self.post_encode)] {
            for hook in hooks {
                template::check(&hook.args, &[ONE_FILE])
                    .map_err(|e| stage_error(stage, &hook.name, e))?;
            }
        }
        for hook in &self.post_finished {
            template::check(&hook.args, &[ONE_FILE, ALL_FILES])
                .map_err(|e| stage_error("post_finished", &hook.name, e))?;
        }

        Ok(())
    }
}
