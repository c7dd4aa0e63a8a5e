use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{CommandRunner, ExternalCommand};
use crate::error::{Result, RipcordError};

/// Runs commands as child processes of this one.
///
/// Standard streams are inherited so the ripper and encoder can report
/// progress on the terminal.
#[derive(Debug, Default, Clone)]
pub struct SystemRunner {
    quiet: bool,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard the children's stdout and stderr
    pub fn quiet() -> Self {
        Self { quiet: true }
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, command: &ExternalCommand) -> Result<bool> {
        debug!("Executing command: {}", command);
        debug!("Description: {}", command.description);

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args).stdin(Stdio::null());
        if self.quiet {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }

        let status = cmd.status().await.map_err(|e| RipcordError::Spawn {
            program: command.program_name(),
            source: e,
        })?;

        if !status.success() {
            warn!("{} failed: {}", command.description, status);
        }
        Ok(status.success())
    }
}
