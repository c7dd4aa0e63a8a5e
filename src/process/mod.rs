// External process execution
//
// Every subprocess the pipeline starts (ripper, encoder, hooks) goes through
// the CommandRunner trait:
// - Command: argument list builder with a human-readable description
// - Runner: tokio-based implementation that reports success by exit code

pub mod command;
pub mod runner;

use async_trait::async_trait;

pub use command::*;
pub use runner::*;

use crate::error::Result;

/// Runs external commands to completion
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the command and wait for it to exit.
    ///
    /// Returns `Ok(true)` on a zero exit status and `Ok(false)` otherwise.
    /// An error means the process could not be started at all.
    async fn run(&self, command: &ExternalCommand) -> Result<bool>;
}

/// Factory for creating command runner instances
pub struct CommandRunnerFactory;

impl CommandRunnerFactory {
    /// Create the default runner, which spawns real processes
    pub fn create_runner() -> std::sync::Arc<dyn CommandRunner> {
        std::sync::Arc::new(SystemRunner::new())
    }
}
