use std::path::{Path, PathBuf};
use tracing::info;

use super::EncodedFile;
use crate::config::Hook;
use crate::error::{Result, RipcordError};
use crate::process::{CommandBuilder, CommandRunner};
use crate::template::Substitutions;

/// Stand-in for `one_file` when a post_finished hook runs once for all files
pub const DISCARD_PATH: &str = "/dev/null";

/// Runs post_finished hooks and moves the tagged files into the library
pub struct Finalizer<'a> {
    hooks: &'a [Hook],
    runner: &'a dyn CommandRunner,
}

impl<'a> Finalizer<'a> {
    pub fn new(hooks: &'a [Hook], runner: &'a dyn CommandRunner) -> Self {
        Self { hooks, runner }
    }

    /// Run every hook, then copy each encoded file to its target
    pub async fn run(&self, files: &[EncodedFile]) -> Result<()> {
        self.run_hooks(files).await?;
        commit(files).await
    }

    async fn run_hooks(&self, files: &[EncodedFile]) -> Result<()> {
        let all_files: Vec<PathBuf> = files.iter().map(|f| f.temp.clone()).collect();

        for hook in self.hooks {
            let one_files: Vec<PathBuf> = if hook.is_per_file() {
                all_files.clone()
            } else {
                vec![PathBuf::from(DISCARD_PATH)]
            };

            for one_file in one_files {
                let args = Substitutions::new(&one_file)
                    .with_all_files(&all_files)
                    .expand(&hook.args)?;
                let command = CommandBuilder::templated(
                    &hook.name,
                    format!("post_finished task {}", hook.name),
                    args,
                );

                if !self.runner.run(&command).await? {
                    return Err(RipcordError::PostFinishedTaskFailed {
                        hook: hook.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Copy every encoded file to its library path, creating directories as needed.
/// Permissions and the modification time are carried over.
pub async fn commit(files: &[EncodedFile]) -> Result<()> {
    for file in files {
        if let Some(parent) = file.target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        copy_preserving_mtime(&file.temp, &file.target)
            .await
            .map_err(|source| RipcordError::Copy {
                from: file.temp.clone(),
                to: file.target.clone(),
                source,
            })?;
        info!("Copied {} to {}", file.temp.display(), file.target.display());
    }
    Ok(())
}

async fn copy_preserving_mtime(from: &Path, to: &Path) -> std::io::Result<()> {
    tokio::fs::copy(from, to).await?;
    let modified = tokio::fs::metadata(from).await?.modified()?;
    let target = tokio::fs::OpenOptions::new().write(true).open(to).await?;
    target.into_std().await.set_modified(modified)
}
