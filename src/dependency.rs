use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Result, RipcordError};

/// Resolved paths of the external programs the rip needs
#[derive(Debug, Clone)]
pub struct Dependencies {
    pub ripper: PathBuf,
    pub encoder: PathBuf,
    pub editor: Option<PathBuf>,
}

impl Dependencies {
    /// Use already resolved paths as-is
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(ripper: P, encoder: Q) -> Self {
        Self {
            ripper: ripper.into(),
            encoder: encoder.into(),
            editor: None,
        }
    }

    /// Find the ripper, encoder and editor named in the configuration
    pub fn discover(config: &Config) -> Result<Self> {
        let ripper = find_executable(&config.ripper)?;
        let encoder = find_executable(&config.encoder.name)?;
        let editor = match find_executable(&config.editor) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("{}", e);
                None
            }
        };

        info!("Using ripper {}", ripper.display());
        info!("Using encoder {}", encoder.display());

        Ok(Self {
            ripper,
            encoder,
            editor,
        })
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Locate an executable by path or by searching `PATH`
pub fn find_executable(name: &str) -> Result<PathBuf> {
    let not_found = || RipcordError::Dependency(format!("Executable {} not found or not executable", name));

    if name.is_empty() {
        return Err(not_found());
    }

    let direct = Path::new(name);
    if direct.components().count() > 1 || direct.is_absolute() {
        return if is_executable(direct) {
            Ok(direct.to_path_buf())
        } else {
            Err(not_found())
        };
    }

    let path_var = std::env::var_os("PATH").unwrap_or_default();
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
        .ok_or_else(not_found)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn test_find_executable_by_path() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("ripper");
        std::fs::write(&script, "#!/bin/sh\n").unwrap();

        // Not executable yet
        assert!(find_executable(script.to_str().unwrap()).is_err());

        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(find_executable(script.to_str().unwrap()).unwrap(), script);
    }

    #[test]
    fn test_find_executable_on_path() {
        assert!(find_executable("sh").is_ok());
        assert!(matches!(
            find_executable("ripcord-no-such-program"),
            Err(RipcordError::Dependency(_))
        ));
    }

    #[test]
    fn test_discover_requires_ripper_and_encoder() {
        let mut config = Config::default();
        config.ripper = "sh".to_string();
        config.encoder.name = "sh".to_string();
        config.editor = "ripcord-no-such-editor".to_string();

        let deps = Dependencies::discover(&config).unwrap();
        assert!(deps.editor.is_none());

        config.encoder.name = "ripcord-no-such-encoder".to_string();
        assert!(Dependencies::discover(&config).is_err());
    }
}
