use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// A single external program invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub description: String,
}

impl ExternalCommand {
    /// Create a new command for `program`
    pub fn new<P: AsRef<Path>, S: Into<String>>(program: P, description: S) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<OsString>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add a path argument
    pub fn path_arg<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().as_os_str().to_os_string())
    }

    /// Program name as shown in logs and errors
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().to_string()
    }
}

impl fmt::Display for ExternalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Builder for the fixed-shape commands of the rip pipeline
pub struct CommandBuilder;

impl CommandBuilder {
    /// Build the ripper invocation: `<ripper> -- <tracknumber> <output>`
    pub fn rip_track<P: AsRef<Path>, Q: AsRef<Path>>(
        ripper: P,
        tracknumber: u32,
        output: Q,
    ) -> ExternalCommand {
        ExternalCommand::new(ripper, format!("Rip track {}", tracknumber))
            .arg("--")
            .arg(tracknumber.to_string())
            .path_arg(output)
    }

    /// Build a command from an already expanded argument template
    pub fn templated<P: AsRef<Path>, S: Into<String>>(
        program: P,
        description: S,
        args: Vec<String>,
    ) -> ExternalCommand {
        ExternalCommand::new(program, description).args(args)
    }
}
