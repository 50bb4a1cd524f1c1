use std::ffi::OsString;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// A failure reported by the melt service
#[derive(Debug)]
pub struct MeltError {
    message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl MeltError {
    /// Create an error with a description of what went wrong
    pub fn new<T: Into<String>>(message: T) -> Self {
        MeltError {
            message: message.into(),
            source: None,
        }
    }

    /// Create an error caused by another error
    pub fn with_source<T, E>(message: T, source: E) -> Self
    where
        T: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        MeltError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl fmt::Display for MeltError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {}", self.message, source),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for MeltError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|x| x.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// The external service that decodes a compressed save into plaintext.
///
/// A melter reads the save at `save` and writes plaintext script to
/// `output`. Closures with the same signature are melters, which keeps
/// tests free of external processes.
///
/// ```
/// use rome_loader::save::{Melter, MeltError};
/// use std::path::Path;
///
/// let melter = |_save: &Path, output: &Path| {
///     std::fs::write(output, "date=450.10.1").map_err(|e| MeltError::with_source("write", e))
/// };
/// let dir = tempfile::tempdir().unwrap();
/// let out = dir.path().join("melted_save.rome");
/// melter.melt(Path::new("save.rome"), &out).unwrap();
/// assert_eq!(std::fs::read(&out).unwrap(), b"date=450.10.1");
/// ```
pub trait Melter: Send + Sync {
    /// Write the plaintext form of `save` to `output`
    fn melt(&self, save: &Path, output: &Path) -> Result<(), MeltError>;
}

impl<F> Melter for F
where
    F: Fn(&Path, &Path) -> Result<(), MeltError> + Send + Sync,
{
    fn melt(&self, save: &Path, output: &Path) -> Result<(), MeltError> {
        self(save, output)
    }
}

/// Melts saves by running an external program that prints the plaintext
/// save to stdout.
///
/// The default invocation is `rakaly melt --unknown-key stringify
/// --to-stdout <save>`.
#[derive(Debug, Clone)]
pub struct CommandMelter {
    program: PathBuf,
    args: Vec<OsString>,
}

impl Default for CommandMelter {
    fn default() -> Self {
        CommandMelter::new("rakaly")
            .arg("melt")
            .arg("--unknown-key")
            .arg("stringify")
            .arg("--to-stdout")
    }
}

impl CommandMelter {
    /// Run the given program with no leading arguments
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        CommandMelter {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append an argument that comes before the save path
    pub fn arg<S: Into<OsString>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// The program that will be run
    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Melter for CommandMelter {
    fn melt(&self, save: &Path, output: &Path) -> Result<(), MeltError> {
        let out = File::create(output).map_err(|e| {
            MeltError::with_source(format!("unable to create {}", output.display()), e)
        })?;

        debug!(
            "running {} {:?} {}",
            self.program.display(),
            self.args,
            save.display()
        );

        let result = Command::new(&self.program)
            .args(&self.args)
            .arg(save)
            .stdout(out)
            .output()
            .map_err(|e| {
                MeltError::with_source(format!("unable to run {}", self.program.display()), e)
            })?;

        if result.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&result.stderr);
            Err(MeltError::new(format!(
                "{} exited with {}: {}",
                self.program.display(),
                result.status,
                stderr.trim()
            )))
        }
    }
}
