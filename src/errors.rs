use crate::common::DateError;
use crate::save::MeltError;
use crate::text::Position;
use crate::{GameVersion, ScalarError, VersionError};
use std::fmt;
use std::io;
use std::path::PathBuf;

/// The stage of a load where an error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadStage {
    /// Sniffing the save header and layout
    Detect,

    /// Melting a compressed save into plaintext
    Transcode,

    /// Tokenizing and dispatching script text into collections
    Parse,

    /// Resolving references between collections
    Link,
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            LoadStage::Detect => "detect",
            LoadStage::Transcode => "transcode",
            LoadStage::Parse => "parse",
            LoadStage::Link => "link",
        };
        f.write_str(name)
    }
}

/// An error that aborts a load
#[derive(Debug)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub(crate) fn new(kind: ErrorKind) -> Error {
        Error(Box::new(kind))
    }

    /// Create an error from a free form message
    pub fn message<T: Into<String>>(msg: T) -> Error {
        Error::new(ErrorKind::Message(msg.into()))
    }

    pub(crate) fn io(stage: LoadStage, source: io::Error) -> Error {
        Error::new(ErrorKind::Io { stage, source })
    }

    /// Return the specific type of error
    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }

    /// Consume the error and return the specific type of error
    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    /// The stage of the load that failed
    pub fn stage(&self) -> LoadStage {
        self.0.stage()
    }

    /// Where in the script text the error occurred (if available)
    pub fn position(&self) -> Option<Position> {
        self.0.position()
    }
}

/// Specific type of error
#[derive(Debug)]
pub enum ErrorKind {
    /// An IO error
    Io {
        stage: LoadStage,
        source: io::Error,
    },

    /// The file does not start with the save magic or lacks a header line
    UnrecognizedFormat,

    /// The file is too short to be a save
    TruncatedFile { len: u64 },

    /// The external melt service failed
    TranscodeFailed(MeltError),

    /// The save was written by a game version outside the supported bounds
    VersionMismatch {
        found: GameVersion,
        min: GameVersion,
        max: GameVersion,
    },

    /// An ID appeared twice within one collection
    DuplicateId { collection: &'static str, id: u64 },

    /// An ID lookup failed
    NotFound { collection: &'static str, id: u64 },

    /// A scope was still open when the input ended
    Eof { position: Position },

    /// A token did not have the expected shape
    UnexpectedToken {
        position: Position,
        expected: &'static str,
        found: String,
    },

    /// A scalar could not be converted to the requested type
    Scalar {
        position: Position,
        source: ScalarError,
    },

    /// A date value was malformed
    Date {
        position: Position,
        source: DateError,
    },

    /// A version value was malformed
    Version {
        position: Position,
        source: VersionError,
    },

    /// An error while loading a specific file
    File { path: PathBuf, cause: Error },

    /// A handler reported an error of its own
    Message(String),
}

impl ErrorKind {
    /// The stage of the load that failed
    pub fn stage(&self) -> LoadStage {
        match self {
            ErrorKind::Io { stage, .. } => *stage,
            ErrorKind::UnrecognizedFormat | ErrorKind::TruncatedFile { .. } => LoadStage::Detect,
            ErrorKind::TranscodeFailed(_) => LoadStage::Transcode,
            ErrorKind::NotFound { .. } => LoadStage::Link,
            ErrorKind::File { cause, .. } => cause.stage(),
            _ => LoadStage::Parse,
        }
    }

    /// Where in the script text the error occurred (if available)
    pub fn position(&self) -> Option<Position> {
        match self {
            ErrorKind::Eof { position }
            | ErrorKind::UnexpectedToken { position, .. }
            | ErrorKind::Scalar { position, .. }
            | ErrorKind::Date { position, .. }
            | ErrorKind::Version { position, .. } => Some(*position),
            ErrorKind::File { cause, .. } => cause.position(),
            _ => None,
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self.0 {
            ErrorKind::Io { ref source, .. } => Some(source),
            ErrorKind::TranscodeFailed(ref err) => Some(err),
            ErrorKind::Scalar { ref source, .. } => Some(source),
            ErrorKind::Date { ref source, .. } => Some(source),
            ErrorKind::Version { ref source, .. } => Some(source),
            ErrorKind::File { ref cause, .. } => Some(cause),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} failed: ", self.stage())?;
        match *self.0 {
            ErrorKind::Io { ref source, .. } => write!(f, "io error: {}", source),
            ErrorKind::UnrecognizedFormat => write!(f, "save game format not recognized"),
            ErrorKind::TruncatedFile { len } => {
                write!(f, "save game seems to be truncated ({} bytes)", len)
            }
            ErrorKind::TranscodeFailed(ref err) => write!(f, "unable to melt save: {}", err),
            ErrorKind::VersionMismatch { found, min, max } => write!(
                f,
                "save game version {} is outside the supported range {} to {}",
                found, min, max
            ),
            ErrorKind::DuplicateId { collection, id } => {
                write!(f, "duplicate id {} in {}", id, collection)
            }
            ErrorKind::NotFound { collection, id } => {
                write!(f, "id {} not found in {}", id, collection)
            }
            ErrorKind::Eof { position } => {
                write!(f, "unexpected end of file in scope opened at {}", position)
            }
            ErrorKind::UnexpectedToken {
                position,
                expected,
                ref found,
            } => write!(
                f,
                "expected {} but found {} at {}",
                expected, found, position
            ),
            ErrorKind::Scalar {
                position,
                ref source,
            } => write!(f, "value at {} {}", position, source),
            ErrorKind::Date {
                position,
                ref source,
            } => write!(f, "{} at {}", source, position),
            ErrorKind::Version {
                position,
                ref source,
            } => write!(f, "{} at {}", source, position),
            ErrorKind::File { ref path, ref cause } => {
                write!(f, "{}: {}", path.display(), cause)
            }
            ErrorKind::Message(ref msg) => write!(f, "{}", msg),
        }
    }
}

impl From<MeltError> for Error {
    fn from(error: MeltError) -> Self {
        Error::new(ErrorKind::TranscodeFailed(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_size() {
        assert_eq!(std::mem::size_of::<Error>(), std::mem::size_of::<usize>());
    }

    #[test]
    fn error_stage() {
        let err = Error::new(ErrorKind::TruncatedFile { len: 10 });
        assert_eq!(err.stage(), LoadStage::Detect);
        assert!(err.to_string().starts_with("detect failed"));

        let err = Error::new(ErrorKind::NotFound {
            collection: "characters",
            id: 3,
        });
        assert_eq!(err.stage(), LoadStage::Link);
    }

    #[test]
    fn file_error_delegates() {
        let position = Position {
            offset: 10,
            line: 1,
            column: 4,
        };
        let inner = Error::new(ErrorKind::Eof { position });
        let err = Error::new(ErrorKind::File {
            path: PathBuf::from("history/characters/a.txt"),
            cause: inner,
        });
        assert_eq!(err.stage(), LoadStage::Parse);
        assert_eq!(err.position(), Some(position));
    }
}
