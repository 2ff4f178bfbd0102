use std::{error::Error, fmt, io, path::PathBuf};

/// The checkpoint module's result type.
pub type Result<T> = std::result::Result<T, CheckpointErr>;

/// A checkpoint could not be written or read back.
///
/// Never fatal for a push, the failure is logged and the table keeps serving.
#[derive(Debug)]
pub enum CheckpointErr {
    Io { path: PathBuf, source: io::Error },
    /// Line `line` (1-based) of `path` is not a `key<TAB>param` record.
    Parse { path: PathBuf, line: usize },
}

impl CheckpointErr {
    pub(super) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        move |source| Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl fmt::Display for CheckpointErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckpointErr::Io { path, source } => {
                write!(f, "checkpoint io error on {}: {source}", path.display())
            }
            CheckpointErr::Parse { path, line } => {
                write!(f, "malformed checkpoint record at {}:{line}", path.display())
            }
        }
    }
}

impl Error for CheckpointErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CheckpointErr::Io { source, .. } => Some(source),
            CheckpointErr::Parse { .. } => None,
        }
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<CheckpointErr> for io::Error {
    fn from(value: CheckpointErr) -> Self {
        match value {
            CheckpointErr::Io { source, .. } => source,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
