use std::{error::Error, fmt, io, time::Duration};

use comms::{ProtocolDecodeErr, msg::NodeId};

/// The worker module's result type.
pub type Result<T> = std::result::Result<T, WorkerErr>;

/// Worker runtime failures.
#[derive(Debug)]
pub enum WorkerErr {
    Io(io::Error),
    Decode(ProtocolDecodeErr),
    /// The server rejected the request with this reason.
    Remote(String),
    /// No connection to this server node.
    UnknownNode(NodeId),
    /// The connection closed before the response arrived.
    Disconnected,
    /// The coordinator didn't acknowledge the finish request in time.
    HandshakeTimeout(Duration),
    /// The termination handshake already completed.
    AlreadyFinished,
}

impl fmt::Display for WorkerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerErr::Io(e) => write!(f, "io error: {e}"),
            WorkerErr::Decode(e) => write!(f, "malformed response: {e}"),
            WorkerErr::Remote(reason) => write!(f, "request rejected by server: {reason}"),
            WorkerErr::UnknownNode(node) => write!(f, "no connection to node {node}"),
            WorkerErr::Disconnected => f.write_str("connection closed before the response"),
            WorkerErr::HandshakeTimeout(timeout) => {
                write!(f, "finish not acknowledged within {timeout:?}")
            }
            WorkerErr::AlreadyFinished => f.write_str("worker already terminated"),
        }
    }
}

impl Error for WorkerErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorkerErr::Io(e) => Some(e),
            WorkerErr::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for WorkerErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<ProtocolDecodeErr> for WorkerErr {
    fn from(value: ProtocolDecodeErr) -> Self {
        Self::Decode(value)
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<WorkerErr> for io::Error {
    fn from(value: WorkerErr) -> Self {
        match value {
            WorkerErr::Io(e) => e,
            WorkerErr::Disconnected => io::Error::new(io::ErrorKind::ConnectionAborted, value),
            WorkerErr::HandshakeTimeout(_) => io::Error::new(io::ErrorKind::TimedOut, value),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
