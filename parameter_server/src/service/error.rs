use std::{error::Error, fmt, io};

use comms::{ProtocolDecodeErr, msg::MessageClass};

use crate::access::SizeMismatchErr;

/// The service module's result type.
pub type Result<T> = std::result::Result<T, HandlerErr>;

/// A request was rejected by its handler, nothing of it was applied.
#[derive(Debug)]
pub enum HandlerErr {
    Decode(ProtocolDecodeErr),
    /// The gradient at position `index` of a push doesn't fit its parameter.
    SizeMismatch {
        index: usize,
        source: SizeMismatchErr,
    },
    /// No handler is registered for this class on this node.
    Unregistered(MessageClass),
}

impl fmt::Display for HandlerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerErr::Decode(e) => write!(f, "malformed payload: {e}"),
            HandlerErr::SizeMismatch { index, source } => {
                write!(f, "push item {index} rejected: {source}")
            }
            HandlerErr::Unregistered(class) => write!(f, "no handler registered for {class:?}"),
        }
    }
}

impl Error for HandlerErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            HandlerErr::Decode(e) => Some(e),
            HandlerErr::SizeMismatch { source, .. } => Some(source),
            HandlerErr::Unregistered(_) => None,
        }
    }
}

impl From<ProtocolDecodeErr> for HandlerErr {
    fn from(value: ProtocolDecodeErr) -> Self {
        Self::Decode(value)
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<HandlerErr> for io::Error {
    fn from(value: HandlerErr) -> Self {
        io::Error::new(io::ErrorKind::InvalidData, value)
    }
}
