use std::{error::Error, fmt, io};

/// The result type for payload and frame decoding.
pub type Result<T> = std::result::Result<T, ProtocolDecodeErr>;

/// A request or response could not be decoded from the wire.
///
/// Handlers abort the whole request on this error, no partial response is ever produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolDecodeErr {
    /// The buffer ended before a complete field could be read.
    Truncated { needed: usize, remaining: usize },
    /// The next field on the wire has a different type than the one requested.
    TypeMismatch { expected: u8, got: u8 },
    /// A length prefix doesn't fit in the remaining buffer.
    InvalidLength(u64),
    /// The frame names a message class this node doesn't know.
    UnknownMessageClass(u32),
    /// The frame header names an unknown frame kind.
    UnknownFrameKind(u32),
    /// An acknowledgment or finish payload carried the wrong marker.
    UnexpectedSentinel(i32),
    /// Fields were left over after a fixed-shape payload was read.
    TrailingFields(usize),
    /// An error frame carried a reason that isn't valid utf-8.
    InvalidUtf8,
}

impl fmt::Display for ProtocolDecodeErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { needed, remaining } => write!(
                f,
                "truncated payload: needed {needed} bytes, {remaining} remaining"
            ),
            Self::TypeMismatch { expected, got } => {
                write!(f, "field type mismatch: expected tag {expected:#04x}, got {got:#04x}")
            }
            Self::InvalidLength(len) => write!(f, "invalid length prefix {len}"),
            Self::UnknownMessageClass(class) => write!(f, "unknown message class {class}"),
            Self::UnknownFrameKind(kind) => write!(f, "unknown frame kind {kind}"),
            Self::UnexpectedSentinel(got) => write!(f, "unexpected sentinel value {got}"),
            Self::TrailingFields(n) => write!(f, "{n} trailing bytes after payload"),
            Self::InvalidUtf8 => f.write_str("error reason is not valid utf-8"),
        }
    }
}

impl Error for ProtocolDecodeErr {}

/// Boundary conversion for the framed channel, which speaks `io::Error`.
impl From<ProtocolDecodeErr> for io::Error {
    fn from(value: ProtocolDecodeErr) -> Self {
        io::Error::new(io::ErrorKind::InvalidData, value)
    }
}
