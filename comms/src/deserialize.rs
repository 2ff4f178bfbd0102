use std::io;

/// Reads a frame body, borrowing from the receive buffer where possible.
pub trait Deserialize<'a>: Sized {
    fn deserialize(buf: &'a [u8]) -> io::Result<Self>;
}
