//! A sequential, typed buffer for request and response payloads.
//!
//! Every field is written as a one byte type tag followed by its raw body in the host's byte
//! order (little-endian on every target the cluster runs on), so a reader asking for the wrong
//! type fails with a `TypeMismatch` instead of reinterpreting bytes.

use crate::{
    error::{ProtocolDecodeErr, Result},
    msg::ACK_SENTINEL,
};

/// A value that can be appended to and read back from a `Container`.
pub trait Field: Sized {
    /// The wire tag identifying this field's type.
    const TAG: u8;

    /// Appends the body of this field (without its tag) to `buf`.
    fn encode(&self, buf: &mut Vec<u8>);

    /// Reads the body of a field from the front of `src`, advancing it.
    fn decode(src: &mut &[u8]) -> Result<Self>;
}

/// Fixed width fields that may be packed into a vector field.
pub trait Scalar: Field + bytemuck::Pod {}

/// Splits `n` bytes off the front of `src`.
fn take<'a>(src: &mut &'a [u8], n: usize) -> Result<&'a [u8]> {
    if src.len() < n {
        return Err(ProtocolDecodeErr::Truncated {
            needed: n,
            remaining: src.len(),
        });
    }

    let (head, tail) = src.split_at(n);
    *src = tail;
    Ok(head)
}

macro_rules! impl_scalar {
    ($($ty:ty => $tag:expr),* $(,)?) => {$(
        impl Field for $ty {
            const TAG: u8 = $tag;

            fn encode(&self, buf: &mut Vec<u8>) {
                buf.extend_from_slice(bytemuck::bytes_of(self));
            }

            fn decode(src: &mut &[u8]) -> Result<Self> {
                take(src, size_of::<$ty>()).map(bytemuck::pod_read_unaligned::<$ty>)
            }
        }

        impl Scalar for $ty {}
    )*};
}

impl_scalar! {
    u8 => 0x01,
    i32 => 0x02,
    u32 => 0x03,
    i64 => 0x04,
    u64 => 0x05,
    f32 => 0x06,
    f64 => 0x07,
}

const VEC_TAG: u8 = 0x80;

impl<T: Scalar> Field for Vec<T> {
    const TAG: u8 = VEC_TAG | T::TAG;

    fn encode(&self, buf: &mut Vec<u8>) {
        (self.len() as u64).encode(buf);
        buf.extend_from_slice(bytemuck::cast_slice(self));
    }

    fn decode(src: &mut &[u8]) -> Result<Self> {
        let len = u64::decode(src)?;

        let Some(size) = usize::try_from(len)
            .ok()
            .and_then(|n| n.checked_mul(size_of::<T>()))
            .filter(|&bytes| bytes <= src.len())
        else {
            return Err(ProtocolDecodeErr::InvalidLength(len));
        };

        let bytes = take(src, size)?;
        let mut values = vec![T::zeroed(); size / size_of::<T>()];
        bytemuck::cast_slice_mut(&mut values).copy_from_slice(bytes);
        Ok(values)
    }
}

/// An ordered sequence of typed fields with a read cursor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Container {
    buf: Vec<u8>,
    cursor: usize,
}

impl Container {
    /// Creates a new empty `Container`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps already encoded fields, the cursor starts at the first one.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            buf: bytes.into(),
            cursor: 0,
        }
    }

    /// Appends `value` at the end of the container.
    pub fn push<T: Field>(&mut self, value: &T) -> &mut Self {
        self.buf.push(T::TAG);
        value.encode(&mut self.buf);
        self
    }

    /// Reads the next field, failing if it's missing or of another type.
    ///
    /// The cursor is left untouched on failure.
    pub fn read<T: Field>(&mut self) -> Result<T> {
        let mut src = &self.buf[self.cursor..];

        let tag = take(&mut src, 1)?[0];
        if tag != T::TAG {
            return Err(ProtocolDecodeErr::TypeMismatch {
                expected: T::TAG,
                got: tag,
            });
        }

        let value = T::decode(&mut src)?;
        self.cursor = self.buf.len() - src.len();
        Ok(value)
    }

    /// Reads `(A, B)` pairs until the container is exhausted.
    pub fn read_pairs<A: Field, B: Field>(&mut self) -> Result<Vec<(A, B)>> {
        let mut pairs = Vec::new();

        while !self.read_finished() {
            let a = self.read()?;
            let b = self.read()?;
            pairs.push((a, b));
        }

        Ok(pairs)
    }

    /// Reads a payload that must consist of exactly the acknowledgment sentinel.
    pub fn read_sentinel(&mut self) -> Result<()> {
        let got: i32 = self.read()?;
        if got != ACK_SENTINEL {
            return Err(ProtocolDecodeErr::UnexpectedSentinel(got));
        }

        if !self.read_finished() {
            return Err(ProtocolDecodeErr::TrailingFields(self.remaining()));
        }

        Ok(())
    }

    /// Whether every field has been read.
    pub fn read_finished(&self) -> bool {
        self.cursor >= self.buf.len()
    }

    /// The amount of unread bytes.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.cursor
    }

    /// Moves the cursor back to the first field.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// The encoded fields, regardless of the cursor.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_typed_reads() {
        let mut cont = Container::new();
        cont.push(&7u64).push(&1.5f32).push(&vec![1.0f32, 2.0]);

        assert_eq!(cont.read::<u64>().unwrap(), 7);
        assert_eq!(cont.read::<f32>().unwrap(), 1.5);
        assert!(!cont.read_finished());
        assert_eq!(cont.read::<Vec<f32>>().unwrap(), [1.0, 2.0]);
        assert!(cont.read_finished());
    }

    #[test]
    fn test_type_mismatch_keeps_cursor() {
        let mut cont = Container::new();
        cont.push(&3u64);

        let err = cont.read::<f32>().unwrap_err();
        assert_eq!(
            err,
            ProtocolDecodeErr::TypeMismatch {
                expected: f32::TAG,
                got: u64::TAG
            }
        );
        assert_eq!(cont.read::<u64>().unwrap(), 3);
    }

    #[test]
    fn test_truncated_field() {
        let mut cont = Container::new();
        cont.push(&9u64);

        let bytes = cont.as_bytes();
        let mut cut = Container::from_bytes(&bytes[..bytes.len() - 3]);

        assert!(matches!(
            cut.read::<u64>(),
            Err(ProtocolDecodeErr::Truncated { needed: 8, remaining: 5 })
        ));
    }

    #[test]
    fn test_oversized_vector_length() {
        let mut bytes = vec![Vec::<f32>::TAG];
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());

        let mut cont = Container::from_bytes(bytes);
        assert_eq!(
            cont.read::<Vec<f32>>(),
            Err(ProtocolDecodeErr::InvalidLength(u64::MAX))
        );
    }

    #[test]
    fn test_vector_body_is_one_packed_slice() {
        let values = vec![1.0f32, -2.5, 0.125];
        let mut cont = Container::new();
        cont.push(&values);

        let bytes = cont.as_bytes();
        assert_eq!(bytes[0], Vec::<f32>::TAG);
        assert_eq!(&bytes[1..9], &3u64.to_le_bytes());
        assert_eq!(&bytes[9..], bytemuck::cast_slice::<f32, u8>(&values));

        assert_eq!(cont.read::<Vec<f32>>().unwrap(), values);
    }

    #[test]
    fn test_vector_body_shorter_than_its_length() {
        let mut cont = Container::new();
        cont.push(&vec![7u64, 8]);

        let bytes = cont.as_bytes();
        let mut cut = Container::from_bytes(&bytes[..bytes.len() - 1]);

        assert_eq!(
            cut.read::<Vec<u64>>(),
            Err(ProtocolDecodeErr::InvalidLength(2))
        );
        assert_eq!(cut.remaining(), bytes.len() - 1);
    }

    #[test]
    fn test_pairs_fail_on_dangling_key() {
        let mut cont = Container::new();
        cont.push(&1u64).push(&0.5f32).push(&2u64);

        assert!(matches!(
            cont.read_pairs::<u64, f32>(),
            Err(ProtocolDecodeErr::Truncated { .. })
        ));
    }

    #[test]
    fn test_sentinel_payload() {
        let mut ack = Container::new();
        ack.push(&ACK_SENTINEL);
        assert!(ack.read_sentinel().is_ok());

        let mut wrong = Container::new();
        wrong.push(&4321i32);
        assert_eq!(
            wrong.read_sentinel(),
            Err(ProtocolDecodeErr::UnexpectedSentinel(4321))
        );

        let mut trailing = Container::new();
        trailing.push(&ACK_SENTINEL).push(&1u8);
        assert_eq!(
            trailing.read_sentinel(),
            Err(ProtocolDecodeErr::TrailingFields(2))
        );
    }
}
