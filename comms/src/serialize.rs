/// Writes a frame body.
pub trait Serialize<'a> {
    /// Writes the fixed part of the frame into `buf`.
    ///
    /// # Arguments
    /// * `buf` - The buffer holding the frame header.
    ///
    /// # Returns
    /// An optional trailing slice that is written right after `buf` without being copied.
    fn serialize(&'a self, buf: &mut Vec<u8>) -> Option<&'a [u8]>;
}
