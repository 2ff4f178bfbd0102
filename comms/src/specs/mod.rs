//! Deployment specifications, read from JSON files by the binaries.

pub mod server;
pub mod worker;

use std::{fs::File, io, io::BufReader, path::Path};

use serde::de::DeserializeOwned;

/// Reads a JSON specification from `path`.
///
/// # Arguments
/// * `path` - The path to the JSON file.
///
/// # Returns
/// The parsed specification or an `io::Error` of kind `InvalidData` if it doesn't match `T`.
pub fn load<T, P>(path: P) -> io::Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let reader = BufReader::new(File::open(path)?);
    let spec = serde_json::from_reader(reader)?;
    Ok(spec)
}
