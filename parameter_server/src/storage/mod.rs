mod record;
mod shard;
mod table;

use std::hash::Hash;

use comms::Field;

pub use record::{Record, write_floats};
pub use shard::ParameterShard;
pub use table::ParameterTable;

/// The bounds a parameter key satisfies: sent on the wire, written to checkpoints,
/// hashed into a shard and ordered within a shard's export.
pub trait Key: Field + Record + Hash + Ord + Clone + Send + Sync + 'static {}

impl<T> Key for T where T: Field + Record + Hash + Ord + Clone + Send + Sync + 'static {}
