//! Periodic text dumps of the parameter table.

mod error;
mod trigger;
mod writer;

pub use error::{CheckpointErr, Result};
pub use trigger::should_checkpoint;
pub use writer::{CheckpointSink, Checkpointer, counter_of, latest};
