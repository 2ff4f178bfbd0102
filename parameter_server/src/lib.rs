pub mod access;
pub mod checkpoint;
pub mod service;
pub mod storage;

mod test;

pub use service::{ParameterServer, ServerBuilder};
