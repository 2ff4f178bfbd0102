mod builder;
mod error;
mod finish;
mod pserver;
mod pull;
mod push;
mod registry;

pub use builder::{ServerBuilder, ServerKey};
pub use error::{HandlerErr, Result};
pub use finish::{FinishHandler, FinishTracker};
pub use pserver::{ParameterServer, serve_connection};
pub use pull::PullHandler;
pub use push::PushHandler;
pub use registry::{Handler, Registry};
