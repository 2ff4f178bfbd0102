pub mod client;
pub mod error;
pub mod net;
pub mod sync;
pub mod terminate;
pub mod transport;

pub use client::ParamClient;
pub use error::WorkerErr;
pub use net::RpcClient;
pub use terminate::{HandshakeState, Terminator};
pub use transport::Transport;
