use comms::msg::{NodeId, Request, Response};

use crate::error::Result;

/// Invoked exactly once with the response to a request, or with the reason there will be none.
pub type Callback = Box<dyn FnOnce(Result<Response>) + Send>;

/// Delivers requests to server nodes and completes them asynchronously.
pub trait Transport: Send + Sync {
    /// The id of the node this transport sends from.
    fn node_id(&self) -> NodeId;

    /// The amount of server nodes reachable, numbered from `0`.
    fn servers(&self) -> usize;

    /// Sends `req` to node `dest` without blocking.
    ///
    /// `callback` fires once the matching response arrives. Failures, including an unknown
    /// `dest`, are reported through `callback` as well.
    fn send(&self, req: Request, dest: NodeId, callback: Callback);
}
