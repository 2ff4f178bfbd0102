use std::{
    borrow::Cow,
    io,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use comms::{
    OnoReceiver, OnoSender,
    msg::{COORDINATOR, Msg, NodeId},
};
use log::{debug, info, warn};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpListener,
    task::{self, JoinSet},
};

use super::{FinishTracker, Registry};

/// The central server structure, it owns the handler registry and the connection tasks.
pub struct ParameterServer {
    node_id: NodeId,
    workers: usize,
    registry: Arc<Registry>,
    tracker: Arc<FinishTracker>,
    push_count: Arc<AtomicU64>,
    tasks: JoinSet<io::Result<()>>,
}

impl ParameterServer {
    /// Creates a new `ParameterServer`.
    ///
    /// # Arguments
    /// * `node_id` - This server's id, `COORDINATOR` also tracks worker termination.
    /// * `workers` - The amount of workers that will connect.
    /// * `registry` - The handlers to dispatch requests to.
    /// * `tracker` - Counts the finished workers.
    /// * `push_count` - The push counter shared with the push handler.
    pub fn new(
        node_id: NodeId,
        workers: usize,
        registry: Registry,
        tracker: Arc<FinishTracker>,
        push_count: Arc<AtomicU64>,
    ) -> Self {
        Self {
            node_id,
            workers,
            registry: Arc::new(registry),
            tracker,
            push_count,
            tasks: JoinSet::new(),
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// The amount of pushes applied so far.
    pub fn push_count(&self) -> u64 {
        self.push_count.load(Ordering::Acquire)
    }

    pub fn tracker(&self) -> &Arc<FinishTracker> {
        &self.tracker
    }

    /// Binds a new connection to this server and spawns its own serving task.
    ///
    /// # Arguments
    /// * `rx` - The receiving end of the communication.
    /// * `tx` - The sending end of the communication.
    pub fn spawn<R, W>(&mut self, rx: OnoReceiver<R>, tx: OnoSender<W>)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let registry = Arc::clone(&self.registry);
        self.tasks.spawn(serve_connection(registry, rx, tx));
    }

    /// Waits for every spawned connection to close.
    pub async fn run(&mut self) -> io::Result<()> {
        while let Some(res) = self.tasks.join_next().await {
            res??
        }

        Ok(())
    }

    /// Accepts up to `workers` connections from `listener` and serves them.
    ///
    /// Returns once every accepted connection closed, or on the coordinator, once every worker
    /// finished and their connections drained.
    pub async fn serve(&mut self, listener: TcpListener) -> io::Result<()> {
        let tracker = Arc::clone(&self.tracker);
        let is_coordinator = self.node_id == COORDINATOR;
        let mut accepted = 0;

        loop {
            tokio::select! {
                conn = listener.accept(), if accepted < self.workers => {
                    let (stream, addr) = conn?;
                    info!(server = self.node_id; "connection from {addr}");

                    let (rx, tx) = stream.into_split();
                    let (rx, tx) = comms::channel(rx, tx);
                    self.spawn(rx, tx);
                    accepted += 1;
                }
                _ = tracker.wait_all(), if is_coordinator => {
                    info!(server = self.node_id; "every worker finished, draining connections");
                    return self.run().await;
                }
                Some(res) = self.tasks.join_next() => {
                    if let Err(e) = res? {
                        warn!(server = self.node_id; "connection closed with error: {e}");
                    }

                    if accepted == self.workers && self.tasks.is_empty() {
                        break;
                    }
                }
                else => break,
            }
        }

        info!(server = self.node_id; "every connection closed");
        Ok(())
    }
}

/// Serves the requests of a single connection until the peer hangs up.
///
/// Each request is dispatched to the registry on the blocking-capable worker thread and
/// answered with its response, or with an error frame carrying the request id if the handler
/// rejected it.
pub async fn serve_connection<R, W>(
    registry: Arc<Registry>,
    mut rx: OnoReceiver<R>,
    mut tx: OnoSender<W>,
) -> io::Result<()>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    let mut rx_buf = Vec::new();

    loop {
        let req = match rx.recv_into(&mut rx_buf).await {
            Ok(Msg::Request(req)) => req,
            Ok(msg) => {
                warn!("expected a request, got {msg:?}");
                continue;
            }
            Err(e) if comms::is_disconnect(&e) => {
                debug!("peer disconnected");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let (id, class, sender) = (req.id, req.class, req.sender);

        let reply = match task::block_in_place(|| registry.dispatch(req)) {
            Ok(rsp) => Msg::Response(rsp),
            Err(e) => {
                warn!(sender = sender, class:? = class; "rejected request {id}: {e}");
                Msg::Err {
                    id,
                    reason: Cow::Owned(e.to_string()),
                }
            }
        };

        tx.send(&reply).await?;
    }
}
